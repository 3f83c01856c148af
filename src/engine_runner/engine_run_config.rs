use serde::{Deserialize, Serialize};

use crate::shared::ConfigError;

/// Configuration for a single refinement run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineRunConfig {
    /// Label carried into the run summary
    pub name: String,

    /// Stop after this many refinement rounds; `None` runs until the graph
    /// converges or repeats a state
    pub max_iterations: Option<usize>,

    /// Number of past (router, interface) states kept for cycle detection
    pub history_limit: usize,

    /// Worker threads for the annotation passes; 0 uses every core
    pub threads: usize,

    /// Draw a progress bar for each pass
    pub show_progress: bool,

    /// Largest cone a reallocated prefix's new holder may have
    pub reallocated_cone_max: usize,

    /// Prefix lengths that define "same subnet"
    pub subnet_prefix_v4: u8,
    pub subnet_prefix_v6: u8,
}

impl EngineRunConfig {
    pub fn new(name: &str) -> Self {
        EngineRunConfig {
            name: name.to_string(),
            max_iterations: None,
            history_limit: 64,
            threads: 0,
            show_progress: false,
            reallocated_cone_max: 3,
            subnet_prefix_v4: 24,
            subnet_prefix_v6: 120,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn with_reallocated_cone_max(mut self, cone_max: usize) -> Self {
        self.reallocated_cone_max = cone_max;
        self
    }

    pub fn with_subnet_prefixes(mut self, v4: u8, v6: u8) -> Self {
        self.subnet_prefix_v4 = v4;
        self.subnet_prefix_v6 = v6;
        self
    }

    pub fn thread_count(&self) -> usize {
        if self.threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.threads
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "history_limit",
                reason: "must keep at least one past state".to_string(),
            });
        }
        if self.max_iterations == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_iterations",
                reason: "must allow at least one round".to_string(),
            });
        }
        if self.subnet_prefix_v4 > 32 {
            return Err(ConfigError::InvalidValue {
                field: "subnet_prefix_v4",
                reason: format!("{} exceeds 32", self.subnet_prefix_v4),
            });
        }
        if self.subnet_prefix_v6 > 128 {
            return Err(ConfigError::InvalidValue {
                field: "subnet_prefix_v6",
                reason: format!("{} exceeds 128", self.subnet_prefix_v6),
            });
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineRunConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "max_iterations": self.max_iterations,
            "history_limit": self.history_limit,
            "threads": self.threads,
            "show_progress": self.show_progress,
            "reallocated_cone_max": self.reallocated_cone_max,
            "subnet_prefix_v4": self.subnet_prefix_v4,
            "subnet_prefix_v6": self.subnet_prefix_v6,
        })
    }
}

impl Default for EngineRunConfig {
    fn default() -> Self {
        Self::new("default")
    }
}
