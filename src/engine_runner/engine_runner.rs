use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::annotation::UpdateStore;
use crate::as_graph::RelationshipOracle;
use crate::as_org::OrgDirectory;
use crate::engine::{RefinementEngine, RefinementResult, Termination};
use crate::export::{annotation_rows, as_link_rows, AnnotationRow, AsLinkRow};
use crate::shared::RunError;
use crate::topology::{RouterId, TopologyGraph};

use super::engine_run_config::EngineRunConfig;

/// Counts and timings of one finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub name: String,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub termination: Termination,
    pub iterations: usize,
    pub routers: usize,
    pub interfaces: usize,
    pub last_hops: usize,
    pub annotated_routers: usize,
    pub annotated_interfaces: usize,
    pub config: EngineRunConfig,
}

impl RunSummary {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct EngineRun {
    pub last_hops: UpdateStore<RouterId>,
    pub result: RefinementResult,
    pub summary: RunSummary,
}

impl EngineRun {
    pub fn annotation_rows(&self, graph: &TopologyGraph) -> Vec<AnnotationRow> {
        annotation_rows(graph, &self.last_hops, &self.result.routers, &self.result.interfaces)
    }

    pub fn as_link_rows(&self, graph: &TopologyGraph) -> Vec<AsLinkRow> {
        as_link_rows(graph, &self.last_hops, &self.result.routers)
    }
}

/// Runs last-hop annotation plus refinement with one configuration
pub struct EngineRunner {
    /// Configuration for this engine run
    pub config: EngineRunConfig,

    /// Directory the run output is written to, if any
    pub storage_dir: Option<PathBuf>,
}

impl EngineRunner {
    pub fn new(config: EngineRunConfig) -> Self {
        EngineRunner {
            config,
            storage_dir: None,
        }
    }

    /// Write output under `base_dir/<config name>`
    pub fn with_base_dir(mut self, base_dir: &Path) -> Self {
        self.storage_dir = Some(base_dir.join(&self.config.name));
        self
    }

    pub fn run(
        &self,
        graph: &TopologyGraph,
        oracle: &dyn RelationshipOracle,
        orgs: &dyn OrgDirectory,
    ) -> Result<EngineRun, RunError> {
        let started = Utc::now();
        let mut engine = RefinementEngine::new(graph, oracle, orgs, self.config.clone())?;
        let result = engine.run();
        let last_hops = engine.last_hops;

        let summary = RunSummary {
            name: self.config.name.clone(),
            started,
            finished: Utc::now(),
            termination: result.termination,
            iterations: result.iterations,
            routers: graph.routers().len(),
            interfaces: graph.interfaces().len(),
            last_hops: graph.last_hop_routers().len(),
            annotated_routers: result.routers.len(),
            annotated_interfaces: result.interfaces.len(),
            config: self.config.clone(),
        };
        info!(
            "Run {} finished: {} after {} iterations",
            summary.name, summary.termination, summary.iterations
        );

        let run = EngineRun {
            last_hops,
            result,
            summary,
        };
        if let Some(storage_dir) = &self.storage_dir {
            self.store_data(storage_dir, graph, &run)?;
        }
        Ok(run)
    }

    fn store_data(
        &self,
        storage_dir: &Path,
        graph: &TopologyGraph,
        run: &EngineRun,
    ) -> Result<(), RunError> {
        fs::create_dir_all(storage_dir).map_err(|source| RunError::Io {
            path: storage_dir.display().to_string(),
            source,
        })?;

        write_json(&storage_dir.join("summary.json"), &run.summary.to_json()?)?;
        write_json(
            &storage_dir.join("annotations.json"),
            &serde_json::to_string_pretty(&run.annotation_rows(graph))?,
        )?;
        write_json(
            &storage_dir.join("as_links.json"),
            &serde_json::to_string_pretty(&run.as_link_rows(graph))?,
        )?;
        write_json(
            &storage_dir.join("config.json"),
            &serde_json::to_string_pretty(&self.config.to_json())?,
        )?;
        info!("Stored run output in {}", storage_dir.display());
        Ok(())
    }
}

fn write_json(path: &Path, contents: &str) -> Result<(), RunError> {
    fs::write(path, contents).map_err(|source| RunError::Io {
        path: path.display().to_string(),
        source,
    })
}
