// Re-export all public modules
pub mod shared;
pub mod as_graph;
pub mod as_org;
pub mod as_graph_generators;
pub mod topology;
pub mod annotation;
pub mod engine;
pub mod engine_runner;
pub mod export;

// Re-export commonly used types at the crate root
pub use annotation::{Annotation, DecisionCode, HiddenSearch, Rule, UpdateStore};
pub use as_graph::{ASBuilder, ASGraph, RelationshipOracle, AS};
pub use as_graph_generators::{CAIDAASGraphReader, CAIDAOrgReader};
pub use as_org::{AsOrgMap, OrgDirectory};
pub use engine::{RefinementEngine, RefinementResult, Termination};
pub use engine_runner::{EngineRun, EngineRunConfig, EngineRunner, RunSummary};
pub use export::{AnnotationRow, AsLinkRow, ConnectionSource};
pub use shared::{
    ConfigError, EdgeType, GraphError, LoadError, OrgId, Priority, RunError, ASN, UNANNOUNCED_ASN,
    UNKNOWN_ASN,
};
pub use topology::{InterfaceId, RouterId, TopologyBuilder, TopologyGraph};
