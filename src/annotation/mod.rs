pub mod code;
pub mod context;
pub mod interface;
pub mod last_hop;
pub mod router;
pub mod updates;
pub mod utils;

pub use code::{DecisionCode, HiddenSearch, Rule};
pub use context::{resolve_router, AnnotationContext};
pub use interface::annotate_interface;
pub use last_hop::{annotate_last_hop, annotate_last_hops};
pub use router::annotate_router;
pub use updates::{Annotation, UpdateStore};
