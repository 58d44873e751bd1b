//! Sync engine: request planning, per-source pipelines and record transforms.

pub mod orchestrator;
pub mod pipeline;
pub mod transform;

pub use orchestrator::{SyncEngine, SyncPlan};
pub use pipeline::SyncContext;
