pub mod orchestrator;
pub mod stage;
pub mod stats;

pub use orchestrator::{ExitReason, Orchestrator, PipelineReport};
pub use stage::{StageError, StageHandle};
pub use stats::PipelineStats;
