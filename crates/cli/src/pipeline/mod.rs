//! Pipeline orchestration: device, engine, sinks, lifecycle.

mod orchestrator;
mod stats;

pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::RunStats;
