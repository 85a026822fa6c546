//! Reelcut Pipeline
//!
//! Sequences the selection stages over a media backend:
//!
//! ```text
//! Init → Decode → StabilityFilter → ConcatenateSteady
//!      → ActionScore → ConcatenateBest → Write → Done
//! ```
//!
//! Any failure moves the run to `Aborted`. Nothing partial is left on disk.

pub mod config;
pub mod guard;
pub mod naming;
pub mod orchestrator;
pub mod report;
pub mod state;

pub use config::PipelineConfig;
pub use guard::OutputGuard;
pub use orchestrator::HighlightPipeline;
pub use report::{PipelineResult, RunFailure, RunMode, StageTiming};
pub use state::PipelineState;
