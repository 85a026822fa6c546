//! Reelcut Processing Core: segment selection
//!
//! Turns decoded frames into the time intervals worth keeping:
//! - **Stability filter:** sharpness per frame, sharp runs kept
//! - **Action scoring:** optical-flow motion per transition, top runs kept
//! - **Run segmenter:** the shared scores-to-intervals routine
//!
//! This crate is pure computation. Frames come in through the
//! [`scan::FrameStream`] trait; decoding lives elsewhere.

pub mod action;
pub mod flow;
pub mod motion;
pub mod percentile;
pub mod scan;
pub mod scorer;
pub mod segmenter;
pub mod sharpness;
pub mod stability;

pub use action::{ActionConfig, ActionOutcome, ActionScorer};
pub use motion::{MotionAccumulator, MotionScorer, MotionSummary};
pub use scan::{CancelFlag, FrameIter, FrameStream, ProgressCallback, ScanControl, ScanProgress};
pub use scorer::FrameScorer;
pub use segmenter::segment_runs;
pub use stability::{StabilityConfig, StabilityFilter, StabilityOutcome};
