//! Stability filter: keep the stretches of footage that are in focus.
//!
//! Every frame is scored for sharpness. Runs whose score stays above the
//! blur threshold for at least the minimum duration are kept.

use serde::{Deserialize, Serialize};

use reelcut_common::config::AnalysisDefaults;
use reelcut_common::error::{ReelcutError, ReelcutResult, SelectionStage};
use reelcut_media_model::{Interval, ScoredSample};

use crate::scan::{scan_frames, FrameStream, ScanControl};
use crate::scorer::FrameScorer;
use crate::segmenter::segment_runs;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Minimum Laplacian variance for a frame to count as sharp.
    pub blur_threshold: f64,
    /// Shortest run worth keeping (seconds).
    pub min_duration_secs: f64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            blur_threshold: 60.0,
            min_duration_secs: 1.0,
        }
    }
}

impl From<&AnalysisDefaults> for StabilityConfig {
    fn from(defaults: &AnalysisDefaults) -> Self {
        Self {
            blur_threshold: defaults.blur_threshold,
            min_duration_secs: defaults.min_steady_duration_secs,
        }
    }
}

/// What the stability stage kept.
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityOutcome {
    /// Steady spans in source time, ordered and disjoint.
    pub intervals: Vec<Interval>,
    pub samples: Vec<ScoredSample>,
    pub frames: u64,
    /// Analysis was skipped and the whole input kept.
    pub degraded: bool,
}

pub struct StabilityFilter {
    config: StabilityConfig,
}

impl StabilityFilter {
    pub fn new(config: StabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Score every frame of `stream` and keep the sharp runs.
    ///
    /// `duration` closes a run that is still open after the last frame.
    pub fn analyze(
        &self,
        stream: &mut dyn FrameStream,
        duration: f64,
        control: &ScanControl,
    ) -> ReelcutResult<StabilityOutcome> {
        let scan = scan_frames(stream, &FrameScorer::Sharpness, SelectionStage::Stability, control)?;
        let intervals = segment_runs(
            &scan.samples,
            self.config.blur_threshold,
            self.config.min_duration_secs,
            duration,
        );

        tracing::info!(
            frames = scan.frames,
            blur_threshold = self.config.blur_threshold,
            steady_segments = intervals.len(),
            "Stability filter finished"
        );

        if intervals.is_empty() {
            return Err(ReelcutError::empty_segments(SelectionStage::Stability));
        }
        Ok(StabilityOutcome {
            intervals,
            samples: scan.samples,
            frames: scan.frames,
            degraded: false,
        })
    }

    /// Outcome for a source whose frame rate cannot be determined: the
    /// whole input is one steady span.
    pub fn undetermined(&self, duration: f64) -> ReelcutResult<StabilityOutcome> {
        tracing::warn!(duration, "Frame rate undetermined, keeping the whole input");
        let whole = Interval::new(0.0, duration)
            .ok_or_else(|| ReelcutError::empty_segments(SelectionStage::Stability))?;
        Ok(StabilityOutcome {
            intervals: vec![whole],
            samples: Vec::new(),
            frames: 0,
            degraded: true,
        })
    }
}

impl Default for StabilityFilter {
    fn default() -> Self {
        Self::new(StabilityConfig::default())
    }
}
