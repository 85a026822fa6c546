//! Action scoring: keep the most dynamic part of the steady footage.
//!
//! Motion is scored for every frame transition. The cutoff is not fixed;
//! it is derived from the score distribution so that roughly the top
//! `top_percent` of transitions qualify.

use serde::{Deserialize, Serialize};

use reelcut_common::config::AnalysisDefaults;
use reelcut_common::error::{ReelcutError, ReelcutResult, SelectionStage};
use reelcut_media_model::{Interval, ScoredSample};

use crate::motion::MotionScorer;
use crate::percentile::top_percent_threshold;
use crate::scan::{scan_frames, FrameStream, ScanControl};
use crate::scorer::FrameScorer;
use crate::segmenter::segment_runs;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    /// Share of transitions (percent) that should clear the threshold.
    pub top_percent: f64,
    /// Shortest run worth keeping (seconds).
    pub min_duration_secs: f64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            top_percent: 20.0,
            min_duration_secs: 2.0,
        }
    }
}

impl From<&AnalysisDefaults> for ActionConfig {
    fn from(defaults: &AnalysisDefaults) -> Self {
        Self {
            top_percent: defaults.top_percent,
            min_duration_secs: defaults.min_action_duration_secs,
        }
    }
}

/// What the action stage kept.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutcome {
    /// Derived motion cutoff.
    pub threshold: f64,
    pub samples: Vec<ScoredSample>,
    /// Action spans in the time base of the scanned stream.
    pub intervals: Vec<Interval>,
    pub frames: u64,
}

/// Threshold and intervals for an already scored series.
///
/// Returns `None` when there are no usable scores.
pub fn select_action_intervals(
    samples: &[ScoredSample],
    config: &ActionConfig,
    duration: f64,
) -> Option<(f64, Vec<Interval>)> {
    let scores: Vec<f64> = samples.iter().map(|s| s.score).collect();
    let threshold = top_percent_threshold(&scores, config.top_percent)?;
    let intervals = segment_runs(samples, threshold, config.min_duration_secs, duration);
    Some((threshold, intervals))
}

pub struct ActionScorer {
    config: ActionConfig,
    motion: MotionScorer,
}

impl ActionScorer {
    pub fn new(config: ActionConfig, motion: MotionScorer) -> Self {
        Self { config, motion }
    }

    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// Score motion across `stream` and keep the top runs.
    ///
    /// `duration` is the total length of the stream's time base.
    pub fn analyze(
        &self,
        stream: &mut dyn FrameStream,
        duration: f64,
        control: &ScanControl,
    ) -> ReelcutResult<ActionOutcome> {
        let scan = scan_frames(
            stream,
            &FrameScorer::Motion(self.motion),
            SelectionStage::Action,
            control,
        )?;
        let empty = || ReelcutError::empty_segments(SelectionStage::Action);

        if scan.frames < 2 {
            tracing::warn!(frames = scan.frames, "Too few frames to measure motion");
            return Err(empty());
        }

        let (threshold, intervals) =
            select_action_intervals(&scan.samples, &self.config, duration).ok_or_else(empty)?;

        tracing::info!(
            threshold,
            label = %format!("top {}%", self.config.top_percent),
            samples = scan.samples.len(),
            action_segments = intervals.len(),
            "Action threshold derived"
        );

        if intervals.is_empty() {
            return Err(empty());
        }
        Ok(ActionOutcome {
            threshold,
            samples: scan.samples,
            intervals,
            frames: scan.frames,
        })
    }
}

impl Default for ActionScorer {
    fn default() -> Self {
        Self::new(ActionConfig::default(), MotionScorer::default())
    }
}
