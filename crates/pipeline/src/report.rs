//! Run results and their JSON report.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_media_model::Interval;

use crate::state::PipelineState;

/// Which pipeline variant produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Stability then action selection.
    Highlight,
    /// Stability selection over one or more inputs.
    SteadyOnly,
    /// Action selection over an already steady input.
    ActionOnly,
}

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    /// Machine-readable kind, see [`ReelcutError::kind`].
    pub kind: String,
    pub message: String,
    /// State the run was in when it failed.
    pub state: PipelineState,
}

impl RunFailure {
    pub fn from_error(err: &ReelcutError, state: PipelineState) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            state,
        }
    }
}

/// Time spent in one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub state: PipelineState,
    pub elapsed_ms: u64,
}

/// Outcome of one pipeline run.
///
/// `success` is true only when at least one interval survived selection
/// and a non-empty video was written to `output_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub success: bool,
    pub mode: RunMode,
    pub inputs: Vec<PathBuf>,
    /// The written video.
    pub output_path: Option<PathBuf>,
    /// The persisted steady-only video, if requested.
    pub steady_path: Option<PathBuf>,
    /// Steady spans, in source time.
    pub steady_intervals: Vec<Interval>,
    /// Action spans, in the time base of the steady concatenation.
    pub action_intervals: Vec<Interval>,
    /// Derived motion cutoff.
    pub threshold: Option<f64>,
    /// The frame rate was unusable and stability analysis was skipped.
    pub degraded: bool,
    /// Final state: `Done` or `Aborted`.
    pub state: PipelineState,
    pub error: Option<RunFailure>,
    pub started_at: DateTime<Utc>,
    pub timings: Vec<StageTiming>,
}

impl PipelineResult {
    pub fn new(mode: RunMode, inputs: Vec<PathBuf>) -> Self {
        Self {
            success: false,
            mode,
            inputs,
            output_path: None,
            steady_path: None,
            steady_intervals: Vec::new(),
            action_intervals: Vec::new(),
            threshold: None,
            degraded: false,
            state: PipelineState::Init,
            error: None,
            started_at: Utc::now(),
            timings: Vec::new(),
        }
    }

    /// Total selected duration of the written video (seconds).
    pub fn kept_secs(&self) -> f64 {
        let spans = if self.action_intervals.is_empty() {
            &self.steady_intervals
        } else {
            &self.action_intervals
        };
        reelcut_media_model::total_duration(spans)
    }

    pub fn total_elapsed_ms(&self) -> u64 {
        self.timings.iter().map(|t| t.elapsed_ms).sum()
    }

    pub fn to_json(&self) -> ReelcutResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_report(&self, path: &Path) -> ReelcutResult<()> {
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), "Run report written");
        Ok(())
    }
}
