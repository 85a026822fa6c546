//! The highlight pipeline: decode, keep steady footage, keep the action,
//! write the result.
//!
//! Each run owns every clip view it creates. Views are dropped when the run
//! returns, on success and failure alike, which releases the sources. The
//! public entry points never fail: errors and panics are folded into a
//! [`PipelineResult`] with `success = false`.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use reelcut_common::error::{ReelcutError, ReelcutResult, SelectionStage};
use reelcut_common::timebase::FrameRate;
use reelcut_media_model::{Concatenation, SourceClip, SubClip};
use reelcut_processing_core::{
    ActionOutcome, ActionScorer, ScanControl, StabilityFilter, StabilityOutcome,
};
use reelcut_render_engine::{EncodeProgressCallback, MediaBackend};

use crate::config::PipelineConfig;
use crate::guard::OutputGuard;
use crate::naming::steady_path_for;
use crate::report::{PipelineResult, RunFailure, RunMode, StageTiming};
use crate::state::PipelineState;

/// Rate used to sample sources whose own frame rate is unusable.
pub const FALLBACK_ANALYSIS_FPS: f64 = 30.0;

/// Bookkeeping for one run: current state, per-state timings, result fields.
struct Run {
    result: PipelineResult,
    state: PipelineState,
    entered: Instant,
}

impl Run {
    fn new(mode: RunMode, inputs: Vec<PathBuf>) -> Self {
        tracing::info!(?mode, inputs = inputs.len(), "Pipeline run started");
        Self {
            result: PipelineResult::new(mode, inputs),
            state: PipelineState::Init,
            entered: Instant::now(),
        }
    }

    fn close_state(&mut self) {
        self.result.timings.push(StageTiming {
            state: self.state,
            elapsed_ms: self.entered.elapsed().as_millis() as u64,
        });
        self.entered = Instant::now();
    }

    fn enter(&mut self, next: PipelineState) {
        debug_assert!(self.state.can_advance_to(next), "{} -> {}", self.state, next);
        self.close_state();
        tracing::info!(from = %self.state, to = %next, "Pipeline state transition");
        self.state = next;
        self.result.state = next;
    }

    fn finish(mut self, outcome: std::thread::Result<ReelcutResult<()>>) -> PipelineResult {
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(err)) => {
                tracing::error!(state = %self.state, kind = err.kind(), error = %err, "Pipeline aborted");
                Some(RunFailure::from_error(&err, self.state))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(state = %self.state, panic = %message, "Pipeline aborted by a fault");
                Some(RunFailure {
                    kind: "unexpected_fault".to_string(),
                    message,
                    state: self.state,
                })
            }
        };

        match failure {
            None => {
                self.result.success = true;
                tracing::info!(
                    output = ?self.result.output_path,
                    kept_secs = self.result.kept_secs(),
                    "Pipeline finished"
                );
            }
            Some(failure) => {
                self.enter(PipelineState::Aborted);
                self.result.success = false;
                self.result.output_path = None;
                self.result.steady_path = None;
                self.result.error = Some(failure);
            }
        }
        self.result
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Highlight extraction over a [`MediaBackend`].
pub struct HighlightPipeline {
    backend: Arc<dyn MediaBackend>,
    config: PipelineConfig,
    control: ScanControl,
    encode_progress: Option<EncodeProgressCallback>,
}

impl HighlightPipeline {
    pub fn new(backend: Arc<dyn MediaBackend>, config: PipelineConfig) -> Self {
        Self {
            backend,
            config,
            control: ScanControl::default(),
            encode_progress: None,
        }
    }

    /// Progress reporting and cancellation for the frame scans.
    pub fn with_control(mut self, control: ScanControl) -> Self {
        self.control = control;
        self
    }

    pub fn with_encode_progress(mut self, progress: EncodeProgressCallback) -> Self {
        self.encode_progress = Some(progress);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Full pipeline: stability filter, then action scoring, then write.
    pub fn run(&self, input: &Path, output: &Path) -> PipelineResult {
        self.execute(RunMode::Highlight, vec![input.to_path_buf()], |run| {
            self.highlight(run, input, output)
        })
    }

    /// Stability filter over every input, joined into one video.
    ///
    /// Missing inputs, and the output itself, are skipped with a warning.
    pub fn run_steady(&self, inputs: &[PathBuf], output: &Path) -> PipelineResult {
        self.execute(RunMode::SteadyOnly, inputs.to_vec(), |run| {
            self.steady_only(run, inputs, output)
        })
    }

    /// Action scoring over an input that is already steady.
    pub fn run_action(&self, input: &Path, output: &Path) -> PipelineResult {
        self.execute(RunMode::ActionOnly, vec![input.to_path_buf()], |run| {
            self.action_only(run, input, output)
        })
    }

    fn execute(
        &self,
        mode: RunMode,
        inputs: Vec<PathBuf>,
        body: impl FnOnce(&mut Run) -> ReelcutResult<()>,
    ) -> PipelineResult {
        let mut run = Run::new(mode, inputs);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.config.validate()?;
            body(&mut run)
        }));
        run.finish(outcome)
    }

    fn highlight(&self, run: &mut Run, input: &Path, output: &Path) -> ReelcutResult<()> {
        ensure_not_input(output, input)?;
        let steady_path = steady_path_for(output, input);
        if self.config.analysis.persist_steady {
            ensure_not_input(&steady_path, input)?;
        }

        run.enter(PipelineState::Decode);
        let source = self.backend.open(input)?;
        let rate = self.frame_rate(&source);

        run.enter(PipelineState::StabilityFilter);
        let steady = self.stability(&source, rate)?;
        run.result.degraded = steady.degraded;
        run.result.steady_intervals = steady.intervals.clone();

        run.enter(PipelineState::ConcatenateSteady);
        let steady_cut: Concatenation = steady
            .intervals
            .iter()
            .filter_map(|interval| source.subclip(*interval))
            .collect();
        if steady_cut.is_empty() {
            return Err(ReelcutError::empty_segments(SelectionStage::Stability));
        }
        tracing::info!(
            segments = steady_cut.len(),
            duration_secs = steady_cut.duration(),
            "Steady footage assembled"
        );

        let steady_guard = if self.config.analysis.persist_steady {
            let guard = OutputGuard::stage(steady_path)?;
            self.write(steady_cut.clips(), &guard)?;
            Some(guard)
        } else {
            None
        };

        run.enter(PipelineState::ActionScore);
        let rate = match rate {
            Some(rate) => rate,
            None => fallback_rate()?,
        };
        let action = self.action(&steady_cut, rate)?;
        run.result.threshold = Some(action.threshold);
        run.result.action_intervals = action.intervals.clone();

        run.enter(PipelineState::ConcatenateBest);
        let best = steady_cut.select(&action.intervals);
        drop(steady_cut);
        if best.is_empty() {
            return Err(ReelcutError::empty_segments(SelectionStage::Action));
        }
        tracing::info!(
            segments = best.len(),
            duration_secs = best.duration(),
            "Best moments assembled"
        );

        run.enter(PipelineState::Write);
        let guard = OutputGuard::stage(output)?;
        self.write(best.clips(), &guard)?;
        if let Some(steady_guard) = steady_guard {
            run.result.steady_path = Some(steady_guard.commit()?);
        }
        run.result.output_path = Some(guard.commit()?);

        run.enter(PipelineState::Done);
        Ok(())
    }

    fn steady_only(&self, run: &mut Run, inputs: &[PathBuf], output: &Path) -> ReelcutResult<()> {
        run.enter(PipelineState::Decode);
        let mut sources = Vec::new();
        for input in inputs {
            if same_file(input, output) {
                tracing::warn!(path = %input.display(), "Skipping input that is also the output");
                continue;
            }
            if !input.exists() {
                tracing::warn!(path = %input.display(), "Skipping missing input");
                continue;
            }
            sources.push(self.backend.open(input)?);
        }

        run.enter(PipelineState::StabilityFilter);
        let mut clips: Vec<SubClip> = Vec::new();
        for source in &sources {
            let outcome = match self.stability(source, self.frame_rate(source)) {
                Ok(outcome) => outcome,
                Err(ReelcutError::EmptySegmentSet { .. }) => {
                    tracing::info!(path = %source.path().display(), "No steady footage in input");
                    continue;
                }
                Err(err) => return Err(err),
            };
            run.result.degraded |= outcome.degraded;
            clips.extend(outcome.intervals.iter().filter_map(|i| source.subclip(*i)));
            run.result.steady_intervals.extend(outcome.intervals);
        }

        run.enter(PipelineState::ConcatenateSteady);
        let steady_cut = Concatenation::new(clips);
        if steady_cut.is_empty() {
            tracing::warn!(
                blur_threshold = self.config.analysis.blur_threshold,
                "No steady footage found; try a lower blur threshold"
            );
            return Err(ReelcutError::empty_segments(SelectionStage::Stability));
        }

        run.enter(PipelineState::Write);
        let guard = OutputGuard::stage(output)?;
        self.write(steady_cut.clips(), &guard)?;
        run.result.output_path = Some(guard.commit()?);

        run.enter(PipelineState::Done);
        Ok(())
    }

    fn action_only(&self, run: &mut Run, input: &Path, output: &Path) -> ReelcutResult<()> {
        ensure_not_input(output, input)?;

        run.enter(PipelineState::Decode);
        let source = self.backend.open(input)?;
        let rate = match self.frame_rate(&source) {
            Some(rate) => rate,
            None => fallback_rate()?,
        };
        let whole: Concatenation = source.full().into_iter().collect();

        run.enter(PipelineState::ActionScore);
        let action = self.action(&whole, rate)?;
        run.result.threshold = Some(action.threshold);
        run.result.action_intervals = action.intervals.clone();

        run.enter(PipelineState::ConcatenateBest);
        let best = whole.select(&action.intervals);
        if best.is_empty() {
            return Err(ReelcutError::empty_segments(SelectionStage::Action));
        }

        run.enter(PipelineState::Write);
        let guard = OutputGuard::stage(output)?;
        self.write(best.clips(), &guard)?;
        run.result.output_path = Some(guard.commit()?);

        run.enter(PipelineState::Done);
        Ok(())
    }

    fn frame_rate(&self, source: &SourceClip) -> Option<FrameRate> {
        let rate = FrameRate::validate(source.info().frame_rate, self.config.analysis.max_frame_rate);
        if rate.is_none() {
            let err = ReelcutError::UndeterminedFrameRate {
                path: source.path().to_path_buf(),
            };
            tracing::warn!(raw = ?source.info().frame_rate, "{err}");
        }
        rate
    }

    fn stability(
        &self,
        source: &Arc<SourceClip>,
        rate: Option<FrameRate>,
    ) -> ReelcutResult<StabilityOutcome> {
        let filter = StabilityFilter::new(self.config.stability());
        let Some(rate) = rate else {
            return filter.undetermined(source.duration());
        };
        let whole = source
            .full()
            .ok_or_else(|| ReelcutError::source_unreadable(source.path(), "source has no duration"))?;
        tracing::info!(path = %source.path().display(), %rate, "Scoring sharpness");
        let mut frames = self.backend.frames(&[whole], rate)?;
        filter.analyze(&mut *frames, source.duration(), &self.control)
    }

    fn action(&self, cut: &Concatenation, rate: FrameRate) -> ReelcutResult<ActionOutcome> {
        let scorer = ActionScorer::new(self.config.action(), self.config.motion());
        tracing::info!(
            segments = cut.len(),
            duration_secs = cut.duration(),
            %rate,
            "Scoring motion"
        );
        let mut frames = self.backend.frames(cut.clips(), rate)?;
        scorer.analyze(&mut *frames, cut.duration(), &self.control)
    }

    /// Encode `clips` into the guard's staging file.
    fn write(&self, clips: &[SubClip], guard: &OutputGuard) -> ReelcutResult<()> {
        if self.control.is_cancelled() {
            return Err(ReelcutError::Cancelled);
        }
        tracing::info!(
            output = %guard.target().display(),
            clips = clips.len(),
            backend = self.backend.name(),
            "Writing video"
        );
        self.backend.write(
            clips,
            guard.staging_path(),
            &self.config.encoder_settings(),
            self.encode_progress.clone(),
        )
    }
}

fn fallback_rate() -> ReelcutResult<FrameRate> {
    FrameRate::validate(Some(FALLBACK_ANALYSIS_FPS), None)
        .ok_or_else(|| ReelcutError::processing("invalid fallback analysis rate"))
}

/// Refuse to write over a source the run reads from.
fn ensure_not_input(output: &Path, input: &Path) -> ReelcutResult<()> {
    if same_file(output, input) {
        return Err(ReelcutError::config(format!(
            "output {} would overwrite the input",
            output.display()
        )));
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
