//! Sequential frame scanning with progress and cancellation.
//!
//! A scan pulls frames from a [`FrameStream`], scores each with a
//! [`FrameScorer`], and collects the samples in timestamp order. The gap
//! between two frames is the only point where a scan can stop early.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reelcut_common::error::{ReelcutError, ReelcutResult, SelectionStage};
use reelcut_media_model::{Frame, ScoredSample};

use crate::scorer::FrameScorer;

/// A sequential, single-reader source of decoded frames.
pub trait FrameStream {
    /// The next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> ReelcutResult<Option<Frame>>;

    /// Frame count hint for progress reporting.
    fn expected_frames(&self) -> Option<u64> {
        None
    }
}

impl<T: FrameStream + ?Sized> FrameStream for Box<T> {
    fn next_frame(&mut self) -> ReelcutResult<Option<Frame>> {
        (**self).next_frame()
    }

    fn expected_frames(&self) -> Option<u64> {
        (**self).expected_frames()
    }
}

/// Adapts any frame iterator into a [`FrameStream`].
pub struct FrameIter<I> {
    frames: I,
    expected: Option<u64>,
}

impl<I: Iterator<Item = Frame>> FrameIter<I> {
    pub fn new(frames: impl IntoIterator<IntoIter = I>) -> Self {
        let frames = frames.into_iter();
        let expected = match frames.size_hint() {
            (lo, Some(hi)) if lo == hi => Some(lo as u64),
            _ => None,
        };
        Self { frames, expected }
    }
}

impl<I: Iterator<Item = Frame>> FrameStream for FrameIter<I> {
    fn next_frame(&mut self) -> ReelcutResult<Option<Frame>> {
        Ok(self.frames.next())
    }

    fn expected_frames(&self) -> Option<u64> {
        self.expected
    }
}

/// Cooperative cancellation shared between a controller and a running scan.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress report, emitted once per processed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanProgress {
    pub stage: SelectionStage,
    pub frames_done: u64,
    pub frames_expected: Option<u64>,
}

impl ScanProgress {
    /// Completed fraction in `[0, 1]`, when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        self.frames_expected
            .filter(|total| *total > 0)
            .map(|total| (self.frames_done as f64 / total as f64).min(1.0))
    }
}

/// Progress callback for frame scans.
pub type ProgressCallback = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// Optional progress reporting and cancellation for a scan.
#[derive(Clone, Default)]
pub struct ScanControl {
    pub progress: Option<ProgressCallback>,
    pub cancel: Option<CancelFlag>,
}

impl ScanControl {
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    fn report(&self, progress: ScanProgress) {
        if let Some(cb) = &self.progress {
            cb(progress);
        }
    }
}

impl std::fmt::Debug for ScanControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanControl")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

/// Samples collected by one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub samples: Vec<ScoredSample>,
    pub frames: u64,
}

/// Score every frame of `stream` in order.
///
/// Fails with [`ReelcutError::Cancelled`] if the flag is raised between
/// frames, and with a processing error if the stream goes backwards in time.
pub fn scan_frames(
    stream: &mut dyn FrameStream,
    scorer: &FrameScorer,
    stage: SelectionStage,
    control: &ScanControl,
) -> ReelcutResult<ScanOutput> {
    let frames_expected = stream.expected_frames();
    let mut state = scorer.initial_state();
    let mut output = ScanOutput::default();
    let mut last_timestamp: Option<f64> = None;

    loop {
        if control.is_cancelled() {
            tracing::info!(%stage, frames = output.frames, "Scan cancelled");
            return Err(ReelcutError::Cancelled);
        }

        let Some(frame) = stream.next_frame()? else {
            break;
        };

        if let Some(last) = last_timestamp {
            if frame.timestamp <= last {
                return Err(ReelcutError::processing(format!(
                    "{stage} scan received out-of-order frame at {:.6}s after {:.6}s",
                    frame.timestamp, last
                )));
            }
        }
        last_timestamp = Some(frame.timestamp);

        let (next_state, sample) = scorer.score(state, &frame);
        state = next_state;
        if let Some(sample) = sample {
            output.samples.push(sample);
        }

        output.frames += 1;
        control.report(ScanProgress {
            stage,
            frames_done: output.frames,
            frames_expected,
        });
    }

    tracing::debug!(
        %stage,
        scorer = scorer.name(),
        frames = output.frames,
        samples = output.samples.len(),
        "Scan finished"
    );
    Ok(output)
}
