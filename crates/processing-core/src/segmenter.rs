//! Run segmentation: turn a scored time series into kept intervals.
//!
//! Both selection stages share this routine. A sample is *active* when its
//! score is strictly greater than the threshold; samples equal to the
//! threshold (and NaN scores) are inactive.
//!
//! # Algorithm
//!
//! 1. Scan samples in timestamp order, tracking an optional run start.
//! 2. An active sample opens a run if none is open.
//! 3. An inactive sample closes an open run at its own timestamp. The run
//!    is kept if it lasted at least `min_duration` seconds.
//! 4. A run still open after the last sample closes at `total_duration`,
//!    under the same duration test.

use reelcut_media_model::{Interval, ScoredSample};

/// Segment `samples` into runs whose score exceeds `threshold`.
///
/// `samples` must be ordered by strictly increasing timestamp. The output
/// is ordered by start time and non-overlapping.
pub fn segment_runs(
    samples: &[ScoredSample],
    threshold: f64,
    min_duration: f64,
    total_duration: f64,
) -> Vec<Interval> {
    let mut runs = Vec::new();
    let mut run_start: Option<f64> = None;

    for sample in samples {
        if sample.score > threshold {
            if run_start.is_none() {
                run_start = Some(sample.timestamp);
            }
        } else if let Some(start) = run_start.take() {
            if sample.timestamp - start >= min_duration {
                if let Some(run) = Interval::new(start, sample.timestamp) {
                    runs.push(run);
                }
            }
        }
    }

    if let Some(start) = run_start {
        if total_duration - start >= min_duration {
            if let Some(run) = Interval::new(start, total_duration) {
                runs.push(run);
            }
        }
    }

    runs
}
