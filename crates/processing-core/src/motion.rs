//! Motion metric: a dense flow field reduced to one score per transition.
//!
//! The scorer is stateless. The previous frame lives in an explicit
//! [`MotionAccumulator`] that the caller threads from one call to the next,
//! so a scan can be replayed or tested one step at a time.

use image::imageops;
use image::GrayImage;

use crate::flow::{dense_flow, FlowParams};
use crate::percentile::percentile;

/// How the per-pixel flow magnitudes are summarized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionSummary {
    /// `percentile` of the magnitudes inside a centered region of interest.
    /// `roi_margin` is the fraction cropped from each edge (0.1 keeps the middle 80%).
    RoiPercentile { percentile: f64, roi_margin: f64 },
    /// Mean magnitude over the full frame.
    Mean,
}

impl Default for MotionSummary {
    fn default() -> Self {
        Self::RoiPercentile {
            percentile: 95.0,
            roi_margin: 0.1,
        }
    }
}

/// Previous-frame state carried between calls to [`MotionScorer::score`].
#[derive(Debug, Clone, Default)]
pub struct MotionAccumulator {
    previous: Option<GrayImage>,
}

impl MotionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a predecessor frame has been seen.
    pub fn is_primed(&self) -> bool {
        self.previous.is_some()
    }
}

/// Scores the motion between consecutive frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionScorer {
    pub flow: FlowParams,
    pub summary: MotionSummary,
}

impl MotionScorer {
    pub fn new(flow: FlowParams, summary: MotionSummary) -> Self {
        Self { flow, summary }
    }

    /// Score `frame` against the frame held in `acc`.
    ///
    /// Returns the updated accumulator and the score. The first frame has
    /// no predecessor and scores `None`. A frame whose size differs from
    /// its predecessor restarts the accumulator and also scores `None`.
    pub fn score(&self, acc: MotionAccumulator, frame: &GrayImage) -> (MotionAccumulator, Option<f64>) {
        let score = match &acc.previous {
            Some(prev) if prev.dimensions() == frame.dimensions() => {
                Some(self.score_pair(prev, frame))
            }
            _ => None,
        };
        (
            MotionAccumulator {
                previous: Some(frame.clone()),
            },
            score,
        )
    }

    /// Score one transition directly.
    pub fn score_pair(&self, prev: &GrayImage, next: &GrayImage) -> f64 {
        match self.summary {
            MotionSummary::Mean => {
                let magnitudes = dense_flow(prev, next, &self.flow).magnitudes();
                if magnitudes.is_empty() {
                    0.0
                } else {
                    magnitudes.iter().sum::<f64>() / magnitudes.len() as f64
                }
            }
            MotionSummary::RoiPercentile {
                percentile: p,
                roi_margin,
            } => {
                let (prev_roi, next_roi) = match roi_bounds(prev.width(), prev.height(), roi_margin) {
                    Some((x, y, w, h)) => (
                        imageops::crop_imm(prev, x, y, w, h).to_image(),
                        imageops::crop_imm(next, x, y, w, h).to_image(),
                    ),
                    None => (prev.clone(), next.clone()),
                };
                let magnitudes = dense_flow(&prev_roi, &next_roi, &self.flow).magnitudes();
                percentile(&magnitudes, p).unwrap_or(0.0)
            }
        }
    }
}

/// Centered crop `(x, y, width, height)` dropping `margin` of each side.
/// `None` when the crop would be empty.
pub fn roi_bounds(width: u32, height: u32, margin: f64) -> Option<(u32, u32, u32, u32)> {
    let margin = margin.clamp(0.0, 0.49);
    let x0 = (f64::from(width) * margin) as u32;
    let x1 = (f64::from(width) * (1.0 - margin)) as u32;
    let y0 = (f64::from(height) * margin) as u32;
    let y1 = (f64::from(height) * (1.0 - margin)) as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}
