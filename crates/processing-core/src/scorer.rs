//! Frame scoring strategies.
//!
//! The set of strategies is closed. A pipeline picks one per stage by
//! configuration. Each strategy has a state type; for sharpness it is
//! empty, and for motion it holds the previous frame.

use reelcut_media_model::{Frame, ScoredSample};

use crate::motion::{MotionAccumulator, MotionScorer};
use crate::sharpness::laplacian_variance;

/// A per-frame metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameScorer {
    /// Variance of the Laplacian; one sample per frame.
    Sharpness,
    /// Optical-flow magnitude; one sample per transition, stamped with the later frame.
    Motion(MotionScorer),
}

/// State threaded through successive [`FrameScorer::score`] calls.
#[derive(Debug, Clone)]
pub enum ScorerState {
    Stateless,
    Motion(MotionAccumulator),
}

impl FrameScorer {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sharpness => "sharpness",
            Self::Motion(_) => "motion",
        }
    }

    pub fn initial_state(&self) -> ScorerState {
        match self {
            Self::Sharpness => ScorerState::Stateless,
            Self::Motion(_) => ScorerState::Motion(MotionAccumulator::new()),
        }
    }

    /// Score one frame, returning the next state and the sample it produced.
    pub fn score(&self, state: ScorerState, frame: &Frame) -> (ScorerState, Option<ScoredSample>) {
        match (self, state) {
            (Self::Sharpness, state) => (
                state,
                Some(ScoredSample::new(frame.timestamp, laplacian_variance(&frame.image))),
            ),
            (Self::Motion(scorer), ScorerState::Motion(acc)) => {
                let (acc, score) = scorer.score(acc, &frame.image);
                (
                    ScorerState::Motion(acc),
                    score.map(|s| ScoredSample::new(frame.timestamp, s)),
                )
            }
            (Self::Motion(scorer), ScorerState::Stateless) => {
                let (acc, score) = scorer.score(MotionAccumulator::new(), &frame.image);
                (
                    ScorerState::Motion(acc),
                    score.map(|s| ScoredSample::new(frame.timestamp, s)),
                )
            }
        }
    }
}
