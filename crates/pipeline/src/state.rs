//! Pipeline states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a run is. Runs only move forward; any failure jumps to `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    Decode,
    StabilityFilter,
    ConcatenateSteady,
    ActionScore,
    ConcatenateBest,
    Write,
    Done,
    Aborted,
}

impl PipelineState {
    /// Full highlight order, `Init` to `Done`.
    pub const HIGHLIGHT: [PipelineState; 8] = [
        Self::Init,
        Self::Decode,
        Self::StabilityFilter,
        Self::ConcatenateSteady,
        Self::ActionScore,
        Self::ConcatenateBest,
        Self::Write,
        Self::Done,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    fn rank(self) -> Option<usize> {
        Self::HIGHLIGHT.iter().position(|s| *s == self)
    }

    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Reduced modes skip states, so any forward step is legal.
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Aborted {
            return true;
        }
        match (self.rank(), next.rank()) {
            (Some(a), Some(b)) => b > a,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Decode => "decode",
            Self::StabilityFilter => "stability_filter",
            Self::ConcatenateSteady => "concatenate_steady",
            Self::ActionScore => "action_score",
            Self::ConcatenateBest => "concatenate_best",
            Self::Write => "write",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
