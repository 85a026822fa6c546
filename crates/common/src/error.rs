//! Error types shared across Reelcut crates.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which selection stage produced an empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStage {
    Stability,
    Action,
}

impl fmt::Display for SelectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stability => f.write_str("stability"),
            Self::Action => f.write_str("action"),
        }
    }
}

/// Top-level error type for Reelcut operations.
#[derive(Debug, thiserror::Error)]
pub enum ReelcutError {
    #[error("Source unreadable: {path}: {message}")]
    SourceUnreadable { path: PathBuf, message: String },

    #[error("Frame rate of {path} could not be determined")]
    UndeterminedFrameRate { path: PathBuf },

    #[error("No qualifying segments found in the {stage} stage")]
    EmptySegmentSet { stage: SelectionStage },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Processing error: {message}")]
    Processing { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ReelcutError.
pub type ReelcutResult<T> = Result<T, ReelcutError>;

impl ReelcutError {
    pub fn source_unreadable(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn empty_segments(stage: SelectionStage) -> Self {
        Self::EmptySegmentSet { stage }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn processing(msg: impl Into<String>) -> Self {
        Self::Processing {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Short machine-readable kind, used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnreadable { .. } => "source_unreadable",
            Self::UndeterminedFrameRate { .. } => "undetermined_frame_rate",
            Self::EmptySegmentSet { .. } => "empty_segment_set",
            Self::Encode { .. } => "encode_failure",
            Self::Cancelled => "cancelled",
            Self::Processing { .. } => "processing",
            Self::Config { .. } => "config",
            Self::FileNotFound { .. } => "file_not_found",
            Self::Io(_) | Self::Json(_) | Self::Other(_) => "unexpected_fault",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_segment_message_names_stage() {
        let err = ReelcutError::empty_segments(SelectionStage::Action);
        assert_eq!(
            err.to_string(),
            "No qualifying segments found in the action stage"
        );
        assert_eq!(err.kind(), "empty_segment_set");
    }

    #[test]
    fn io_errors_are_unexpected_faults() {
        let err: ReelcutError = std::io::Error::other("disk gone").into();
        assert_eq!(err.kind(), "unexpected_fault");
    }
}
