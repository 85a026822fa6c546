//! Reelcut Render Engine
//!
//! The media side of the pipeline. Everything that touches files or
//! external processes lives here, behind the [`MediaBackend`] trait.
//!
//! # Data Flow
//!
//! ```text
//! input.mp4 ── ffprobe ──▶ SourceInfo
//!     │
//!     └── ffmpeg (rawvideo, gray) ──▶ FrameStream ──▶ selection stages
//!                                                          │
//!                                                   cut list (SubClips)
//!                                                          │
//! input.mp4 ── ffmpeg (trim/atrim + concat) ◀──────────────┘
//!                  │
//!                  ▼
//!           highlight_input.mp4
//! ```

pub mod backend;
pub mod decode;
pub mod export;
pub mod probe;

pub use backend::{FfmpegBackend, MediaBackend};
pub use export::{EncodeProgress, EncodeProgressCallback, EncoderSettings};
