//! Media backends: where sources are opened, decoded and written.

use std::path::Path;
use std::sync::Arc;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_common::timebase::FrameRate;
use reelcut_media_model::{SourceClip, SubClip};
use reelcut_processing_core::FrameStream;

use crate::decode::FfmpegFrameStream;
use crate::export::{build_export_plan, command_exists, run_export, EncodeProgressCallback, EncoderSettings};
use crate::probe::probe_source;

/// Trait for media backends (ffmpeg, in-memory test doubles, ...).
pub trait MediaBackend: Send + Sync {
    /// Open and probe a source file.
    fn open(&self, path: &Path) -> ReelcutResult<Arc<SourceClip>>;

    /// Decode `clips` back to back as one stream at `rate`.
    fn frames(&self, clips: &[SubClip], rate: FrameRate) -> ReelcutResult<Box<dyn FrameStream>>;

    /// Encode `clips` back to back into `output`.
    fn write(
        &self,
        clips: &[SubClip],
        output: &Path,
        settings: &EncoderSettings,
        progress: Option<EncodeProgressCallback>,
    ) -> ReelcutResult<()>;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Backend that shells out to `ffprobe` and `ffmpeg`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        Self
    }
}

impl MediaBackend for FfmpegBackend {
    fn open(&self, path: &Path) -> ReelcutResult<Arc<SourceClip>> {
        Ok(SourceClip::open(probe_source(path)?))
    }

    fn frames(&self, clips: &[SubClip], rate: FrameRate) -> ReelcutResult<Box<dyn FrameStream>> {
        Ok(Box::new(FfmpegFrameStream::new(clips, rate)?))
    }

    fn write(
        &self,
        clips: &[SubClip],
        output: &Path,
        settings: &EncoderSettings,
        progress: Option<EncodeProgressCallback>,
    ) -> ReelcutResult<()> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let plan = build_export_plan(clips, output, settings)?;
        run_export(&plan, progress)?;

        let written = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(ReelcutError::encode(format!(
                "ffmpeg reported success but {} is empty",
                output.display()
            )));
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg") && command_exists("ffprobe")
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
