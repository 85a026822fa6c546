//! In-memory media backend for pipeline tests.
//!
//! Sources are generated from a function of source time, so any sub-clip
//! can be decoded at any rate without touching ffmpeg.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use image::{GrayImage, Luma};

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_common::timebase::FrameRate;
use reelcut_media_model::{Frame, Interval, SourceClip, SourceInfo, SubClip};
use reelcut_processing_core::{FrameIter, FrameStream};
use reelcut_render_engine::{EncodeProgressCallback, EncoderSettings, MediaBackend};

pub const SIDE: u32 = 64;

/// Image content at a given source time.
pub type Scene = fn(f64) -> GrayImage;

/// Fine 2x2 checkerboard: very high Laplacian variance.
pub fn sharp_background() -> GrayImage {
    GrayImage::from_fn(SIDE, SIDE, |x, y| {
        if (x / 2 + y / 2) % 2 == 0 {
            Luma([200])
        } else {
            Luma([40])
        }
    })
}

/// Uniform grey: zero Laplacian variance.
pub fn blurred() -> GrayImage {
    GrayImage::from_pixel(SIDE, SIDE, Luma([128]))
}

/// Sharp background with a flat 12x12 square whose left edge is at `x`.
pub fn with_square(x: u32) -> GrayImage {
    let mut img = sharp_background();
    for yy in 26..38 {
        for xx in x..x + 12 {
            img.put_pixel(xx, yy, Luma([255]));
        }
    }
    img
}

/// 20 s ride: blurred for [0, 4), sharp for [4, 16), blurred again after.
/// A square slides one pixel per 0.1 s during [9, 12) and rests otherwise.
pub fn ride(t: f64) -> GrayImage {
    if !(4.0..16.0).contains(&t) {
        return blurred();
    }
    let dx = ((t - 9.0).clamp(0.0, 3.0) * 10.0).round() as u32;
    with_square(10 + dx)
}

/// Always out of focus.
pub fn fog(_t: f64) -> GrayImage {
    blurred()
}

/// Stabilized clip: sharp throughout, square moving during [3, 6).
pub fn gimbal(t: f64) -> GrayImage {
    let dx = ((t - 3.0).clamp(0.0, 3.0) * 10.0).round() as u32;
    with_square(10 + dx)
}

/// Sharp throughout; the square moves one pixel per 1/30 s during [3, 4).
/// Every transition in that second differs when sampled at 30 fps.
pub fn drift(t: f64) -> GrayImage {
    let dx = ((t - 3.0).clamp(0.0, 1.0) * 30.0).round() as u32;
    with_square(10 + dx)
}

#[derive(Clone)]
struct SyntheticSource {
    info: SourceInfo,
    scene: Scene,
}

/// One recorded call to `write`.
#[derive(Debug, Clone)]
pub struct WriteCall {
    /// Path handed to the backend, a staging file next to the real output.
    pub output: PathBuf,
    pub clips: Vec<(PathBuf, Interval)>,
    pub settings: EncoderSettings,
}

impl WriteCall {
    /// Whether this write was staged for `target`.
    pub fn staged_for(&self, target: &Path) -> bool {
        self.output != target
            && self.output.parent() == target.parent()
            && self.output.extension() == target.extension()
    }
}

#[derive(Default)]
pub struct SyntheticBackend {
    sources: HashMap<PathBuf, SyntheticSource>,
    pub writes: Mutex<Vec<WriteCall>>,
    pub opened: Mutex<Vec<Weak<SourceClip>>>,
    pub fail_writes: bool,
    /// Fail every write without touching the filesystem.
    pub refuse_writes: bool,
    pub panic_on_open: bool,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source. The file itself is created so existence checks pass.
    pub fn add_source(
        &mut self,
        path: &Path,
        duration_secs: f64,
        frame_rate: Option<f64>,
        scene: Scene,
    ) {
        std::fs::write(path, b"synthetic").expect("create placeholder source");
        self.sources.insert(
            path.to_path_buf(),
            SyntheticSource {
                info: SourceInfo {
                    path: path.to_path_buf(),
                    duration_secs,
                    frame_rate,
                    width: SIDE,
                    height: SIDE,
                    has_audio: true,
                },
                scene,
            },
        );
    }

    pub fn write_calls(&self) -> Vec<WriteCall> {
        self.writes.lock().unwrap().clone()
    }

    /// Number of sources still referenced by anyone.
    pub fn live_sources(&self) -> usize {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.upgrade().is_some())
            .count()
    }
}

impl MediaBackend for SyntheticBackend {
    fn open(&self, path: &Path) -> ReelcutResult<Arc<SourceClip>> {
        if self.panic_on_open {
            panic!("decoder crashed");
        }
        let source = self
            .sources
            .get(path)
            .ok_or_else(|| ReelcutError::source_unreadable(path, "unknown synthetic source"))?;
        let clip = SourceClip::open(source.info.clone());
        self.opened.lock().unwrap().push(Arc::downgrade(&clip));
        Ok(clip)
    }

    fn frames(&self, clips: &[SubClip], rate: FrameRate) -> ReelcutResult<Box<dyn FrameStream>> {
        let mut frames = Vec::new();
        let mut offset = 0.0;
        for clip in clips {
            let scene = self
                .sources
                .get(clip.path())
                .map(|s| s.scene)
                .ok_or_else(|| ReelcutError::source_unreadable(clip.path(), "unknown source"))?;
            let count = rate.expected_frames(clip.duration());
            for j in 0..count {
                let source_time = clip.interval().start + rate.frame_time(j);
                frames.push(Frame::new(offset + rate.frame_time(j), scene(source_time)));
            }
            offset += clip.duration();
        }
        Ok(Box::new(FrameIter::new(frames)))
    }

    fn write(
        &self,
        clips: &[SubClip],
        output: &Path,
        settings: &EncoderSettings,
        _progress: Option<EncodeProgressCallback>,
    ) -> ReelcutResult<()> {
        if self.refuse_writes {
            return Err(ReelcutError::encode("synthetic encoder refused to start"));
        }
        // Leave a partial file behind either way, like a real encoder would.
        std::fs::write(output, b"partial")?;
        if self.fail_writes {
            return Err(ReelcutError::encode("synthetic encoder failure"));
        }
        self.writes.lock().unwrap().push(WriteCall {
            output: output.to_path_buf(),
            clips: clips
                .iter()
                .map(|c| (c.path().to_path_buf(), c.interval()))
                .collect(),
            settings: settings.clone(),
        });
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
