//! Frame decoding through an `ffmpeg` rawvideo pipe.
//!
//! Each sub-clip gets its own decoder process, started lazily when the
//! previous one is exhausted. Frames come out as 8-bit intensity. Frame `j`
//! of a sub-clip starting at `offset` in the chain is stamped
//! `offset + j / fps`, and frames landing past the sub-clip's end are
//! dropped, so each sub-clip occupies exactly its own span of chain time.

use std::collections::VecDeque;
use std::fmt;
use std::io::{BufReader, ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_common::timebase::FrameRate;
use reelcut_media_model::{Frame, SubClip};
use reelcut_processing_core::FrameStream;

/// Where and how to read one sub-clip.
#[derive(Debug, Clone, PartialEq)]
struct DecodeSegment {
    path: PathBuf,
    start: f64,
    duration: f64,
    width: u32,
    height: u32,
}

impl DecodeSegment {
    fn from_clip(clip: &SubClip) -> Self {
        let info = clip.source().info();
        Self {
            path: clip.path().to_path_buf(),
            start: clip.interval().start,
            duration: clip.duration(),
            width: info.width,
            height: info.height,
        }
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Slack when comparing a frame's local time with its sub-clip's end.
const SEGMENT_END_EPSILON_SECS: f64 = 1e-6;

/// Chain time of frame `index` of a sub-clip that starts at `offset` and
/// lasts `duration`, or `None` when the frame falls outside it.
fn chain_timestamp(rate: FrameRate, offset: f64, index: u64, duration: f64) -> Option<f64> {
    let local = rate.frame_time(index);
    (local < duration - SEGMENT_END_EPSILON_SECS).then_some(offset + local)
}

fn exit_message(status: impl fmt::Display, stderr: &str) -> String {
    match stderr.trim() {
        "" => format!("ffmpeg decoder exited with {status}"),
        detail => format!("ffmpeg decoder exited with {status}: {detail}"),
    }
}

/// ffmpeg arguments that decode one span as raw gray frames on stdout.
fn decode_args(segment: &DecodeSegment, rate: FrameRate) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostdin".to_string(),
        "-ss".to_string(),
        format!("{:.6}", segment.start),
        "-i".to_string(),
        segment.path.display().to_string(),
        "-t".to_string(),
        format!("{:.6}", segment.duration),
        "-map".to_string(),
        "0:v:0".to_string(),
        "-an".to_string(),
        "-vf".to_string(),
        format!("fps={}", rate.fps()),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "gray".to_string(),
        "pipe:1".to_string(),
    ]
}

struct Decoder {
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    segment: DecodeSegment,
    frames: u64,
}

impl Decoder {
    fn spawn(segment: DecodeSegment, rate: FrameRate) -> ReelcutResult<Self> {
        let args = decode_args(&segment, rate);
        tracing::debug!(args = ?args, "Starting ffmpeg decoder");
        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ReelcutError::source_unreadable(&segment.path, format!("failed to start ffmpeg: {e}"))
            })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ReelcutError::source_unreadable(&segment.path, "failed to capture ffmpeg stdout")
        })?;
        let stderr = child.stderr.take().map(|stderr| {
            std::thread::spawn(move || {
                let mut output = String::new();
                match BufReader::new(stderr).read_to_string(&mut output) {
                    Ok(_) => output,
                    Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
                }
            })
        });
        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            stderr,
            segment,
            frames: 0,
        })
    }

    /// Next raw frame, or `None` when the decoder has finished.
    fn read_frame(&mut self) -> ReelcutResult<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.segment.frame_len()];
        match self.stdout.read_exact(&mut buf) {
            Ok(()) => {
                self.frames += 1;
                Ok(Some(buf))
            }
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.finish()?;
                Ok(None)
            }
            Err(e) => Err(ReelcutError::source_unreadable(
                &self.segment.path,
                format!("failed reading decoded frames: {e}"),
            )),
        }
    }

    fn finish(&mut self) -> ReelcutResult<()> {
        let status = self.child.wait().map_err(|e| {
            ReelcutError::source_unreadable(&self.segment.path, format!("failed to wait on ffmpeg: {e}"))
        })?;
        if status.success() {
            return Ok(());
        }
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if self.frames == 0 {
            return Err(ReelcutError::source_unreadable(
                &self.segment.path,
                exit_message(status, &stderr),
            ));
        }
        tracing::warn!(
            path = %self.segment.path.display(),
            frames = self.frames,
            %status,
            stderr = stderr.trim(),
            "Decoder stopped early, keeping frames read so far"
        );
        Ok(())
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Frames of a chain of sub-clips, decoded by ffmpeg.
pub struct FfmpegFrameStream {
    pending: VecDeque<DecodeSegment>,
    current: Option<Decoder>,
    rate: FrameRate,
    /// Chain time at which the current sub-clip starts.
    offset: f64,
    expected: u64,
}

impl FfmpegFrameStream {
    pub fn new(clips: &[SubClip], rate: FrameRate) -> ReelcutResult<Self> {
        let pending: VecDeque<DecodeSegment> = clips.iter().map(DecodeSegment::from_clip).collect();
        if let Some(bad) = pending.iter().find(|s| s.frame_len() == 0) {
            return Err(ReelcutError::source_unreadable(&bad.path, "zero-sized video"));
        }
        let expected = pending
            .iter()
            .map(|s| rate.expected_frames(s.duration))
            .sum();
        Ok(Self {
            pending,
            current: None,
            rate,
            offset: 0.0,
            expected,
        })
    }
}

impl FrameStream for FfmpegFrameStream {
    fn next_frame(&mut self) -> ReelcutResult<Option<Frame>> {
        loop {
            if self.current.is_none() {
                let Some(segment) = self.pending.pop_front() else {
                    return Ok(None);
                };
                self.current = Some(Decoder::spawn(segment, self.rate)?);
            }
            let Some(decoder) = self.current.as_mut() else {
                continue;
            };

            match decoder.read_frame()? {
                Some(bytes) => {
                    let (w, h) = (decoder.segment.width, decoder.segment.height);
                    let Some(timestamp) = chain_timestamp(
                        self.rate,
                        self.offset,
                        decoder.frames - 1,
                        decoder.segment.duration,
                    ) else {
                        continue;
                    };
                    return Frame::from_gray_bytes(timestamp, w, h, bytes)
                        .map(Some)
                        .ok_or_else(|| {
                            ReelcutError::processing(format!("decoded frame does not fit {w}x{h}"))
                        });
                }
                None => {
                    tracing::debug!(
                        path = %decoder.segment.path.display(),
                        frames = decoder.frames,
                        "Sub-clip decoded"
                    );
                    self.offset += decoder.segment.duration;
                    self.current = None;
                }
            }
        }
    }

    fn expected_frames(&self) -> Option<u64> {
        Some(self.expected)
    }
}
