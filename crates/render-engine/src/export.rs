//! Highlight export: cut sub-clips from their sources and join them.
//!
//! One ffmpeg invocation does the whole job. Every distinct source file is
//! an input, every sub-clip is a `trim`/`atrim` branch of the filter graph,
//! and a single `concat` filter joins the branches before encoding.
//! Sources of different sizes are letterboxed onto the first clip's frame,
//! since `concat` only joins segments of identical geometry.

use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use reelcut_common::config::EncoderDefaults;
use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_media_model::SubClip;

/// Encoder parameters for the final write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub threads: u32,
    pub preset: String,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self::from(&EncoderDefaults::default())
    }
}

impl From<&EncoderDefaults> for EncoderSettings {
    fn from(defaults: &EncoderDefaults) -> Self {
        Self {
            video_codec: defaults.video_codec.clone(),
            audio_codec: defaults.audio_codec.clone(),
            threads: defaults.threads,
            preset: defaults.preset.clone(),
        }
    }
}

/// Progress callback for encoding.
pub type EncodeProgressCallback = Arc<dyn Fn(EncodeProgress) + Send + Sync>;

/// Encoder progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeProgress {
    /// Current progress [0.0, 1.0].
    pub progress: f64,

    /// Seconds of output written so far.
    pub out_time_secs: f64,

    /// Estimated time remaining in seconds.
    pub eta_secs: f64,

    /// The encoder reported completion.
    pub complete: bool,
}

/// A fully planned ffmpeg export.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub ffmpeg_args: Vec<String>,
    pub expected_duration_secs: f64,
    pub with_audio: bool,
}

/// Plan the ffmpeg invocation that writes `clips` back to back into `output`.
pub fn build_export_plan(
    clips: &[SubClip],
    output: &Path,
    settings: &EncoderSettings,
) -> ReelcutResult<ExportPlan> {
    if clips.is_empty() {
        return Err(ReelcutError::encode("nothing to write: no clips"));
    }

    // One input per distinct source, in first-use order.
    let mut inputs: Vec<PathBuf> = Vec::new();
    let mut input_of_clip = Vec::with_capacity(clips.len());
    for clip in clips {
        let idx = match inputs.iter().position(|p| p.as_path() == clip.path()) {
            Some(idx) => idx,
            None => {
                inputs.push(clip.path().to_path_buf());
                inputs.len() - 1
            }
        };
        input_of_clip.push(idx);
    }

    let with_audio = clips.iter().all(|c| c.source().info().has_audio);
    if !with_audio && clips.iter().any(|c| c.source().info().has_audio) {
        tracing::warn!("Some sources have no audio track, exporting video only");
    }

    let frame_size = |clip: &SubClip| (clip.source().info().width, clip.source().info().height);
    let first_size = frame_size(&clips[0]);
    let canvas = clips
        .iter()
        .any(|c| frame_size(c) != first_size)
        .then_some(first_size);
    if let Some((width, height)) = canvas {
        tracing::warn!(width, height, "Sources differ in size, fitting every clip to the first");
    }

    let spans: Vec<(usize, f64, f64)> = clips
        .iter()
        .zip(&input_of_clip)
        .map(|(clip, &input)| (input, clip.interval().start, clip.interval().end))
        .collect();
    let filter = build_concat_filter(&spans, canvas, with_audio);

    let mut args = vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-nostats".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
    ];
    for input in &inputs {
        args.push("-i".to_string());
        args.push(input.display().to_string());
    }
    args.push("-filter_complex".to_string());
    args.push(filter);
    args.push("-map".to_string());
    args.push("[vout]".to_string());
    if with_audio {
        args.push("-map".to_string());
        args.push("[aout]".to_string());
    }
    args.append(&mut codec_args(settings, with_audio));
    args.push(output.display().to_string());

    let expected_duration_secs = clips.iter().map(SubClip::duration).sum();
    tracing::info!(
        inputs = inputs.len(),
        clips = clips.len(),
        duration_secs = expected_duration_secs,
        with_audio,
        "Export plan built"
    );

    Ok(ExportPlan {
        ffmpeg_args: args,
        expected_duration_secs,
        with_audio,
    })
}

/// Filter graph cutting `(input, start, end)` spans and concatenating them.
///
/// With a `canvas`, every video branch is scaled to fit inside it, keeping
/// its aspect ratio, and padded to exactly that size.
pub fn build_concat_filter(
    spans: &[(usize, f64, f64)],
    canvas: Option<(u32, u32)>,
    with_audio: bool,
) -> String {
    let mut parts = Vec::with_capacity(spans.len() * 2 + 1);
    let mut concat_inputs = String::new();
    let fit = canvas
        .map(|(w, h)| {
            format!(
                ",scale={w}:{h}:force_original_aspect_ratio=decrease,\
                 pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1"
            )
        })
        .unwrap_or_default();

    for (i, (input, start, end)) in spans.iter().enumerate() {
        parts.push(format!(
            "[{input}:v:0]trim=start={start:.6}:end={end:.6},setpts=PTS-STARTPTS{fit}[v{i}]"
        ));
        concat_inputs.push_str(&format!("[v{i}]"));
        if with_audio {
            parts.push(format!(
                "[{input}:a:0]atrim=start={start:.6}:end={end:.6},asetpts=PTS-STARTPTS[a{i}]"
            ));
            concat_inputs.push_str(&format!("[a{i}]"));
        }
    }

    let outputs = if with_audio { "[vout][aout]" } else { "[vout]" };
    parts.push(format!(
        "{concat_inputs}concat=n={}:v=1:a={}{outputs}",
        spans.len(),
        u8::from(with_audio)
    ));
    parts.join(";")
}

fn codec_args(settings: &EncoderSettings, with_audio: bool) -> Vec<String> {
    let mut args = vec![
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-preset".to_string(),
        settings.preset.clone(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-threads".to_string(),
        settings.threads.to_string(),
    ];
    if with_audio {
        args.push("-c:a".to_string());
        args.push(settings.audio_codec.clone());
    }
    args.push("-movflags".to_string());
    args.push("+faststart".to_string());
    args
}

/// Run a planned export, reporting progress from `-progress pipe:1`.
pub fn run_export(plan: &ExportPlan, progress: Option<EncodeProgressCallback>) -> ReelcutResult<()> {
    tracing::debug!(args = ?plan.ffmpeg_args, "Running ffmpeg");
    let start = std::time::Instant::now();
    let mut child = Command::new("ffmpeg")
        .args(&plan.ffmpeg_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ReelcutError::encode(format!("Failed to start ffmpeg: {e}")))?;

    tracing::info!(pid = child.id(), "ffmpeg process started");

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ReelcutError::encode("Failed to capture ffmpeg stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ReelcutError::encode("Failed to capture ffmpeg stderr"))?;

    // Drain stderr concurrently so a chatty encoder cannot block on a full pipe.
    let stderr_task = std::thread::spawn(move || -> String {
        let mut reader = BufReader::new(stderr);
        let mut output = String::new();
        match reader.read_to_string(&mut output) {
            Ok(_) => output,
            Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
        }
    });

    let mut state = ProgressState::default();
    let mut last_advance_secs = 0.0f64;
    let mut last_advance_wall = std::time::Instant::now();
    for line in BufReader::new(stdout).lines() {
        let line = line.map_err(|e| ReelcutError::encode(format!("Failed reading ffmpeg progress: {e}")))?;
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        state.update(key, value);
        if key != "progress" {
            continue;
        }
        if state.out_time_secs > last_advance_secs + 0.001 {
            last_advance_secs = state.out_time_secs;
            last_advance_wall = std::time::Instant::now();
        }
        if let Some(cb) = &progress {
            cb(progress_report(
                &state,
                plan.expected_duration_secs,
                start.elapsed().as_secs_f64(),
            ));
        }
        if last_advance_wall.elapsed().as_secs() >= 10 {
            tracing::warn!(
                out_time_secs = state.out_time_secs,
                elapsed_secs = start.elapsed().as_secs_f64(),
                "No ffmpeg progress advancement for 10s"
            );
            last_advance_wall = std::time::Instant::now();
        }
    }

    let status = child
        .wait()
        .map_err(|e| ReelcutError::encode(format!("Failed to wait on ffmpeg: {e}")))?;
    let stderr_output = stderr_task
        .join()
        .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

    if !status.success() {
        return Err(ReelcutError::encode(format!(
            "ffmpeg export failed (status {status}): {}",
            stderr_output.trim()
        )));
    }

    tracing::info!(
        elapsed_secs = start.elapsed().as_secs_f64(),
        "ffmpeg export finished"
    );
    Ok(())
}

pub fn command_exists(binary: &str) -> bool {
    Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(state: &ProgressState, expected_duration_secs: f64, elapsed_secs: f64) -> EncodeProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };
    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    EncodeProgress {
        progress: if state.complete { 1.0 } else { progress },
        out_time_secs: state.out_time_secs,
        eta_secs,
        complete: state.complete,
    }
}
