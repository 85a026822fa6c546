//! Source probing via `ffprobe`.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use reelcut_common::error::{ReelcutError, ReelcutResult};
use reelcut_common::timebase::FrameRate;
use reelcut_media_model::SourceInfo;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Run `ffprobe` on `path` and collect what the pipeline needs.
pub fn probe_source(path: &Path) -> ReelcutResult<SourceInfo> {
    if !path.exists() {
        return Err(ReelcutError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| ReelcutError::source_unreadable(path, format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReelcutError::source_unreadable(
            path,
            format!("ffprobe exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    let json = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_json(path, &json)?;
    tracing::debug!(
        path = %path.display(),
        duration = info.duration_secs,
        frame_rate = ?info.frame_rate,
        width = info.width,
        height = info.height,
        has_audio = info.has_audio,
        "Probed source"
    );
    Ok(info)
}

/// Interpret `ffprobe -print_format json` output.
///
/// The frame rate is reported raw; deciding whether it is usable is left
/// to [`FrameRate::validate`].
pub fn parse_probe_json(path: &Path, json: &str) -> ReelcutResult<SourceInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| ReelcutError::source_unreadable(path, format!("bad ffprobe output: {e}")))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ReelcutError::source_unreadable(path, "no video stream"))?;
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(ReelcutError::source_unreadable(
                path,
                "video stream has no dimensions",
            ))
        }
    };

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| ReelcutError::source_unreadable(path, "duration unknown"))?;

    let frame_rate = [video.avg_frame_rate.as_deref(), video.r_frame_rate.as_deref()]
        .into_iter()
        .flatten()
        .filter_map(FrameRate::parse_rational)
        .find(|fps| fps.is_finite() && *fps > 0.0);

    Ok(SourceInfo {
        path: path.to_path_buf(),
        duration_secs,
        frame_rate,
        width,
        height,
        has_audio,
    })
}
