pub mod action;
pub mod check;
pub mod highlight;
pub mod info;
pub mod steady;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use reelcut_common::config::AppConfig;
use reelcut_pipeline::{HighlightPipeline, PipelineConfig, PipelineResult};
use reelcut_processing_core::{CancelFlag, ScanControl, ScanProgress};
use reelcut_render_engine::{EncodeProgress, FfmpegBackend, MediaBackend};

/// Run `job` on a blocking thread with an ffmpeg-backed pipeline.
///
/// Ctrl-C, or `timeout_secs` elapsing, raises the cancel flag; the scan
/// stops at the next frame boundary.
pub(crate) async fn drive<F>(
    config: &AppConfig,
    timeout_secs: Option<u64>,
    job: F,
) -> anyhow::Result<PipelineResult>
where
    F: FnOnce(&HighlightPipeline) -> PipelineResult + Send + 'static,
{
    let backend = FfmpegBackend::new();
    if !backend.is_available() {
        anyhow::bail!("ffmpeg and ffprobe must be available in PATH (see `reelcut check`)");
    }

    let cancel = CancelFlag::new();
    let control = ScanControl::default()
        .with_cancel(cancel.clone())
        .with_progress(Arc::new(print_scan_progress));
    let pipeline = HighlightPipeline::new(Arc::new(backend), PipelineConfig::from(config))
        .with_control(control)
        .with_encode_progress(Arc::new(print_encode_progress));

    let watcher = tokio::spawn(async move {
        let deadline = async {
            match timeout_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
                    return;
                }
                tracing::warn!("Interrupted, stopping after the current frame");
            }
            _ = deadline => {
                tracing::warn!(timeout_secs, "Timeout reached, stopping after the current frame");
            }
        }
        cancel.cancel();
    });

    let result = tokio::task::spawn_blocking(move || job(&pipeline)).await;
    watcher.abort();
    println!();
    Ok(result?)
}

fn print_scan_progress(p: ScanProgress) {
    if p.frames_done % 25 != 0 {
        return;
    }
    match p.fraction() {
        Some(f) => print!(
            "\r  {}: {:.1}% ({}/{} frames)  ",
            p.stage,
            f * 100.0,
            p.frames_done,
            p.frames_expected.unwrap_or_default()
        ),
        None => print!("\r  {}: {} frames  ", p.stage, p.frames_done),
    }
    let _ = std::io::stdout().flush();
}

fn print_encode_progress(p: EncodeProgress) {
    print!(
        "\r  Encoding: {:.1}% (ETA: {:.0}s)  ",
        p.progress * 100.0,
        p.eta_secs
    );
    let _ = std::io::stdout().flush();
}

pub(crate) fn print_summary(result: &PipelineResult) {
    if !result.steady_intervals.is_empty() {
        println!("  Steady segments: {}", result.steady_intervals.len());
    }
    if let Some(threshold) = result.threshold {
        println!("  Motion threshold: {threshold:.4}");
        println!("  Action segments: {}", result.action_intervals.len());
    }
    if result.degraded {
        println!("  [WARN] Frame rate undetermined; stability filter skipped");
    }

    if result.success {
        println!("  Kept: {:.1}s", result.kept_secs());
        if let Some(path) = &result.steady_path {
            println!("Steady footage: {}", path.display());
        }
        if let Some(path) = &result.output_path {
            println!("Done: {}", path.display());
        }
    } else if let Some(error) = &result.error {
        println!("Failed during {}: {}", error.state, error.message);
    }
}
