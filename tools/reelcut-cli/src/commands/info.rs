//! Show probed source information.

use std::path::PathBuf;

use reelcut_common::timebase::FrameRate;
use reelcut_render_engine::probe::probe_source;

pub fn run(input: PathBuf) -> anyhow::Result<bool> {
    let info = probe_source(&input).map_err(|e| anyhow::anyhow!("Failed to probe source: {e}"))?;

    println!("Source: {}", info.path.display());
    println!("  Duration: {:.2}s", info.duration_secs);
    println!("  Resolution: {}x{}", info.width, info.height);
    match FrameRate::validate(info.frame_rate, None) {
        Some(rate) => {
            println!("  Frame rate: {rate}");
            println!("  Frames: ~{}", rate.expected_frames(info.duration_secs));
        }
        None => println!("  Frame rate: undetermined (stability filter will be skipped)"),
    }
    println!("  Audio: {}", if info.has_audio { "yes" } else { "no" });

    Ok(true)
}
