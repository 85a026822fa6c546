//! Keep the most dynamic moments of footage that is already stabilized.

use std::path::PathBuf;

use reelcut_common::config::{AppConfig, MotionPolicy};
use reelcut_pipeline::naming::default_highlight_path;

pub async fn run(config: &AppConfig, input: PathBuf, output: Option<PathBuf>) -> anyhow::Result<bool> {
    let output = output.unwrap_or_else(|| default_highlight_path(&input));

    println!("Finding action in: {}", input.display());
    println!("  Output: {}", output.display());
    println!("  Top: {}%", config.analysis.top_percent);
    println!(
        "  Motion score: {}",
        match config.analysis.motion_policy {
            MotionPolicy::RoiPercentile => "central 95th percentile",
            MotionPolicy::Mean => "whole-frame mean",
        }
    );

    let out = output.clone();
    let result = super::drive(config, None, move |pipeline| pipeline.run_action(&input, &out)).await?;

    super::print_summary(&result);
    Ok(result.success)
}
