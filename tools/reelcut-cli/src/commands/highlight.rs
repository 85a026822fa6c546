//! Cut a highlight reel: steady footage first, then the action within it.

use std::path::PathBuf;

use reelcut_common::config::AppConfig;
use reelcut_pipeline::naming::{default_highlight_path, report_path_for};

pub async fn run(
    config: &AppConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    report: bool,
    timeout_secs: Option<u64>,
) -> anyhow::Result<bool> {
    let output = output.unwrap_or_else(|| default_highlight_path(&input));

    println!("Cutting highlights from: {}", input.display());
    println!("  Output: {}", output.display());
    println!("  Blur threshold: {}", config.analysis.blur_threshold);
    println!("  Top: {}%", config.analysis.top_percent);

    let out = output.clone();
    let result = super::drive(config, timeout_secs, move |pipeline| pipeline.run(&input, &out)).await?;

    super::print_summary(&result);
    if report {
        let path = report_path_for(&output);
        result.write_report(&path)?;
        println!("Report: {}", path.display());
    }
    Ok(result.success)
}
