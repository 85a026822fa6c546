//! Join the steady footage of one or more videos.

use std::path::PathBuf;

use reelcut_common::config::AppConfig;
use reelcut_pipeline::naming::{artifact_path, STEADY_PREFIX};

pub async fn run(
    config: &AppConfig,
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<bool> {
    let first = inputs
        .first()
        .ok_or_else(|| anyhow::anyhow!("at least one input is required"))?;
    let output = output.unwrap_or_else(|| {
        artifact_path(
            first.parent().unwrap_or_else(|| std::path::Path::new("")),
            STEADY_PREFIX,
            first,
        )
    });

    println!("Collecting steady footage from {} file(s)", inputs.len());
    println!("  Output: {}", output.display());
    println!("  Blur threshold: {}", config.analysis.blur_threshold);

    let out = output.clone();
    let result =
        super::drive(config, None, move |pipeline| pipeline.run_steady(&inputs, &out)).await?;

    super::print_summary(&result);
    if !result.success {
        println!("Hint: lower --blur to accept softer footage.");
    }
    Ok(result.success)
}
