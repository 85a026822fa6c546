//! Check external tool availability.

use reelcut_common::config::config_file_path;
use reelcut_render_engine::export::command_exists;

pub fn run() -> anyhow::Result<bool> {
    println!("Reelcut System Check");
    println!("{}", "=".repeat(50));

    let mut all_ok = true;
    for binary in ["ffmpeg", "ffprobe"] {
        if command_exists(binary) {
            println!("[OK] {binary} found");
        } else {
            println!("[MISSING] {binary} not found in PATH");
            all_ok = false;
        }
    }

    let config_path = config_file_path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[INFO] No config at {} (using defaults)", config_path.display());
    }

    println!();
    if all_ok {
        println!("All required tools are available. Reelcut is ready.");
    } else {
        println!("Install ffmpeg (which provides ffprobe) and try again.");
    }
    Ok(all_ok)
}
