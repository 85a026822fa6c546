//! Artifact names derived from the input file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const HIGHLIGHT_PREFIX: &str = "highlight";
pub const STEADY_PREFIX: &str = "steady";

/// `<dir>/<prefix>_<input file name>`.
pub fn artifact_path(dir: &Path, prefix: &str, input: &Path) -> PathBuf {
    let mut name = OsString::from(format!("{prefix}_"));
    name.push(input.file_name().unwrap_or_else(|| input.as_os_str()));
    dir.join(name)
}

/// Default highlight location: next to the input.
pub fn default_highlight_path(input: &Path) -> PathBuf {
    artifact_path(parent_dir(input), HIGHLIGHT_PREFIX, input)
}

/// Steady artifact, placed next to the highlight output.
pub fn steady_path_for(output: &Path, input: &Path) -> PathBuf {
    artifact_path(parent_dir(output), STEADY_PREFIX, input)
}

/// `<output>.report.json`.
pub fn report_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".report.json");
    PathBuf::from(name)
}

fn parent_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_sits_next_to_input() {
        assert_eq!(
            default_highlight_path(Path::new("/rides/day1.mp4")),
            PathBuf::from("/rides/highlight_day1.mp4")
        );
        assert_eq!(
            default_highlight_path(Path::new("day1.mp4")),
            PathBuf::from("highlight_day1.mp4")
        );
    }

    #[test]
    fn steady_sits_next_to_output() {
        assert_eq!(
            steady_path_for(Path::new("/out/best.mp4"), Path::new("/rides/day1.mp4")),
            PathBuf::from("/out/steady_day1.mp4")
        );
    }

    #[test]
    fn report_appends_suffix() {
        assert_eq!(
            report_path_for(Path::new("/out/highlight_day1.mp4")),
            PathBuf::from("/out/highlight_day1.mp4.report.json")
        );
    }
}
