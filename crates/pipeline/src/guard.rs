//! Staged writes: outputs only appear at their final path once complete.

use std::path::{Path, PathBuf};

use tempfile::TempPath;

use reelcut_common::error::ReelcutResult;

/// A hidden sibling file that a write goes to before it becomes `target`.
///
/// [`OutputGuard::commit`] renames the staged file onto the target. Dropping
/// the guard without committing deletes the staged file and leaves whatever
/// was already at the target untouched.
#[derive(Debug)]
pub struct OutputGuard {
    target: PathBuf,
    staged: Option<TempPath>,
}

impl OutputGuard {
    /// Reserve a staging file next to `target`, creating its directory.
    ///
    /// The staging name keeps the target's extension so encoders can pick
    /// the container from it.
    pub fn stage(target: impl Into<PathBuf>) -> ReelcutResult<Self> {
        let target = target.into();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let suffix = target
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let staged = tempfile::Builder::new()
            .prefix(".reelcut-")
            .suffix(&suffix)
            .tempfile_in(&dir)?
            .into_temp_path();
        tracing::debug!(
            output = %target.display(),
            staged = %staged.display(),
            "Output staged"
        );
        Ok(Self {
            target,
            staged: Some(staged),
        })
    }

    /// Where the writer should put its bytes.
    pub fn staging_path(&self) -> &Path {
        self.staged.as_deref().unwrap_or(&self.target)
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the staged file onto the target, replacing any previous file.
    pub fn commit(mut self) -> ReelcutResult<PathBuf> {
        if let Some(staged) = self.staged.take() {
            // Staging files are created owner-only.
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&staged, std::fs::Permissions::from_mode(0o644))?;
            }
            staged.persist(&self.target).map_err(|e| e.error)?;
        }
        Ok(std::mem::take(&mut self.target))
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        let Some(staged) = self.staged.take() else {
            return;
        };
        let path = staged.to_path_buf();
        match staged.close() {
            Ok(()) => tracing::info!(
                output = %self.target.display(),
                "Discarded incomplete output"
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to remove incomplete output"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_file_sits_next_to_target_with_its_extension() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("highlight_ride.mp4");
        let guard = OutputGuard::stage(&target).unwrap();
        let staged = guard.staging_path().to_path_buf();
        assert_eq!(staged.parent(), target.parent());
        assert_eq!(staged.extension().and_then(|e| e.to_str()), Some("mp4"));
        assert_ne!(staged, target);
        assert!(staged.exists());
    }

    #[test]
    fn uncommitted_output_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("highlight_ride.mp4");
        let staged = {
            let guard = OutputGuard::stage(&target).unwrap();
            std::fs::write(guard.staging_path(), b"partial").unwrap();
            guard.staging_path().to_path_buf()
        };
        assert!(!staged.exists());
        assert!(!target.exists());
    }

    #[test]
    fn abandoned_write_leaves_existing_target_alone() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("highlight_ride.mp4");
        std::fs::write(&target, b"previous run").unwrap();
        drop(OutputGuard::stage(&target).unwrap());
        assert_eq!(std::fs::read(&target).unwrap(), b"previous run");
    }

    #[test]
    fn commit_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("highlight_ride.mp4");
        std::fs::write(&target, b"previous run").unwrap();
        let guard = OutputGuard::stage(&target).unwrap();
        std::fs::write(guard.staging_path(), b"complete").unwrap();
        let staged = guard.staging_path().to_path_buf();
        assert_eq!(guard.commit().unwrap(), target);
        assert_eq!(std::fs::read(&target).unwrap(), b"complete");
        assert!(!staged.exists());
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("reels").join("highlight_ride.mp4");
        let guard = OutputGuard::stage(&target).unwrap();
        assert!(target.parent().unwrap().is_dir());
        assert_eq!(guard.target(), target.as_path());
    }
}
