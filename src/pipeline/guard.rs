//! RAII guard for scratch directories.
//!
//! Ensures the directory is removed on every exit path, including early
//! returns through `?` and panics.

use crate::error::{EnvironmentError, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary directory that is always removed.
///
/// Call [`ScratchDir::close`] on the normal path to observe removal errors;
/// otherwise `Drop` removes it and logs failures.
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    /// Create a fresh directory under the system temp dir
    pub fn new(prefix: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(|e| EnvironmentError::TempDir {
                reason: e.to_string(),
            })?;
        let path = dir.path().to_path_buf();
        log::debug!("Created scratch directory {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Location of the directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now, reporting failure
    pub fn close(mut self) -> Result<()> {
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|e| {
                EnvironmentError::Filesystem {
                    action: "remove".to_string(),
                    path: self.path.clone(),
                    reason: e.to_string(),
                }
                .into()
            }),
            None => Ok(()),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take()
            && let Err(e) = dir.close()
        {
            // Drop must not panic; leave a trace for manual cleanup
            log::warn!(
                "Failed to remove scratch directory {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_removes_directory() {
        let scratch = ScratchDir::new("antsibull-test-").unwrap();
        let path = scratch.path().to_path_buf();
        std::fs::write(path.join("file.py"), "x = 1").unwrap();
        assert!(path.exists());
        scratch.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let path = {
            let scratch = ScratchDir::new("antsibull-test-").unwrap();
            std::fs::create_dir_all(scratch.path().join("a/b")).unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_on_error_path() {
        fn failing(seen: &mut Option<PathBuf>) -> Result<()> {
            let scratch = ScratchDir::new("antsibull-test-")?;
            *seen = Some(scratch.path().to_path_buf());
            Err(std::io::Error::other("step failed").into())
        }

        let mut seen = None;
        assert!(failing(&mut seen).is_err());
        assert!(!seen.unwrap().exists());
    }
}
