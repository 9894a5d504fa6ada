//! Wheel discovery and unpacking.

use crate::error::{EnvironmentError, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Find the wheel matching `pattern`, preferring the first in sorted order
pub fn find_wheel(pattern: &str) -> Result<PathBuf> {
    let entries = glob::glob(pattern).map_err(|e| EnvironmentError::ArtifactMissing {
        pattern: format!("{pattern} ({e})"),
    })?;

    let mut matches: Vec<PathBuf> = entries.filter_map(|entry| entry.ok()).collect();
    matches.sort();
    matches.into_iter().next().ok_or_else(|| {
        EnvironmentError::ArtifactMissing {
            pattern: pattern.to_string(),
        }
        .into()
    })
}

/// Extract `wheel` into `dest`, returning the number of files written.
///
/// An entry whose path would escape `dest` fails the whole unpack.
pub fn unpack_wheel(wheel: &Path, dest: &Path) -> Result<usize> {
    let unpack_err = |reason: String| EnvironmentError::Unpack {
        path: wheel.to_path_buf(),
        reason,
    };

    let file = File::open(wheel).map_err(|e| unpack_err(e.to_string()))?;
    let mut archive = ZipArchive::new(file).map_err(|e| unpack_err(e.to_string()))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| unpack_err(e.to_string()))?;
        let Some(target) = entry.enclosed_name().map(|p| dest.join(p)) else {
            return Err(unpack_err(format!("unsafe entry path {}", entry.name())).into());
        };

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| unpack_err(e.to_string()))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| unpack_err(e.to_string()))?;
        }
        let mut out = File::create(&target).map_err(|e| unpack_err(e.to_string()))?;
        io::copy(&mut entry, &mut out).map_err(|e| unpack_err(e.to_string()))?;
        written += 1;
    }

    Ok(written)
}
