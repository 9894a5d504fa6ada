//! Shared helper functions for command execution.

use crate::cli::{BuildArgs, OutputManager};
use crate::config::{BuildConfig, RawBuildConfig};
use crate::error::{ReleaseError, Result};
use std::path::{Path, PathBuf};

/// Layer defaults, the config file and command line overrides, then resolve.
///
/// A relative `work_dir` is anchored at the config file's directory, or at the
/// current directory when no file is given.
pub(super) fn resolve_config(args: &BuildArgs) -> Result<BuildConfig> {
    let (file, base_dir) = match &args.config {
        Some(path) => {
            log::debug!("Loading configuration from {}", path.display());
            let base = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (RawBuildConfig::load(path)?, base)
        }
        None => (RawBuildConfig::default(), PathBuf::from(".")),
    };

    file.merge(args.overrides()).resolve(&base_dir)
}

/// Print the main settings of a resolved configuration
pub(super) fn print_config(output: &OutputManager, config: &BuildConfig) -> std::io::Result<()> {
    let rows = [
        ("version", config.version.to_string()),
        ("build command", config.build_command.clone()),
        ("work dir", config.work_dir.display().to_string()),
        (
            "build data",
            format!("{} @ {}", config.data_repo_url, config.data_repo_ref),
        ),
        ("checkout", config.data_repo_dir.display().to_string()),
        ("data dir", config.data_dir.display().to_string()),
        ("sdist dir", config.sdist_dir.display().to_string()),
        ("deps file", config.deps_file.clone()),
        ("tags file", config.tags_file.clone()),
        (
            "bytecompile",
            if config.bytecompile {
                format!(
                    "{} (-j {}, {} worker(s) on this host)",
                    config.bytecompile_pythons.join(", "),
                    config.bytecompile_jobs,
                    config.effective_jobs()
                )
            } else {
                "off".to_string()
            },
        ),
    ];
    for (key, value) in rows {
        output.indent(&format!("{key:<14} {value}"))?;
    }
    Ok(())
}

/// Print recovery suggestions for `error`
pub(super) fn print_suggestions(output: &OutputManager, error: &ReleaseError) {
    let suggestions = error.recovery_suggestions();
    if suggestions.is_empty() {
        return;
    }
    let _ = output.println("\n💡 Recovery suggestions:");
    for suggestion in suggestions {
        let _ = output.indent(&format!("• {suggestion}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_anchors_work_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");
        std::fs::write(&path, "version = \"9.5.1\"\nbytecompile = false\n").unwrap();

        let args = BuildArgs {
            config: Some(path),
            tags_validate: Some(false),
            ..Default::default()
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.version.to_string(), "9.5.1");
        assert_eq!(config.work_dir, dir.path());
        assert_eq!(config.data_dir, dir.path().join("ansible-build-data/9"));
        assert!(!config.bytecompile);
        assert!(!config.tags_validate);
    }

    #[test]
    fn test_flag_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");
        std::fs::write(&path, "version = \"9.5.1\"\n").unwrap();

        let args = BuildArgs {
            config: Some(path),
            ansible_version: Some("10.0.0a1".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_config(&args).unwrap().version.to_string(), "10.0.0a1");
    }

    #[test]
    fn test_missing_config_file() {
        let args = BuildArgs {
            config: Some(PathBuf::from("/nonexistent/release.toml")),
            ..Default::default()
        };
        assert!(matches!(
            resolve_config(&args),
            Err(ReleaseError::Config(crate::error::ConfigError::ReadFailed { .. }))
        ));
    }
}
