//! Build configuration.
//!
//! A release run is parameterized by one [`BuildConfig`]. It is assembled from
//! built-in defaults, an optional TOML file and command line overrides (in
//! increasing precedence) as a [`RawBuildConfig`], then resolved: every
//! `{{variable}}` template is substituted and every path made absolute. The
//! resolved record is never modified afterwards.

mod template;

use crate::error::{ConfigError, Result};
use crate::version::AnsibleVersion;
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use template::TemplateContext;

/// Default external build command
pub const DEFAULT_BUILD_COMMAND: &str = "antsibull-build";
/// Default build data repository
pub const DEFAULT_DATA_REPO_URL: &str = "https://github.com/ansible-community/ansible-build-data.git";
const DEFAULT_DATA_REPO_REF: &str = "main";
const DEFAULT_DATA_REPO_DIR: &str = "{{work_dir}}/ansible-build-data";
const DEFAULT_DATA_DIR: &str = "{{data_repo_dir}}/{{major_version}}";
const DEFAULT_SDIST_DIR: &str = "{{work_dir}}/build";
const DEFAULT_BUILD_FILE: &str = "ansible-{{major_version}}.build";
const DEFAULT_DEPS_FILE: &str = "ansible-{{version}}.deps";
const DEFAULT_TAGS_FILE: &str = "ansible-{{version}}-tags.yaml";
const DEFAULT_CHANGELOG_FILE: &str = "{{data_dir}}/CHANGELOG-v{{major_version}}.md";
const DEFAULT_PORTING_GUIDE_FILE: &str = "{{data_dir}}/porting_guide_{{major_version}}.rst";
const DEFAULT_PYTHON: &str = "python3";

/// Unresolved configuration as read from a file or the command line.
///
/// Every field is optional; unset fields fall back to the next layer and
/// finally to the built-in defaults during [`RawBuildConfig::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBuildConfig {
    /// Ansible package version to build
    pub version: Option<String>,
    /// Executable performing the package build
    pub build_command: Option<String>,
    /// Base directory for relative paths (not templated)
    pub work_dir: Option<String>,
    /// Build data repository URL
    pub data_repo_url: Option<String>,
    /// Branch or tag to check out
    pub data_repo_ref: Option<String>,
    /// Checkout location of the build data repository
    pub data_repo_dir: Option<String>,
    /// Reset an existing checkout to `data_repo_ref`
    pub data_reset: Option<bool>,
    /// Per-major-version data directory inside the checkout
    pub data_dir: Option<String>,
    /// Output directory for the sdist and wheel
    pub sdist_dir: Option<String>,
    /// Build file name inside `data_dir`
    pub build_file: Option<String>,
    /// Dependency file name inside `data_dir`
    pub deps_file: Option<String>,
    /// Tags file name inside `data_dir`
    pub tags_file: Option<String>,
    /// Where the build writes the changelog
    pub changelog_file: Option<String>,
    /// Where the build writes the porting guide
    pub porting_guide_file: Option<String>,
    /// Skip `prepare` and reuse the existing dependency file
    pub skip_prepare: Option<bool>,
    /// Delete existing build outputs before rebuilding
    pub force_rebuild: Option<bool>,
    /// Keep the existing dependency file instead of regenerating it
    pub preserve_deps: Option<bool>,
    /// Validate the tags file after building
    pub tags_validate: Option<bool>,
    /// Treat tag validation failures as fatal
    pub tags_enforce_policy: Option<bool>,
    /// Byte-compile the wheel contents after building
    pub bytecompile: Option<bool>,
    /// Interpreters used for byte-compilation
    pub bytecompile_pythons: Option<Vec<String>>,
    /// Worker count for byte-compilation, 0 for all available
    pub bytecompile_jobs: Option<usize>,
}

macro_rules! overlay {
    ($base:expr, $top:expr, [$($field:ident),* $(,)?]) => {
        RawBuildConfig {
            $($field: $top.$field.or($base.$field),)*
        }
    };
}

impl RawBuildConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| {
            ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win
    pub fn merge(self, overrides: RawBuildConfig) -> RawBuildConfig {
        overlay!(
            self,
            overrides,
            [
                version,
                build_command,
                work_dir,
                data_repo_url,
                data_repo_ref,
                data_repo_dir,
                data_reset,
                data_dir,
                sdist_dir,
                build_file,
                deps_file,
                tags_file,
                changelog_file,
                porting_guide_file,
                skip_prepare,
                force_rebuild,
                preserve_deps,
                tags_validate,
                tags_enforce_policy,
                bytecompile,
                bytecompile_pythons,
                bytecompile_jobs,
            ]
        )
    }

    /// Substitute templates and produce the immutable run configuration.
    ///
    /// `base_dir` anchors a relative `work_dir`; it is usually the directory of
    /// the config file or the current directory.
    pub fn resolve(&self, base_dir: &Path) -> Result<BuildConfig> {
        let version_str = self
            .version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::MissingVersion)?;
        let version = AnsibleVersion::parse(version_str)?;

        let base_dir = base_dir
            .absolutize()
            .map_err(|e| ConfigError::InvalidValue {
                key: "work_dir".to_string(),
                reason: format!("cannot normalize {}: {e}", base_dir.display()),
            })?
            .into_owned();
        let work_dir = template::absolutize(
            "work_dir",
            Path::new(self.work_dir.as_deref().unwrap_or(".")),
            &base_dir,
        )?;

        let mut ctx = TemplateContext::new();
        ctx.insert("work_dir", work_dir.display().to_string());
        ctx.insert("version", version.to_string());
        ctx.insert("major_version", version.major.to_string());

        let build_command = ctx.render(
            "build_command",
            self.build_command.as_deref().unwrap_or(DEFAULT_BUILD_COMMAND),
        )?;
        let data_repo_url = ctx.render(
            "data_repo_url",
            self.data_repo_url.as_deref().unwrap_or(DEFAULT_DATA_REPO_URL),
        )?;
        let data_repo_ref = ctx.render(
            "data_repo_ref",
            self.data_repo_ref.as_deref().unwrap_or(DEFAULT_DATA_REPO_REF),
        )?;

        let data_repo_dir = ctx.resolve_path(
            "data_repo_dir",
            self.data_repo_dir.as_deref().unwrap_or(DEFAULT_DATA_REPO_DIR),
            &work_dir,
        )?;
        let sdist_dir = ctx.resolve_path(
            "sdist_dir",
            self.sdist_dir.as_deref().unwrap_or(DEFAULT_SDIST_DIR),
            &work_dir,
        )?;
        let data_dir = ctx.resolve_path(
            "data_dir",
            self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR),
            &work_dir,
        )?;

        let build_file = ctx.render(
            "build_file",
            self.build_file.as_deref().unwrap_or(DEFAULT_BUILD_FILE),
        )?;
        let deps_file = ctx.render(
            "deps_file",
            self.deps_file.as_deref().unwrap_or(DEFAULT_DEPS_FILE),
        )?;
        let tags_file = ctx.render(
            "tags_file",
            self.tags_file.as_deref().unwrap_or(DEFAULT_TAGS_FILE),
        )?;
        let changelog_file = ctx.resolve_path(
            "changelog_file",
            self.changelog_file.as_deref().unwrap_or(DEFAULT_CHANGELOG_FILE),
            &work_dir,
        )?;
        let porting_guide_file = ctx.resolve_path(
            "porting_guide_file",
            self.porting_guide_file
                .as_deref()
                .unwrap_or(DEFAULT_PORTING_GUIDE_FILE),
            &work_dir,
        )?;

        let bytecompile = self.bytecompile.unwrap_or(true);
        let bytecompile_pythons = self
            .bytecompile_pythons
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_PYTHON.to_string()]);
        if bytecompile && bytecompile_pythons.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                key: "bytecompile_pythons".to_string(),
                reason: "byte-compilation is enabled but no interpreter is configured".to_string(),
            }
            .into());
        }

        Ok(BuildConfig {
            version,
            build_command,
            work_dir,
            data_repo_url,
            data_repo_ref,
            data_repo_dir,
            data_reset: self.data_reset.unwrap_or(true),
            data_dir,
            sdist_dir,
            build_file,
            deps_file,
            tags_file,
            changelog_file,
            porting_guide_file,
            skip_prepare: self.skip_prepare.unwrap_or(false),
            force_rebuild: self.force_rebuild.unwrap_or(false),
            preserve_deps: self.preserve_deps.unwrap_or(false),
            tags_validate: self.tags_validate.unwrap_or(true),
            tags_enforce_policy: self.tags_enforce_policy.unwrap_or(true),
            bytecompile,
            bytecompile_pythons: bytecompile_pythons
                .into_iter()
                .filter(|p| !p.trim().is_empty())
                .collect(),
            bytecompile_jobs: self.bytecompile_jobs.unwrap_or(0),
        })
    }
}

/// Fully resolved settings for one release run
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Ansible package version being built
    pub version: AnsibleVersion,
    /// Executable performing the package build
    pub build_command: String,
    /// Base directory relative paths were resolved against
    pub work_dir: PathBuf,
    /// Build data repository URL
    pub data_repo_url: String,
    /// Branch or tag of the build data repository
    pub data_repo_ref: String,
    /// Checkout location of the build data repository
    pub data_repo_dir: PathBuf,
    /// Reset an existing checkout to `data_repo_ref`
    pub data_reset: bool,
    /// Per-major-version data directory
    pub data_dir: PathBuf,
    /// Output directory for the sdist and wheel
    pub sdist_dir: PathBuf,
    /// Build file name inside `data_dir`
    pub build_file: String,
    /// Dependency file name inside `data_dir`
    pub deps_file: String,
    /// Tags file name inside `data_dir`
    pub tags_file: String,
    /// Changelog written by the build
    pub changelog_file: PathBuf,
    /// Porting guide written by the build
    pub porting_guide_file: PathBuf,
    /// Skip the prepare step
    pub skip_prepare: bool,
    /// Delete existing build outputs first
    pub force_rebuild: bool,
    /// Keep the existing dependency file
    pub preserve_deps: bool,
    /// Validate the tags file
    pub tags_validate: bool,
    /// Fail the run on tag validation errors
    pub tags_enforce_policy: bool,
    /// Byte-compile the wheel
    pub bytecompile: bool,
    /// Interpreters used for byte-compilation
    pub bytecompile_pythons: Vec<String>,
    /// Worker count for byte-compilation, 0 for all available
    pub bytecompile_jobs: usize,
}

impl BuildConfig {
    /// Path of the dependency file
    pub fn deps_path(&self) -> PathBuf {
        self.data_dir.join(&self.deps_file)
    }

    /// Path of the tags file
    pub fn tags_path(&self) -> PathBuf {
        self.data_dir.join(&self.tags_file)
    }

    /// Path of the source distribution the build produces
    pub fn sdist_path(&self) -> PathBuf {
        self.sdist_dir.join(format!("ansible-{}.tar.gz", self.version))
    }

    /// Path of the wheel the build produces
    pub fn wheel_path(&self) -> PathBuf {
        self.sdist_dir
            .join(format!("ansible-{}-py3-none-any.whl", self.version))
    }

    /// Glob matching any wheel built for this version. Glob characters in
    /// `sdist_dir` match literally.
    pub fn wheel_pattern(&self) -> String {
        let dir = glob::Pattern::escape(&self.sdist_dir.display().to_string());
        Path::new(&dir)
            .join(format!("ansible-{}-*.whl", self.version))
            .display()
            .to_string()
    }

    /// Byte-compilation workers this host will actually use
    pub fn effective_jobs(&self) -> usize {
        match self.bytecompile_jobs {
            0 => num_cpus::get(),
            n => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(version: &str) -> RawBuildConfig {
        RawBuildConfig {
            version: Some(version.to_string()),
            ..Default::default()
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_defaults_resolve() {
        let config = raw("10.1.0").resolve(Path::new("/srv/release")).unwrap();
        assert_eq!(config.build_command, "antsibull-build");
        assert_eq!(config.data_repo_dir, PathBuf::from("/srv/release/ansible-build-data"));
        assert_eq!(config.data_dir, PathBuf::from("/srv/release/ansible-build-data/10"));
        assert_eq!(config.sdist_dir, PathBuf::from("/srv/release/build"));
        assert_eq!(config.build_file, "ansible-10.build");
        assert_eq!(config.deps_file, "ansible-10.1.0.deps");
        assert_eq!(config.tags_file, "ansible-10.1.0-tags.yaml");
        assert_eq!(
            config.changelog_file,
            PathBuf::from("/srv/release/ansible-build-data/10/CHANGELOG-v10.md")
        );
        assert_eq!(
            config.porting_guide_file,
            PathBuf::from("/srv/release/ansible-build-data/10/porting_guide_10.rst")
        );
        assert!(config.data_reset);
        assert!(config.tags_validate);
        assert!(config.tags_enforce_policy);
        assert!(config.bytecompile);
        assert!(!config.skip_prepare);
        assert!(!config.force_rebuild);
        assert!(!config.preserve_deps);
        assert_eq!(config.bytecompile_pythons, vec!["python3".to_string()]);
        assert_eq!(config.bytecompile_jobs, 0);
        assert_eq!(
            config.wheel_path(),
            PathBuf::from("/srv/release/build/ansible-10.1.0-py3-none-any.whl")
        );
        assert_eq!(config.sdist_path(), PathBuf::from("/srv/release/build/ansible-10.1.0.tar.gz"));
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_work_dir_and_custom_templates() {
        let config = RawBuildConfig {
            version: Some("9.0.0rc1".to_string()),
            work_dir: Some("out".to_string()),
            sdist_dir: Some("{{work_dir}}/dist/{{version}}".to_string()),
            data_dir: Some("{{data_repo_dir}}/{{major_version}}".to_string()),
            data_repo_dir: Some("/data/abd".to_string()),
            ..Default::default()
        }
        .resolve(Path::new("/base"))
        .unwrap();

        assert_eq!(config.work_dir, PathBuf::from("/base/out"));
        assert_eq!(config.sdist_dir, PathBuf::from("/base/out/dist/9.0.0rc1"));
        assert_eq!(config.data_dir, PathBuf::from("/data/abd/9"));
        assert_eq!(config.deps_path(), PathBuf::from("/data/abd/9/ansible-9.0.0rc1.deps"));
    }

    #[test]
    fn test_missing_version() {
        let err = RawBuildConfig::default().resolve(Path::new(".")).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReleaseError::Config(ConfigError::MissingVersion)
        ));
    }

    #[test]
    fn test_invalid_version() {
        assert!(raw("ten").resolve(Path::new(".")).is_err());
    }

    #[test]
    fn test_unknown_template_variable() {
        let config = RawBuildConfig {
            sdist_dir: Some("{{build_root}}/build".to_string()),
            ..raw("10.0.0")
        };
        let err = config.resolve(Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("sdist_dir"), "{err}");
    }

    #[test]
    fn test_templates_cannot_reference_later_keys() {
        // data_repo_dir resolves before data_dir
        let config = RawBuildConfig {
            data_repo_dir: Some("{{data_dir}}/repo".to_string()),
            ..raw("10.0.0")
        };
        assert!(config.resolve(Path::new(".")).is_err());
    }

    #[test]
    fn test_bytecompile_without_pythons() {
        let config = RawBuildConfig {
            bytecompile_pythons: Some(vec![]),
            ..raw("10.0.0")
        };
        assert!(config.resolve(Path::new(".")).is_err());

        let disabled = RawBuildConfig {
            bytecompile: Some(false),
            bytecompile_pythons: Some(vec![]),
            ..raw("10.0.0")
        };
        assert!(disabled.resolve(Path::new(".")).is_ok());
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let file = RawBuildConfig {
            version: Some("9.1.0".to_string()),
            build_command: Some("/opt/antsibull-build".to_string()),
            skip_prepare: Some(true),
            ..Default::default()
        };
        let cli = RawBuildConfig {
            version: Some("9.2.0".to_string()),
            skip_prepare: Some(false),
            ..Default::default()
        };
        let merged = file.merge(cli);
        assert_eq!(merged.version.as_deref(), Some("9.2.0"));
        assert_eq!(merged.build_command.as_deref(), Some("/opt/antsibull-build"));
        assert_eq!(merged.skip_prepare, Some(false));
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");
        std::fs::write(&path, "version = \"10.0.0\"\nantsibull_build_command = \"x\"\n").unwrap();
        let err = RawBuildConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("release.toml"), "{err}");
    }

    #[test]
    fn test_load_reads_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");
        std::fs::write(
            &path,
            r#"
version = "10.1.0"
data_repo_ref = "10.1.0"
tags_enforce_policy = false
bytecompile_pythons = ["python3.10", "python3.12"]
bytecompile_jobs = 4
"#,
        )
        .unwrap();
        let raw = RawBuildConfig::load(&path).unwrap();
        let config = raw.resolve(dir.path()).unwrap();
        assert_eq!(config.data_repo_ref, "10.1.0");
        assert!(!config.tags_enforce_policy);
        assert_eq!(config.bytecompile_pythons.len(), 2);
        assert_eq!(config.bytecompile_jobs, 4);
        assert_eq!(config.effective_jobs(), 4);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RawBuildConfig::load(Path::new("/nonexistent/release.toml")).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReleaseError::Config(ConfigError::ReadFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_wheel_pattern_escapes_sdist_dir() {
        let config = RawBuildConfig {
            version: Some("10.1.0".to_string()),
            sdist_dir: Some("/srv/release[10]/dist*".to_string()),
            ..Default::default()
        }
        .resolve(Path::new("/base"))
        .unwrap();

        assert_eq!(
            config.wheel_pattern(),
            "/srv/release[[]10[]]/dist[*]/ansible-10.1.0-*.whl"
        );
    }
}
