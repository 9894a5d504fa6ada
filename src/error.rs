//! Error types for release build operations.
//!
//! Every failure carries an actionable message; `ReleaseError::recovery_suggestions`
//! maps the common ones to next steps for the operator.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for antsibull_release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all antsibull_release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Configuration loading or resolution errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// External tool failures
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Tag metadata validation failures
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Environment failures (missing tools, temp directories, archives)
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// Release announcement errors
    #[error("Announcement error: {0}")]
    Announce(#[from] AnnounceError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Template rendering errors
    #[error("Template error: {0}")]
    Render(#[from] handlebars::RenderError),

    /// Template parsing errors
    #[error("Template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    /// HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {reason}")]
    ReadFailed {
        /// Path to the config file
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Config file is not valid TOML or has unknown keys
    #[error("Invalid config file {path}: {reason}")]
    Invalid {
        /// Path to the config file
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// No version given on the command line or in the file
    #[error("No Ansible version configured. Pass --ansible-version or set `version` in the config file.")]
    MissingVersion,

    /// Version string does not parse
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion {
        /// Version string
        version: String,
        /// Reason for the error
        reason: String,
    },

    /// A template could not be substituted
    #[error("Failed to resolve `{key}` from template '{template}': {reason}")]
    UnresolvedTemplate {
        /// Config key being resolved
        key: String,
        /// Raw template text
        template: String,
        /// Reason for the error
        reason: String,
    },

    /// A setting has a value outside its domain
    #[error("Invalid value for `{key}`: {reason}")]
    InvalidValue {
        /// Config key
        key: String,
        /// Reason for the error
        reason: String,
    },
}

/// External tool errors
#[derive(Error, Debug)]
pub enum ToolError {
    /// Tool exited with a non-zero status
    #[error("`{command}` exited with {}", exit_description(.code))]
    NonZeroExit {
        /// Rendered command line
        command: String,
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Captured stderr (or stdout when stderr was empty)
        output: String,
    },
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Tag metadata validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Tags file failed validation under an enforcing policy
    #[error("Tags file {path} failed validation: {reason}")]
    TagsFile {
        /// Path to the tags file
        path: PathBuf,
        /// Validator output
        reason: String,
    },
}

/// Environment errors
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// Program could not be found on PATH
    #[error("Tool '{program}' not found: {reason}")]
    ToolNotFound {
        /// Program name
        program: String,
        /// Reason for the error
        reason: String,
    },

    /// Program could not be started
    #[error("Failed to spawn `{command}`: {reason}")]
    SpawnFailed {
        /// Rendered command line
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Scratch directory could not be created
    #[error("Failed to create temporary directory: {reason}")]
    TempDir {
        /// Reason for the error
        reason: String,
    },

    /// Expected build artifact is missing
    #[error("Build artifact not found: {pattern}")]
    ArtifactMissing {
        /// Path or glob that matched nothing
        pattern: String,
    },

    /// Archive could not be unpacked
    #[error("Failed to unpack {path}: {reason}")]
    Unpack {
        /// Archive path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Filesystem action failed
    #[error("Failed to {action} {path}: {reason}")]
    Filesystem {
        /// Action that failed ("create", "remove")
        action: String,
        /// Target path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Release announcement errors
#[derive(Error, Debug)]
pub enum AnnounceError {
    /// PyPI has no data for the release
    #[error("Failed to retrieve data for {project}=={version}: {reason}")]
    ReleaseLookup {
        /// PyPI project name
        project: String,
        /// Version string
        version: String,
        /// Reason for the error
        reason: String,
    },

    /// PyPI release does not have exactly one sdist and one wheel
    #[error("Release {version} has {sdists} sdist(s) and {wheels} wheel(s); expected one of each")]
    DistSelection {
        /// Version string
        version: String,
        /// Number of sdists
        sdists: usize,
        /// Number of wheels
        wheels: usize,
    },

    /// Local dist file missing
    #[error("{filename} was not found in --dist-dir")]
    DistMissing {
        /// Expected filename
        filename: String,
    },

    /// Local dist file differs from PyPI
    #[error("{path} differs from {url}")]
    DistMismatch {
        /// Local file
        path: PathBuf,
        /// PyPI download URL
        url: String,
    },

    /// Dependency file is missing required keys
    #[error("Invalid dependency file {path}: {reason}")]
    InvalidDepsFile {
        /// Path to the deps file
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Unknown send action
    #[error("Unknown announcement action '{action}'. Valid actions: forum, matrix")]
    UnknownAction {
        /// Requested action
        action: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Config(ConfigError::MissingVersion) => vec![
                "Pass the version explicitly: antsibull_release build --ansible-version 10.1.0"
                    .to_string(),
            ],
            ReleaseError::Config(ConfigError::UnresolvedTemplate { .. }) => vec![
                "Available template variables: work_dir, version, major_version, data_repo_dir, sdist_dir, data_dir".to_string(),
                "Run `antsibull_release plan` to inspect the resolved configuration".to_string(),
            ],
            ReleaseError::Environment(EnvironmentError::ToolNotFound { program, .. }) => vec![
                format!("Install '{program}' or put it on PATH"),
                "Override the build command with --build-command".to_string(),
            ],
            ReleaseError::Environment(EnvironmentError::ArtifactMissing { .. }) => vec![
                "Check that the build stage produced a wheel (--bytecompile passes --build-wheel)"
                    .to_string(),
                "Re-run with --force-rebuild to regenerate build outputs".to_string(),
            ],
            ReleaseError::Validation(ValidationError::TagsFile { .. }) => vec![
                "Fix the collection tags reported above".to_string(),
                "Downgrade tag failures to warnings with --tags-enforce-policy=false".to_string(),
            ],
            ReleaseError::Tool(ToolError::NonZeroExit { command, .. })
                if command.starts_with("git ") =>
            {
                vec![
                    "Verify --data-repo-url and --data-ref".to_string(),
                    "Remove the data checkout and run again to re-clone".to_string(),
                ]
            }
            ReleaseError::Announce(AnnounceError::DistMismatch { .. }) => vec![
                "Rebuild the release or download the dists from PyPI into --dist-dir".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Captured tool output attached to this error, if any
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            ReleaseError::Tool(ToolError::NonZeroExit { output, .. })
            | ReleaseError::Validation(ValidationError::TagsFile { reason: output, .. }) => {
                Some(output.as_str()).filter(|o| !o.trim().is_empty())
            }
            _ => None,
        }
    }
}
