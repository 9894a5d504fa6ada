//! Command line argument parsing.
//!
//! Every build setting can come from the config file, an `ANTSIBULL_*`
//! environment variable or a flag, with flags winning.

use crate::config::RawBuildConfig;
use clap::builder::PossibleValuesParser;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Release runner for the Ansible community package
#[derive(Parser, Debug)]
#[command(
    name = "antsibull_release",
    version,
    about = "Release runner for the Ansible community package",
    long_about = "Build, check and announce an Ansible community package release.

Usage:
  antsibull_release plan --ansible-version 10.1.0
  antsibull_release build --ansible-version 10.1.0 --python python3.11 --python python3.12
  antsibull_release build --config release.toml --tags-enforce-policy=false
  antsibull_release announce --ansible-version 10.1.0 --data-dir ansible-build-data/10 --output-dir announce
  antsibull_release send-announcements --announcements-dir announce"
)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Show detail lines
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check out build data, build the release, test it and report
    Build(BuildArgs),

    /// Print the resolved configuration and every step without running anything
    Plan(BuildArgs),

    /// Render release announcements from PyPI and the dependency file
    Announce(AnnounceArgs),

    /// Send announcements rendered by `announce`
    SendAnnouncements(SendArgs),
}

impl Command {
    /// Subcommand name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build(_) => "build",
            Command::Plan(_) => "plan",
            Command::Announce(_) => "announce",
            Command::SendAnnouncements(_) => "send-announcements",
        }
    }
}

/// Build settings shared by `build` and `plan`
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct BuildArgs {
    /// TOML configuration file; relative paths in it are anchored at its directory
    #[arg(short, long, value_name = "FILE", env = "ANTSIBULL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ansible package version to build
    #[arg(long, value_name = "VERSION", env = "ANTSIBULL_VERSION")]
    pub ansible_version: Option<String>,

    /// Executable performing the package build
    #[arg(long, value_name = "CMD", env = "ANTSIBULL_BUILD_COMMAND")]
    pub build_command: Option<String>,

    /// Directory everything else is relative to
    #[arg(long, value_name = "DIR", env = "ANTSIBULL_WORK_DIR")]
    pub work_dir: Option<String>,

    /// Build data repository to clone
    #[arg(long, value_name = "URL", env = "ANTSIBULL_DATA_REPO_URL")]
    pub data_repo_url: Option<String>,

    /// Branch or tag of the build data repository
    #[arg(long, value_name = "REF", env = "ANTSIBULL_DATA_REF")]
    pub data_ref: Option<String>,

    /// Reset an existing build data checkout to the reference
    #[arg(long, value_name = "BOOL", env = "ANTSIBULL_DATA_RESET",
          num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub data_reset: Option<bool>,

    /// Reuse the existing dependency file instead of running prepare
    #[arg(long, value_name = "BOOL", env = "ANTSIBULL_SKIP_PREPARE",
          num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub skip_prepare: Option<bool>,

    /// Delete previous build outputs before building
    #[arg(long, value_name = "BOOL", env = "ANTSIBULL_FORCE_REBUILD",
          num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub force_rebuild: Option<bool>,

    /// Keep an existing dependency file during setup
    #[arg(long, value_name = "BOOL", env = "ANTSIBULL_PRESERVE_DEPS",
          num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub preserve_deps: Option<bool>,

    /// Validate the collection tags file
    #[arg(long, value_name = "BOOL", env = "ANTSIBULL_TAGS_VALIDATE",
          num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub tags_validate: Option<bool>,

    /// Fail the run on tag validation errors instead of warning
    #[arg(long, value_name = "BOOL", env = "ANTSIBULL_TAGS_ENFORCE_POLICY",
          num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub tags_enforce_policy: Option<bool>,

    /// Byte-compile the built wheel
    #[arg(long, value_name = "BOOL", env = "ANTSIBULL_BYTECOMPILE",
          num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub bytecompile: Option<bool>,

    /// Interpreter to byte-compile with (repeatable)
    #[arg(long = "python", value_name = "PYTHON", env = "ANTSIBULL_PYTHONS", value_delimiter = ',')]
    pub pythons: Vec<String>,

    /// Byte-compilation workers; 0 uses every CPU
    #[arg(short, long, value_name = "N", env = "ANTSIBULL_JOBS")]
    pub jobs: Option<usize>,
}

impl BuildArgs {
    /// Settings given on the command line or through the environment
    pub fn overrides(&self) -> RawBuildConfig {
        RawBuildConfig {
            version: self.ansible_version.clone(),
            build_command: self.build_command.clone(),
            work_dir: self.work_dir.clone(),
            data_repo_url: self.data_repo_url.clone(),
            data_repo_ref: self.data_ref.clone(),
            data_reset: self.data_reset,
            skip_prepare: self.skip_prepare,
            force_rebuild: self.force_rebuild,
            preserve_deps: self.preserve_deps,
            tags_validate: self.tags_validate,
            tags_enforce_policy: self.tags_enforce_policy,
            bytecompile: self.bytecompile,
            bytecompile_pythons: (!self.pythons.is_empty()).then(|| self.pythons.clone()),
            bytecompile_jobs: self.jobs,
            ..Default::default()
        }
    }
}

/// Arguments of `announce`
#[derive(ClapArgs, Debug, Clone)]
pub struct AnnounceArgs {
    /// Released version to announce
    #[arg(long, value_name = "VERSION", env = "ANTSIBULL_VERSION")]
    pub ansible_version: String,

    /// Build data directory of the release's major version
    #[arg(long, value_name = "DIR")]
    pub data_dir: PathBuf,

    /// Dependency file inside the data directory [default: ansible-VERSION.deps]
    #[arg(long, value_name = "FILE")]
    pub deps_file: Option<String>,

    /// Where to write the announcements
    #[arg(long, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Verify the dists in this directory against PyPI
    #[arg(long, value_name = "DIR")]
    pub dist_dir: Option<PathBuf>,

    /// This is the last release of its major version
    #[arg(long)]
    pub end_of_life: bool,

    /// Run every send action after writing
    #[arg(long)]
    pub send: bool,

    /// Open the forum link in a browser when sending
    #[arg(long, requires = "send")]
    pub open_browser: bool,

    /// PyPI JSON API base URL
    #[arg(long, value_name = "URL", env = "ANTSIBULL_PYPI_URL",
          default_value = crate::announce::pypi::PYPI_JSON_URL, hide = true)]
    pub pypi_url: String,
}

impl AnnounceArgs {
    /// File name of the dependency file
    pub fn deps_file_name(&self) -> String {
        self.deps_file
            .clone()
            .unwrap_or_else(|| format!("ansible-{}.deps", self.ansible_version))
    }
}

/// Arguments of `send-announcements`
#[derive(ClapArgs, Debug, Clone)]
pub struct SendArgs {
    /// Directory written by `announce`
    #[arg(long, value_name = "DIR")]
    pub announcements_dir: PathBuf,

    /// Action to perform (repeatable) [default: all]
    #[arg(long = "action", value_name = "ACTION",
          value_parser = PossibleValuesParser::new(["forum", "matrix"]))]
    pub actions: Vec<String>,

    /// Open the forum link in a browser instead of printing it
    #[arg(long)]
    pub open_browser: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
