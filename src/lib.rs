//! # antsibull_release
//!
//! Release runner for the Ansible community package.
//!
//! A release run checks out the build data repository, drives the external
//! build command, validates collection tags, byte-compiles the produced wheel
//! and reports where the artifacts landed. Stages run strictly in order and the
//! first failing step halts the run.
//!
//! After publishing, the same tool renders and sends the release announcements.
//!
//! ## Usage
//!
//! ```bash
//! antsibull_release plan --ansible-version 10.1.0      # show every step
//! antsibull_release build --ansible-version 10.1.0     # run them
//! antsibull_release announce --ansible-version 10.1.0 --data-dir ansible-build-data/10 --output-dir announce
//! antsibull_release send-announcements --announcements-dir announce
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod announce;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod tools;
pub mod version;

pub use config::{BuildConfig, RawBuildConfig};
pub use error::{ReleaseError, Result};
pub use pipeline::{Orchestrator, RunReport, StageKind, StepResult, StepStatus};
pub use tools::{Invocation, ProcessRunner, ToolOutput, ToolRunner};
pub use version::AnsibleVersion;
