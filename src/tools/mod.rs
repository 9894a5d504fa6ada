//! External tool invocation.
//!
//! Every shell-out in a release run goes through [`ToolRunner`]. The production
//! implementation spawns processes; tests substitute a recording runner.

pub mod archive;
pub mod git;
#[cfg(test)]
pub(crate) mod recording;

use crate::error::{EnvironmentError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// A single external command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name or path
    pub program: String,
    /// Arguments, unquoted
    pub args: Vec<String>,
    /// Working directory, inherited when `None`
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    /// Start an invocation of `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a path argument
    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `flag` only when `enabled`
    pub fn flag_if(self, enabled: bool, flag: &str) -> Self {
        if enabled { self.arg(flag) } else { self }
    }

    /// Run in `dir`
    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@+,%".contains(c))
    {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl ToolOutput {
    /// Successful output with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Whether the process exited with status 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stdout and stderr joined for display
    pub fn combined(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }

    /// The most useful text for an error report: stderr, falling back to stdout
    pub fn diagnostic(&self) -> String {
        if self.stderr.trim().is_empty() {
            self.stdout.clone()
        } else {
            self.stderr.clone()
        }
    }
}

/// Executes external tools.
///
/// Returns `Err` only when the tool could not be run at all; a tool that ran
/// and failed is reported through [`ToolOutput::code`].
#[allow(async_fn_in_trait)]
pub trait ToolRunner {
    /// Run `invocation` to completion, capturing its output
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput>;
}

/// Runs tools as child processes
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    /// Create a process runner
    pub fn new() -> Self {
        Self
    }
}

impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        let program = which::which(&invocation.program).map_err(|e| {
            EnvironmentError::ToolNotFound {
                program: invocation.program.clone(),
                reason: e.to_string(),
            }
        })?;

        log::debug!("Running `{}`", invocation);

        let mut command = tokio::process::Command::new(program);
        command.args(&invocation.args).kill_on_drop(true);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        let output = command
            .output()
            .await
            .map_err(|e| EnvironmentError::SpawnFailed {
                command: invocation.to_string(),
                reason: e.to_string(),
            })?;

        let result = ToolOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        log::debug!("`{}` finished with {:?}", invocation.program, result.code);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_display_quotes_when_needed() {
        let inv = Invocation::new("git")
            .arg("clone")
            .arg("--branch")
            .arg("main")
            .arg("https://github.com/ansible-community/ansible-build-data.git")
            .arg("/tmp/with space");
        assert_eq!(
            inv.to_string(),
            "git clone --branch main https://github.com/ansible-community/ansible-build-data.git '/tmp/with space'"
        );
    }

    #[test]
    fn test_flag_if() {
        let inv = Invocation::new("antsibull-build")
            .flag_if(true, "--build-wheel")
            .flag_if(false, "--tags-file");
        assert_eq!(inv.args, vec!["--build-wheel".to_string()]);
    }

    #[test]
    fn test_output_helpers() {
        let ok = ToolOutput::ok("done\n");
        assert!(ok.success());
        assert_eq!(ok.combined(), "done\n");

        let failed = ToolOutput {
            code: Some(2),
            stdout: "partial\n".to_string(),
            stderr: "broken\n".to_string(),
        };
        assert!(!failed.success());
        assert_eq!(failed.combined(), "partial\nbroken\n");
        assert_eq!(failed.diagnostic(), "broken\n");

        let signalled = ToolOutput {
            code: None,
            ..ToolOutput::default()
        };
        assert!(!signalled.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_exit_code() {
        let runner = ProcessRunner::new();
        let out = runner
            .run(&Invocation::new("sh").args(["-c", "echo out; echo err >&2; exit 3"]))
            .await
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_honours_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let out = ProcessRunner::new()
            .run(&Invocation::new("pwd").current_dir(dir.path()))
            .await
            .unwrap();
        assert!(out.success());
        let reported = std::path::PathBuf::from(out.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_process_runner_missing_tool() {
        let err = ProcessRunner::new()
            .run(&Invocation::new("definitely-not-an-installed-tool-4a7c"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReleaseError::Environment(EnvironmentError::ToolNotFound { .. })
        ));
    }
}
