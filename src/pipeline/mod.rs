//! Release build pipeline.
//!
//! A run is a fixed sequence of stages (setup, build, test, report), each an
//! ordered list of steps. [`plan`] turns a [`BuildConfig`](crate::config::BuildConfig)
//! into that sequence; the [`Orchestrator`] executes it one step at a time and
//! stops at the first failure.

mod guard;
mod orchestrator;
mod plan;

pub use guard::ScratchDir;
pub use orchestrator::Orchestrator;
pub use plan::plan;

use crate::error::ReleaseError;
use crate::tools::Invocation;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Named phase of a release run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageKind {
    /// Build data checkout and output directories
    Setup,
    /// prepare + rebuild-single
    Build,
    /// Tag validation and byte-compilation
    Test,
    /// Artifact summary
    Report,
}

impl StageKind {
    /// All stages in execution order
    pub const ALL: [StageKind; 4] = [
        StageKind::Setup,
        StageKind::Build,
        StageKind::Test,
        StageKind::Report,
    ];
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Setup => write!(f, "Setup"),
            StageKind::Build => write!(f, "Build"),
            StageKind::Test => write!(f, "Test"),
            StageKind::Report => write!(f, "Report"),
        }
    }
}

/// What a step does
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Run an external tool; non-zero exit fails the step
    Run(Invocation),
    /// Nothing to do; recorded as skipped with the reason
    Skip(String),
    /// Create a directory and its parents
    EnsureDir(PathBuf),
    /// Delete a file if it exists
    RemoveFile(PathBuf),
    /// Run the tags validator; failure is fatal only when `enforce` is set
    ValidateTags {
        /// Validator command line
        invocation: Invocation,
        /// Tags file being validated
        tags_file: PathBuf,
        /// Fail the run on validation errors
        enforce: bool,
    },
    /// Unpack the wheel into a scratch directory and byte-compile it
    ByteCompile(ByteCompilePlan),
    /// Print where the build wrote its artifacts
    Report(ReportPlan),
}

impl Action {
    /// One line per effect, for dry runs
    pub fn describe(&self) -> Vec<String> {
        match self {
            Action::Run(invocation) => vec![format!("$ {invocation}")],
            Action::Skip(reason) => vec![format!("skip: {reason}")],
            Action::EnsureDir(dir) => vec![format!("mkdir -p {}", dir.display())],
            Action::RemoveFile(path) => vec![format!("rm -f {}", path.display())],
            Action::ValidateTags {
                invocation,
                enforce,
                ..
            } => vec![format!(
                "$ {invocation}  [{}]",
                if *enforce { "fail on error" } else { "warn on error" }
            )],
            Action::ByteCompile(plan) => std::iter::once(format!(
                "unpack {} into <scratch>",
                plan.wheel_pattern
            ))
            .chain(plan.pythons.iter().map(|python| {
                format!("$ {python} -m compileall -q -j {} <scratch>", plan.jobs)
            }))
            .chain(std::iter::once("remove <scratch>".to_string()))
            .collect(),
            Action::Report(plan) => plan.lines(),
        }
    }
}

/// Parameters for the byte-compilation check
#[derive(Debug, Clone, PartialEq)]
pub struct ByteCompilePlan {
    /// Glob locating the wheel
    pub wheel_pattern: String,
    /// Interpreters to compile with, in order
    pub pythons: Vec<String>,
    /// `compileall -j` value, passed through verbatim
    pub jobs: usize,
}

/// Artifact locations for the final summary
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPlan {
    /// Version that was built
    pub version: String,
    /// Changelog location
    pub changelog: PathBuf,
    /// Porting guide location
    pub porting_guide: PathBuf,
    /// Source distribution location
    pub sdist: PathBuf,
    /// Wheel location, when one was built
    pub wheel: Option<PathBuf>,
}

impl ReportPlan {
    /// Human-readable summary lines
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Ansible {} built", self.version),
            format!("Changelog: {}", self.changelog.display()),
            format!("Porting guide: {}", self.porting_guide.display()),
            format!("Source distribution: {}", self.sdist.display()),
        ];
        if let Some(wheel) = &self.wheel {
            lines.push(format!("Wheel: {}", wheel.display()));
        }
        lines
    }
}

/// One unit of work inside a stage
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Short description shown to the operator
    pub name: String,
    /// The work itself
    pub action: Action,
}

impl Step {
    /// Create a step
    pub fn new(name: impl Into<String>, action: Action) -> Self {
        Self {
            name: name.into(),
            action,
        }
    }
}

/// A named phase and its steps
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Which phase this is
    pub kind: StageKind,
    /// Steps in execution order
    pub steps: Vec<Step>,
}

/// Outcome classification of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Completed successfully
    Succeeded,
    /// Failed, but the configured policy lets the run continue
    Warned,
    /// Not needed
    Skipped,
    /// Failed; the run halts
    Failed,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Succeeded => write!(f, "ok"),
            StepStatus::Warned => write!(f, "warning"),
            StepStatus::Skipped => write!(f, "skipped"),
            StepStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one executed step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Stage the step belongs to
    pub stage: StageKind,
    /// Step name
    pub step: String,
    /// Outcome
    pub status: StepStatus,
    /// Captured tool output or action summary
    pub output: String,
    /// Process exit code when a tool ran
    pub exit_code: Option<i32>,
    /// Wall time spent
    pub elapsed: Duration,
}

/// Why a run halted
#[derive(Debug)]
pub struct RunFailure {
    /// Stage containing the failing step
    pub stage: StageKind,
    /// Name of the failing step
    pub step: String,
    /// The error
    pub error: ReleaseError,
}

/// Everything a run produced
#[derive(Debug, Default)]
pub struct RunReport {
    /// Step results in execution order, including the failing one
    pub results: Vec<StepResult>,
    /// Set when the run halted
    pub failure: Option<RunFailure>,
}

impl RunReport {
    /// Whether every step succeeded (warnings and skips included)
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    /// Results belonging to `stage`
    pub fn stage_results(&self, stage: StageKind) -> impl Iterator<Item = &StepResult> {
        self.results.iter().filter(move |r| r.stage == stage)
    }

    /// Whether any step of `stage` executed
    pub fn ran_stage(&self, stage: StageKind) -> bool {
        self.stage_results(stage).next().is_some()
    }

    /// Number of results with `status`
    pub fn count(&self, status: StepStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(stage: StageKind, status: StepStatus) -> StepResult {
        StepResult {
            stage,
            step: "x".to_string(),
            status,
            output: String::new(),
            exit_code: None,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn test_report_success_and_counts() {
        let report = RunReport {
            results: vec![
                result(StageKind::Setup, StepStatus::Skipped),
                result(StageKind::Test, StepStatus::Warned),
            ],
            failure: None,
        };
        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
        assert!(report.ran_stage(StageKind::Setup));
        assert!(!report.ran_stage(StageKind::Build));
        assert_eq!(report.count(StepStatus::Warned), 1);
    }

    #[test]
    fn test_report_failure_exit_code() {
        let report = RunReport {
            results: vec![],
            failure: Some(RunFailure {
                stage: StageKind::Build,
                step: "rebuild".to_string(),
                error: std::io::Error::other("x").into(),
            }),
        };
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_stage_order() {
        let mut sorted = StageKind::ALL;
        sorted.sort();
        assert_eq!(sorted, StageKind::ALL);
    }

    #[test]
    fn test_describe_byte_compile() {
        let action = Action::ByteCompile(ByteCompilePlan {
            wheel_pattern: "build/ansible-10.1.0-*.whl".to_string(),
            pythons: vec!["python3.11".to_string(), "python3.12".to_string()],
            jobs: 0,
        });
        let lines = action.describe();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "$ python3.11 -m compileall -q -j 0 <scratch>");
        assert_eq!(lines[3], "remove <scratch>");
    }

    #[test]
    fn test_report_lines() {
        let plan = ReportPlan {
            version: "10.1.0".to_string(),
            changelog: PathBuf::from("abd/10/CHANGELOG-v10.md"),
            porting_guide: PathBuf::from("abd/10/porting_guide_10.rst"),
            sdist: PathBuf::from("build/ansible-10.1.0.tar.gz"),
            wheel: None,
        };
        let lines = plan.lines();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].ends_with("CHANGELOG-v10.md"));
        assert!(lines[2].ends_with("porting_guide_10.rst"));
    }
}
