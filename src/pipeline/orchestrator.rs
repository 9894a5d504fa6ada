//! Sequential stage execution.

use super::guard::ScratchDir;
use super::{
    Action, ByteCompilePlan, ReportPlan, RunFailure, RunReport, Stage, StageKind, Step,
    StepResult, StepStatus, plan,
};
use crate::cli::OutputManager;
use crate::config::BuildConfig;
use crate::error::{EnvironmentError, ReleaseError, Result, ToolError, ValidationError};
use crate::tools::{Invocation, ToolOutput, ToolRunner, archive};
use std::path::Path;
use std::time::Instant;

const SCRATCH_PREFIX: &str = "antsibull-bytecompile-";

/// Runs release stages in order, halting on the first failing step
pub struct Orchestrator<'a, R: ToolRunner> {
    runner: &'a R,
    output: &'a OutputManager,
}

/// What a step produced when it did not fail
#[derive(Debug)]
struct Completed {
    status: StepStatus,
    output: String,
    exit_code: Option<i32>,
}

impl Completed {
    fn ok(output: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Succeeded,
            output: output.into(),
            exit_code: None,
        }
    }
}

/// A failed step with whatever it captured
struct Failed {
    error: ReleaseError,
    output: String,
    exit_code: Option<i32>,
}

impl From<ReleaseError> for Failed {
    fn from(error: ReleaseError) -> Self {
        Self {
            output: error.captured_output().unwrap_or_default().to_string(),
            exit_code: None,
            error,
        }
    }
}

impl<'a, R: ToolRunner> Orchestrator<'a, R> {
    /// Create an orchestrator using `runner` for every external tool
    pub fn new(runner: &'a R, output: &'a OutputManager) -> Self {
        Self { runner, output }
    }

    /// Plan and execute a release run for `config`
    pub async fn run(&self, config: &BuildConfig) -> RunReport {
        let stages = plan(config);
        self.execute(&stages).await
    }

    /// Execute pre-planned stages
    pub async fn execute(&self, stages: &[Stage]) -> RunReport {
        let mut report = RunReport::default();

        for stage in stages {
            log::info!("Stage {} ({} step(s))", stage.kind, stage.steps.len());
            let _ = self.output.section(&stage.kind.to_string());

            for step in &stage.steps {
                let started = Instant::now();
                let outcome = self.execute_step(stage.kind, step, &mut report).await;
                let elapsed = started.elapsed();

                match outcome {
                    Ok(done) => {
                        self.announce(step, &done);
                        report.results.push(StepResult {
                            stage: stage.kind,
                            step: step.name.clone(),
                            status: done.status,
                            output: done.output,
                            exit_code: done.exit_code,
                            elapsed,
                        });
                    }
                    Err(failed) => {
                        self.output.error(&format!("{} failed", step.name));
                        report.results.push(StepResult {
                            stage: stage.kind,
                            step: step.name.clone(),
                            status: StepStatus::Failed,
                            output: failed.output,
                            exit_code: failed.exit_code,
                            elapsed,
                        });
                        report.failure = Some(RunFailure {
                            stage: stage.kind,
                            step: step.name.clone(),
                            error: failed.error,
                        });
                        log::info!("Run halted in stage {}", stage.kind);
                        return report;
                    }
                }
            }
        }

        report
    }

    fn announce(&self, step: &Step, done: &Completed) {
        let _ = match done.status {
            StepStatus::Succeeded => self.output.success(&step.name),
            StepStatus::Skipped => self
                .output
                .indent(&format!("{} (skipped: {})", step.name, done.output)),
            StepStatus::Warned => self.output.warn(&format!(
                "{}: failed, continuing because tags_enforce_policy is off",
                step.name
            )),
            StepStatus::Failed => Ok(()),
        };
    }

    async fn execute_step(
        &self,
        stage: StageKind,
        step: &Step,
        report: &mut RunReport,
    ) -> std::result::Result<Completed, Failed> {
        log::debug!("{} / {}", stage, step.name);
        match &step.action {
            Action::Run(invocation) => self.run_tool(invocation).await,
            Action::Skip(reason) => Ok(Completed {
                status: StepStatus::Skipped,
                output: reason.clone(),
                exit_code: None,
            }),
            Action::EnsureDir(dir) => ensure_dir(dir).await.map_err(Failed::from),
            Action::RemoveFile(path) => remove_file(path).await.map_err(Failed::from),
            Action::ValidateTags {
                invocation,
                tags_file,
                enforce,
            } => self.validate_tags(invocation, tags_file, *enforce).await,
            Action::ByteCompile(plan) => self.byte_compile(stage, plan, report).await,
            Action::Report(plan) => Ok(self.report(plan)),
        }
    }

    async fn run_tool(&self, invocation: &Invocation) -> std::result::Result<Completed, Failed> {
        let _ = self.output.progress(&invocation.to_string());
        let out = self.runner.run(invocation).await.map_err(Failed::from)?;
        check_exit(invocation, out)
    }

    async fn validate_tags(
        &self,
        invocation: &Invocation,
        tags_file: &Path,
        enforce: bool,
    ) -> std::result::Result<Completed, Failed> {
        let _ = self.output.progress(&invocation.to_string());
        let out = self.runner.run(invocation).await.map_err(Failed::from)?;
        if out.success() {
            return Ok(Completed {
                status: StepStatus::Succeeded,
                output: out.combined(),
                exit_code: out.code,
            });
        }

        if enforce {
            Err(Failed {
                error: ValidationError::TagsFile {
                    path: tags_file.to_path_buf(),
                    reason: out.diagnostic(),
                }
                .into(),
                output: out.combined(),
                exit_code: out.code,
            })
        } else {
            log::warn!(
                "Tag validation of {} failed; continuing under warn-only policy",
                tags_file.display()
            );
            Ok(Completed {
                status: StepStatus::Warned,
                output: out.combined(),
                exit_code: out.code,
            })
        }
    }

    /// Unpack the wheel into a scratch directory and compile it with every
    /// interpreter. The scratch directory is gone when this returns, whatever
    /// the outcome. Sub-steps are recorded in `report` as they finish.
    async fn byte_compile(
        &self,
        stage: StageKind,
        plan: &ByteCompilePlan,
        report: &mut RunReport,
    ) -> std::result::Result<Completed, Failed> {
        let wheel = archive::find_wheel(&plan.wheel_pattern).map_err(Failed::from)?;
        let scratch = ScratchDir::new(SCRATCH_PREFIX).map_err(Failed::from)?;

        let result = self.compile_in(stage, plan, &wheel, scratch.path(), report).await;

        match scratch.close() {
            Ok(()) => result,
            Err(e) => match result {
                // the compile failure is the more useful one to surface
                Err(failed) => {
                    log::warn!("{e}");
                    Err(failed)
                }
                Ok(_) => Err(Failed::from(e)),
            },
        }
    }

    async fn compile_in(
        &self,
        stage: StageKind,
        plan: &ByteCompilePlan,
        wheel: &Path,
        dir: &Path,
        report: &mut RunReport,
    ) -> std::result::Result<Completed, Failed> {
        let started = Instant::now();
        let files = unpack(wheel, dir).await.map_err(Failed::from)?;
        report.results.push(StepResult {
            stage,
            step: format!("Unpack {}", file_name(wheel)),
            status: StepStatus::Succeeded,
            output: format!("{files} file(s) extracted to {}", dir.display()),
            exit_code: None,
            elapsed: started.elapsed(),
        });

        let jobs = plan.jobs.to_string();
        if plan.jobs == 0 {
            log::info!("compileall -j 0 uses all {} available CPU(s)", num_cpus::get());
        }

        let mut compiled = Vec::new();
        for python in &plan.pythons {
            let started = Instant::now();
            let invocation = Invocation::new(python)
                .args(["-m", "compileall", "-q", "-j", jobs.as_str()])
                .path_arg(dir);
            let done = self.run_tool(&invocation).await?;
            report.results.push(StepResult {
                stage,
                step: format!("compileall ({python})"),
                status: done.status,
                output: done.output,
                exit_code: done.exit_code,
                elapsed: started.elapsed(),
            });
            compiled.push(python.as_str());
        }

        Ok(Completed::ok(format!(
            "{} compiled with {}",
            file_name(wheel),
            compiled.join(", ")
        )))
    }

    fn report(&self, plan: &ReportPlan) -> Completed {
        let lines = plan.lines();
        for line in &lines {
            let _ = self.output.indent(line);
        }
        Completed::ok(lines.join("\n"))
    }
}

fn check_exit(invocation: &Invocation, out: ToolOutput) -> std::result::Result<Completed, Failed> {
    if out.success() {
        Ok(Completed {
            status: StepStatus::Succeeded,
            output: out.combined(),
            exit_code: out.code,
        })
    } else {
        Err(Failed {
            error: ToolError::NonZeroExit {
                command: invocation.to_string(),
                code: out.code,
                output: out.diagnostic(),
            }
            .into(),
            output: out.combined(),
            exit_code: out.code,
        })
    }
}

/// Unpack on the blocking pool; zip extraction is synchronous file IO
async fn unpack(wheel: &Path, dir: &Path) -> Result<usize> {
    let (wheel, dir) = (wheel.to_path_buf(), dir.to_path_buf());
    let task_wheel = wheel.clone();
    tokio::task::spawn_blocking(move || archive::unpack_wheel(&task_wheel, &dir))
        .await
        .map_err(|e| EnvironmentError::Unpack {
            path: wheel,
            reason: format!("unpack task failed: {e}"),
        })?
}

async fn ensure_dir(dir: &Path) -> Result<Completed> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| EnvironmentError::Filesystem {
        action: "create".to_string(),
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(Completed::ok(dir.display().to_string()))
}

async fn remove_file(path: &Path) -> Result<Completed> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(Completed::ok(format!("removed {}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Completed {
            status: StepStatus::Skipped,
            output: format!("{} does not exist", path.display()),
            exit_code: None,
        }),
        Err(e) => Err(EnvironmentError::Filesystem {
            action: "remove".to_string(),
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
