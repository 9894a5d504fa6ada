//! `build`: execute a release run.

use super::helpers::{print_config, print_suggestions, resolve_config};
use crate::cli::{BuildArgs, OutputManager};
use crate::error::Result;
use crate::pipeline::{Orchestrator, RunReport, StepStatus};
use crate::tools::ProcessRunner;
use std::time::Duration;

pub(super) async fn execute_build(args: &BuildArgs, output: &OutputManager) -> Result<i32> {
    let config = resolve_config(args)?;

    output.info(&format!("Building Ansible {}", config.version))?;
    if output.is_verbose() {
        print_config(output, &config)?;
    }

    let runner = ProcessRunner::new();
    let report = Orchestrator::new(&runner, output).run(&config).await;
    summarize(output, &report)?;
    Ok(report.exit_code())
}

fn summarize(output: &OutputManager, report: &RunReport) -> std::io::Result<()> {
    let elapsed: Duration = report.results.iter().map(|r| r.elapsed).sum();

    if let Some(failure) = &report.failure {
        output.error(&format!(
            "Release run failed in stage {} at step '{}': {}",
            failure.stage, failure.step, failure.error
        ));
        if let Some(last) = report.results.last() {
            output.captured(&last.output);
        }
        print_suggestions(output, &failure.error);
        return Ok(());
    }

    let warned = report.count(StepStatus::Warned);
    let message = format!(
        "Release run finished in {:.1}s ({} step(s), {} skipped)",
        elapsed.as_secs_f64(),
        report.results.len(),
        report.count(StepStatus::Skipped)
    );
    if warned > 0 {
        output.warn(&format!("{message} with {warned} warning(s)"))
    } else {
        output.success(&message)
    }
}
