//! `plan`: show what `build` would do.

use super::helpers::{print_config, resolve_config};
use crate::cli::{BuildArgs, OutputManager};
use crate::error::Result;
use crate::pipeline;

pub(super) fn execute_plan(args: &BuildArgs, output: &OutputManager) -> Result<i32> {
    let config = resolve_config(args)?;

    output.section("Configuration")?;
    print_config(output, &config)?;

    for stage in pipeline::plan(&config) {
        output.section(&stage.kind.to_string())?;
        for step in &stage.steps {
            output.println(&step.name)?;
            for line in step.action.describe() {
                output.indent(&line)?;
            }
        }
    }
    Ok(0)
}
