//! Command execution.
//!
//! Each subcommand returns its exit code; errors are reported here with
//! recovery suggestions and turned into exit code 1.

mod announce;
mod build;
mod helpers;
mod plan;
mod send;

use crate::cli::{Args, Command, OutputManager};
use crate::error::Result;

use announce::execute_announce;
use build::execute_build;
use plan::execute_plan;
use send::execute_send;

/// Execute the parsed command line
pub async fn execute_command(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.verbose, args.quiet);

    let result = match &args.command {
        Command::Build(build) => execute_build(build, &output).await,
        Command::Plan(build) => execute_plan(build, &output),
        Command::Announce(announce) => execute_announce(announce, &output).await,
        Command::SendAnnouncements(send) => execute_send(send, &output),
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            output.error(&format!("Command '{}' failed: {e}", args.command.name()));
            helpers::print_suggestions(&output, &e);
            Ok(1)
        }
    }
}
