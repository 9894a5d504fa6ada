//! Command line interface for antsibull_release.
//!
//! Parses arguments, dispatches to the subcommand executors and renders
//! progress with [`OutputManager`].

mod args;
pub mod commands;
mod output;

pub use args::{AnnounceArgs, Args, BuildArgs, Command, SendArgs};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
