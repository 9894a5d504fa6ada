//! `send-announcements`: deliver rendered announcements interactively.

use crate::announce::send::OpenLink;
use crate::announce::{SendAction, send_announcements};
use crate::cli::{OutputManager, SendArgs};
use crate::error::Result;
use std::collections::BTreeSet;
use std::path::Path;
use url::Url;

pub(super) fn execute_send(args: &SendArgs, output: &OutputManager) -> Result<i32> {
    let actions: BTreeSet<SendAction> = if args.actions.is_empty() {
        SendAction::ALL.into_iter().collect()
    } else {
        args.actions
            .iter()
            .map(|a| a.parse())
            .collect::<Result<_>>()?
    };
    output.verbose(&format!("Actions: {actions:?}"))?;

    send(args.announcements_dir.as_path(), &actions, args.open_browser)?;
    Ok(0)
}

/// Run every send action against `dir`
pub(super) fn send_all(dir: &Path, open_browser: bool) -> Result<()> {
    send(dir, &SendAction::ALL.into_iter().collect(), open_browser)
}

fn open_in_browser(url: &Url) -> std::io::Result<()> {
    open::that(url.as_str())
}

fn send(dir: &Path, actions: &BTreeSet<SendAction>, open_browser: bool) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let browser: Option<OpenLink<'_>> = if open_browser { Some(&open_in_browser) } else { None };
    send_announcements(dir, actions, browser, &mut stdin.lock(), &mut stdout.lock())
}
