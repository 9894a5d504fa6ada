//! Interactive delivery of rendered announcements.

use super::{AnnouncementsInfo, FORUM_ANNOUNCEMENT, MATRIX_ANNOUNCEMENT};
use crate::error::{AnnounceError, EnvironmentError, ReleaseError, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::Path;
use std::str::FromStr;
use url::Url;

/// Ansible community forum
pub const FORUM_URL: &str = "https://forum.ansible.com";
const FORUM_CATEGORY: &str = "news/releases";
const FORUM_TAGS: [&str; 3] = ["release", "distro-packaging", "release-management"];
const FORUM_LINK_PLACEHOLDER: &str = "<FORUM LINK>";
const MATRIX_ROOMS: [&str; 3] = [
    "#community:ansible.com",
    "#packaging:ansible.com",
    "#social:ansible.com (mention @newsbot)",
];

/// Opens a link in the operator's browser
pub type OpenLink<'a> = &'a dyn Fn(&Url) -> std::io::Result<()>;

/// A way of sending the announcements
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    /// Pre-filled forum topic
    Forum,
    /// Chat message referencing the forum post
    Matrix,
}

impl Action {
    /// Every action, in the order they are performed.
    ///
    /// The chat message links to the forum post, so the forum comes first.
    pub const ALL: [Action; 2] = [Action::Forum, Action::Matrix];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Forum => write!(f, "forum"),
            Action::Matrix => write!(f, "matrix"),
        }
    }
}

impl FromStr for Action {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forum" => Ok(Action::Forum),
            "matrix" => Ok(Action::Matrix),
            other => Err(AnnounceError::UnknownAction {
                action: other.to_string(),
            }
            .into()),
        }
    }
}

/// Forum topic title for the release
pub fn subject(info: &AnnouncementsInfo) -> String {
    let vars = &info.template_vars;
    let base = format!("Release announcement: Ansible community package {}", vars.version);
    if vars.is_prerelease {
        format!("{base} (Pre-Release)")
    } else {
        base
    }
}

/// New-topic URL pre-filled with category, tags, title and body
pub fn forum_url(info: &AnnouncementsInfo, body: &str) -> Result<Url> {
    let mut url = Url::parse(FORUM_URL)
        .and_then(|base| base.join("new-topic"))
        .map_err(|e| ReleaseError::Io(std::io::Error::other(e)))?;
    url.query_pairs_mut()
        .append_pair("category", FORUM_CATEGORY)
        .append_pair("tags", &FORUM_TAGS.join(","))
        .append_pair("title", &subject(info))
        .append_pair("body", body);
    Ok(url)
}

fn read_body(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    std::fs::read_to_string(&path).map_err(|e| {
        EnvironmentError::Filesystem {
            action: "read".to_string(),
            path,
            reason: e.to_string(),
        }
        .into()
    })
}

fn send_forum<W: Write>(
    dir: &Path,
    info: &AnnouncementsInfo,
    browser: Option<OpenLink<'_>>,
    out: &mut W,
) -> Result<()> {
    let body = read_body(dir, FORUM_ANNOUNCEMENT)?;
    let url = forum_url(info, &body)?;
    if let Some(open) = browser {
        match open(&url) {
            Ok(()) => {
                writeln!(out, "Opened the pre-filled forum post in your browser")?;
                return Ok(());
            }
            Err(e) => log::warn!("Could not open a browser: {e}"),
        }
    }
    writeln!(out, "Open this link to create the forum post:")?;
    writeln!(out, "{url}")?;
    Ok(())
}

fn send_matrix<R: BufRead, W: Write>(dir: &Path, input: &mut R, out: &mut W) -> Result<()> {
    let body = read_body(dir, MATRIX_ANNOUNCEMENT)?;

    write!(out, "Enter the URL to the forum post: ")?;
    out.flush()?;
    let mut forum_link = String::new();
    if input.read_line(&mut forum_link)? == 0 {
        writeln!(out)?;
        writeln!(out, "Continuing...")?;
        return Ok(());
    }

    let body = body.replace(FORUM_LINK_PLACEHOLDER, forum_link.trim());
    writeln!(out)?;
    writeln!(out, "Please open your Matrix client and send the message to:")?;
    for room in MATRIX_ROOMS {
        writeln!(out, "- {room}")?;
    }
    writeln!(out, "---")?;
    write!(out, "{body}")?;
    Ok(())
}

/// Perform `actions` for the announcements in `dir`.
///
/// Actions always run in [`Action::ALL`] order regardless of how they were
/// requested. With a `browser` the forum link is opened instead of printed,
/// falling back to printing when that fails. Prompts read from `input`;
/// everything else goes to `out`.
pub fn send_announcements<R: BufRead, W: Write>(
    dir: &Path,
    actions: &BTreeSet<Action>,
    browser: Option<OpenLink<'_>>,
    input: &mut R,
    out: &mut W,
) -> Result<()> {
    let info = AnnouncementsInfo::load(dir)?;
    for action in Action::ALL.into_iter().filter(|a| actions.contains(a)) {
        log::info!("Sending {action} announcement for {}", info.template_vars.version);
        writeln!(out, "Handling {action}...")?;
        match action {
            Action::Forum => send_forum(dir, &info, browser, out)?,
            Action::Matrix => send_matrix(dir, input, out)?,
        }
    }
    Ok(())
}
