//! Ansible community package version parsing.
//!
//! Ansible releases use PEP 440 style versions (`10.0.0a1`, `9.5.1`, `11.0.0rc1`),
//! which `semver` rejects. Only the subset the release process produces is accepted.

use crate::error::{ConfigError, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<major>\d+)\.(?P<minor>\d+)\.(?P<micro>\d+)(?:(?P<kind>a|b|rc)(?P<num>\d+))?$")
        .expect("version regex is valid")
});

/// Pre-release marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum PreRelease {
    /// `aN`
    Alpha(u64),
    /// `bN`
    Beta(u64),
    /// `rcN`
    ReleaseCandidate(u64),
}

/// A released or pre-released Ansible package version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsibleVersion {
    /// Major version (release train)
    pub major: u64,
    /// Minor version
    pub minor: u64,
    /// Micro (patch) version
    pub micro: u64,
    /// Pre-release marker, if any
    pub pre: Option<PreRelease>,
}

impl AnsibleVersion {
    /// Parse a version string
    pub fn parse(input: &str) -> Result<Self> {
        input.parse()
    }

    /// Whether this is a pre-release
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }

    /// Whether this starts a new major release train (`X.0.0`, pre-releases included)
    pub fn is_major_release(&self) -> bool {
        self.minor == 0 && self.micro == 0
    }

    /// `MAJOR.MINOR`, the form ansible-core release trains are named by
    pub fn major_minor(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl FromStr for AnsibleVersion {
    type Err = crate::error::ReleaseError;

    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = |reason: &str| ConfigError::InvalidVersion {
            version: input.to_string(),
            reason: reason.to_string(),
        };

        let caps = VERSION_RE
            .captures(trimmed)
            .ok_or_else(|| invalid("expected MAJOR.MINOR.MICRO with optional aN, bN or rcN"))?;

        let number = |name: &str| -> Result<u64> {
            caps[name]
                .parse::<u64>()
                .map_err(|e| invalid(&format!("{name} component: {e}")).into())
        };

        let pre = match caps.name("kind").map(|m| m.as_str()) {
            Some(kind) => {
                let num = number("num")?;
                Some(match kind {
                    "a" => PreRelease::Alpha(num),
                    "b" => PreRelease::Beta(num),
                    _ => PreRelease::ReleaseCandidate(num),
                })
            }
            None => None,
        };

        Ok(Self {
            major: number("major")?,
            minor: number("minor")?,
            micro: number("micro")?,
            pre,
        })
    }
}

impl fmt::Display for AnsibleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        match self.pre {
            Some(PreRelease::Alpha(n)) => write!(f, "a{n}"),
            Some(PreRelease::Beta(n)) => write!(f, "b{n}"),
            Some(PreRelease::ReleaseCandidate(n)) => write!(f, "rc{n}"),
            None => Ok(()),
        }
    }
}
