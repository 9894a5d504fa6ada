//! Parser for antsibull `.deps` files.
//!
//! A dependency file pins the exact versions that went into a release:
//!
//! ```text
//! _ansible_version: 10.1.0
//! _ansible_core_version: 2.17.1
//! _python: >=3.10
//! amazon.aws: 8.0.1
//! ansible.netcommon: 7.0.0
//! ```

use crate::error::{AnnounceError, Result};
use std::collections::BTreeMap;
use std::path::Path;

const ANSIBLE_VERSION_KEY: &str = "_ansible_version";
const CORE_VERSION_KEY: &str = "_ansible_core_version";

/// Parsed dependency file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepsFile {
    /// Version of the `ansible` package
    pub ansible_version: String,
    /// Version of `ansible-core` it depends on
    pub ansible_core_version: String,
    /// Collection name to pinned version
    pub collections: BTreeMap<String, String>,
}

impl DepsFile {
    /// Read and parse the file at `path`
    pub fn parse(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| AnnounceError::InvalidDepsFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse_str(&content).map_err(|reason| {
            AnnounceError::InvalidDepsFile {
                path: path.to_path_buf(),
                reason,
            }
            .into()
        })
    }

    fn parse_str(content: &str) -> std::result::Result<Self, String> {
        let mut ansible_version = None;
        let mut core_version = None;
        let mut collections = BTreeMap::new();

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                return Err(format!("line {}: expected `name: version`", lineno + 1));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                ANSIBLE_VERSION_KEY => ansible_version = Some(value.to_string()),
                CORE_VERSION_KEY => core_version = Some(value.to_string()),
                // other metadata such as `_python`
                k if k.starts_with('_') => {}
                k => {
                    collections.insert(k.to_string(), value.to_string());
                }
            }
        }

        Ok(Self {
            ansible_version: ansible_version.ok_or_else(|| format!("missing {ANSIBLE_VERSION_KEY}"))?,
            ansible_core_version: core_version.ok_or_else(|| format!("missing {CORE_VERSION_KEY}"))?,
            collections,
        })
    }
}
