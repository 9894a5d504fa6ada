//! PyPI JSON API client and local dist verification.

use crate::error::{AnnounceError, ReleaseError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Production PyPI JSON endpoint
pub const PYPI_JSON_URL: &str = "https://pypi.org/pypi";

/// Digests PyPI publishes for a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digests {
    /// Hex SHA-256
    pub sha256: String,
    /// Hex BLAKE2b-256
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blake2b_256: Option<String>,
}

/// One downloadable file of a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlInfo {
    /// File name, e.g. `ansible-10.1.0.tar.gz`
    pub filename: String,
    /// Download URL
    pub url: String,
    /// `sdist` or `bdist_wheel`
    pub packagetype: String,
    /// File digests
    pub digests: Digests,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    /// Upload timestamp as reported by PyPI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_time_iso_8601: Option<String>,
}

impl UrlInfo {
    /// Whether the file at `path` has this dist's SHA-256 digest.
    ///
    /// Hashing runs on the blocking pool.
    pub async fn verify_local_file(&self, path: &Path) -> Result<bool> {
        use sha2::Digest as _;

        let data = tokio::fs::read(path).await?;
        let expected = self.digests.sha256.clone();
        tokio::task::spawn_blocking(move || {
            let actual = hex::encode(sha2::Sha256::digest(&data));
            actual.eq_ignore_ascii_case(&expected)
        })
        .await
        .map_err(|e| ReleaseError::Io(std::io::Error::other(e)))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ReleaseInfo {
    version: String,
}

/// A release as returned by `/pypi/<project>/<version>/json`
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    info: ReleaseInfo,
    /// Files belonging to the release
    pub urls: Vec<UrlInfo>,
}

/// The sdist and wheel of one release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdistAndWheel {
    /// Source distribution
    pub sdist: UrlInfo,
    /// Wheel
    pub wheel: UrlInfo,
}

impl SdistAndWheel {
    /// Both dists, sdist first
    pub fn iter(&self) -> impl Iterator<Item = &UrlInfo> {
        [&self.sdist, &self.wheel].into_iter()
    }
}

impl Release {
    /// Version reported by PyPI
    pub fn version(&self) -> &str {
        &self.info.version
    }

    /// Select the only sdist and the only wheel
    pub fn sdist_and_wheel(&self) -> Result<SdistAndWheel> {
        let of_type = |kind: &str| {
            self.urls
                .iter()
                .filter(|u| u.packagetype == kind)
                .collect::<Vec<_>>()
        };
        let sdists = of_type("sdist");
        let wheels = of_type("bdist_wheel");

        match (sdists.as_slice(), wheels.as_slice()) {
            ([sdist], [wheel]) => Ok(SdistAndWheel {
                sdist: (*sdist).clone(),
                wheel: (*wheel).clone(),
            }),
            _ => Err(AnnounceError::DistSelection {
                version: self.info.version.clone(),
                sdists: sdists.len(),
                wheels: wheels.len(),
            }
            .into()),
        }
    }
}

/// Thin client for the PyPI JSON API
#[derive(Debug, Clone)]
pub struct PypiClient {
    http: reqwest::Client,
    base_url: String,
}

impl PypiClient {
    /// Client for pypi.org
    pub fn new() -> Result<Self> {
        Self::with_base_url(PYPI_JSON_URL)
    }

    /// Client for a PyPI-compatible index at `base_url`
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch release metadata for `project==version`
    pub async fn release(&self, project: &str, version: &str) -> Result<Release> {
        let url = format!("{}/{project}/{version}/json", self.base_url);
        log::info!("Fetching {url}");

        let lookup_err = |reason: String| AnnounceError::ReleaseLookup {
            project: project.to_string(),
            version: version.to_string(),
            reason,
        };

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| lookup_err(e.to_string()))?;

        response
            .json::<Release>()
            .await
            .map_err(|e| lookup_err(e.to_string()).into())
    }
}

/// Check that every dist exists in `dist_dir` and matches PyPI's digest.
///
/// Stops at the first problem.
pub async fn verify_dists(dists: &SdistAndWheel, dist_dir: &Path) -> Result<()> {
    for dist in dists.iter() {
        let path = dist_dir.join(&dist.filename);
        if !tokio::fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Err(AnnounceError::DistMissing {
                filename: dist.filename.clone(),
            }
            .into());
        }
        if !dist.verify_local_file(&path).await? {
            return Err(AnnounceError::DistMismatch {
                path,
                url: dist.url.clone(),
            }
            .into());
        }
        log::debug!("{} matches PyPI", dist.filename);
    }
    Ok(())
}
