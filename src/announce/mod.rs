//! Release announcements.
//!
//! After a release is published, `announce` gathers its metadata (dependency
//! file plus PyPI), renders the forum and chat announcements into an output
//! directory and records what it wrote in `announcements.json`. The send
//! actions in [`send`] later consume that directory.

pub mod deps;
pub mod pypi;
pub mod send;

pub use deps::DepsFile;
pub use pypi::{PypiClient, SdistAndWheel, UrlInfo, verify_dists};
pub use send::{Action as SendAction, send_announcements};

use crate::error::{AnnounceError, EnvironmentError, Result};
use crate::version::AnsibleVersion;
use handlebars::{Handlebars, handlebars_helper};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Build data repository announcements link into
pub const BUILD_DATA_URL: &str = "https://github.com/ansible-community/ansible-build-data";
/// Index file written next to the announcements
pub const ANNOUNCEMENTS_JSON: &str = "announcements.json";
/// Forum announcement output file
pub const FORUM_ANNOUNCEMENT: &str = "ansible-forum-announcement.md";
/// Chat announcement output file
pub const MATRIX_ANNOUNCEMENT: &str = "ansible-matrix-announcement.md";

/// Output file name paired with its template source
const ANNOUNCEMENTS: [(&str, &str); 2] = [
    (FORUM_ANNOUNCEMENT, include_str!("templates/forum.md.hbs")),
    (MATRIX_ANNOUNCEMENT, include_str!("templates/matrix.md.hbs")),
];

handlebars_helper!(forum_heading: |content: str| {
    format!("{content}\n{}", "-".repeat(content.chars().count()))
});

/// Values available to the announcement templates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateVars {
    /// Released `ansible` version
    pub version: String,
    /// Its major version
    pub major_version: u64,
    /// `ansible-core` version it ships with
    pub core_version: String,
    /// `ansible-core` `MAJOR.MINOR`
    pub core_major_version: String,
    /// Build data directory of this release on GitHub
    pub build_data_path: String,
    /// PyPI sdist
    pub release_tarball: UrlInfo,
    /// PyPI wheel
    pub release_wheel: UrlInfo,
    /// `X.0.0` releases
    pub is_major_release: bool,
    /// Alpha, beta and release candidates
    pub is_prerelease: bool,
    /// Last release of the major version
    pub end_of_life: bool,
}

impl TemplateVars {
    /// Combine dependency data with the published dists
    pub fn new(deps: &DepsFile, dists: SdistAndWheel, end_of_life: bool) -> Result<Self> {
        let version = AnsibleVersion::parse(&deps.ansible_version)?;
        let core = AnsibleVersion::parse(&deps.ansible_core_version)?;

        Ok(Self {
            version: deps.ansible_version.clone(),
            major_version: version.major,
            core_version: deps.ansible_core_version.clone(),
            core_major_version: core.major_minor(),
            build_data_path: format!(
                "{BUILD_DATA_URL}/blob/{}/{}",
                deps.ansible_version, version.major
            ),
            release_tarball: dists.sdist,
            release_wheel: dists.wheel,
            is_major_release: version.is_major_release(),
            is_prerelease: version.is_prerelease(),
            end_of_life,
        })
    }
}

/// Contents of `announcements.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementsInfo {
    /// Variables the announcements were rendered with
    pub template_vars: TemplateVars,
    /// Names of the rendered files
    pub outputs: Vec<String>,
}

impl AnnouncementsInfo {
    /// Read `announcements.json` from `dir`
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(ANNOUNCEMENTS_JSON);
        let content = std::fs::read_to_string(&path).map_err(|e| EnvironmentError::Filesystem {
            action: "read".to_string(),
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write `announcements.json` into `dir`, returning its path
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(ANNOUNCEMENTS_JSON);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

fn registry() -> Result<Handlebars<'static>> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);
    hb.register_escape_fn(handlebars::no_escape);
    hb.register_helper("forum_heading", Box::new(forum_heading));
    for (name, source) in ANNOUNCEMENTS {
        hb.register_template_string(name, source)?;
    }
    Ok(hb)
}

/// Render every announcement into `output_dir`.
///
/// Returns the written paths followed by the `announcements.json` path.
pub fn write_announcements(vars: &TemplateVars, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let hb = registry()?;
    std::fs::create_dir_all(output_dir).map_err(|e| EnvironmentError::Filesystem {
        action: "create".to_string(),
        path: output_dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut written = Vec::new();
    for (name, _) in ANNOUNCEMENTS {
        let rendered = hb.render(name, vars)?;
        let path = output_dir.join(name);
        std::fs::write(&path, format!("{}\n", rendered.trim_end_matches('\n')))?;
        log::debug!("Rendered {}", path.display());
        written.push(path);
    }

    let info = AnnouncementsInfo {
        template_vars: vars.clone(),
        outputs: ANNOUNCEMENTS.iter().map(|(name, _)| name.to_string()).collect(),
    };
    written.push(info.write(output_dir)?);
    Ok(written)
}

/// Look up the release on PyPI, optionally verify local dists and build the
/// template variables.
pub async fn collect_template_vars(
    client: &PypiClient,
    ansible_version: &str,
    deps: &DepsFile,
    dist_dir: Option<&Path>,
    end_of_life: bool,
) -> Result<TemplateVars> {
    let release = client.release("ansible", ansible_version).await?;
    if release.version() != ansible_version {
        return Err(AnnounceError::ReleaseLookup {
            project: "ansible".to_string(),
            version: ansible_version.to_string(),
            reason: format!("PyPI returned version {}", release.version()),
        }
        .into());
    }
    let dists = release.sdist_and_wheel()?;
    if let Some(dir) = dist_dir {
        verify_dists(&dists, dir).await?;
    }
    TemplateVars::new(deps, dists, end_of_life)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::announce::pypi::tests::{local_client, payload, stub_index, url_info};
    use std::collections::BTreeMap;

    pub(crate) fn vars(version: &str) -> TemplateVars {
        let deps = DepsFile {
            ansible_version: version.to_string(),
            ansible_core_version: "2.17.1".to_string(),
            collections: BTreeMap::new(),
        };
        let dists = SdistAndWheel {
            sdist: url_info(&format!("ansible-{version}.tar.gz"), "sdist", b"s"),
            wheel: url_info(&format!("ansible-{version}-py3-none-any.whl"), "bdist_wheel", b"w"),
        };
        TemplateVars::new(&deps, dists, false).unwrap()
    }

    #[test]
    fn test_template_vars() {
        let v = vars("10.0.0rc1");
        assert_eq!(v.major_version, 10);
        assert_eq!(v.core_major_version, "2.17");
        assert_eq!(
            v.build_data_path,
            "https://github.com/ansible-community/ansible-build-data/blob/10.0.0rc1/10"
        );
        assert!(v.is_major_release);
        assert!(v.is_prerelease);

        let v = vars("10.1.0");
        assert!(!v.is_major_release);
        assert!(!v.is_prerelease);
    }

    #[test]
    fn test_forum_heading() {
        let mut hb = Handlebars::new();
        hb.register_escape_fn(handlebars::no_escape);
        hb.register_helper("forum_heading", Box::new(forum_heading));
        let out = hb
            .render_template("{{forum_heading \"What's new\"}}", &serde_json::json!({}))
            .unwrap();
        assert_eq!(out, "What's new\n----------");
    }

    #[test]
    fn test_write_announcements() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("announce");
        let v = vars("10.1.0");

        let written = write_announcements(&v, &out_dir).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written[2].ends_with(ANNOUNCEMENTS_JSON));

        let forum = std::fs::read_to_string(out_dir.join(FORUM_ANNOUNCEMENT)).unwrap();
        assert!(forum.contains("Ansible 10.1.0 package"));
        assert!(forum.contains(&v.release_wheel.digests.sha256));
        assert!(forum.contains("How to get it\n-------------"));
        assert!(!forum.contains("pre-release"));
        assert!(forum.ends_with("Working Group\n"));

        let matrix = std::fs::read_to_string(out_dir.join(MATRIX_ANNOUNCEMENT)).unwrap();
        assert!(matrix.contains("<FORUM LINK>"));
        assert!(matrix.ends_with(">\n") && !matrix.ends_with("\n\n"));

        let info = AnnouncementsInfo::load(&out_dir).unwrap();
        assert_eq!(info.template_vars, v);
        assert_eq!(info.outputs, vec![FORUM_ANNOUNCEMENT, MATRIX_ANNOUNCEMENT]);
    }

    #[test]
    fn test_prerelease_wording() {
        let dir = tempfile::tempdir().unwrap();
        write_announcements(&vars("11.0.0b2"), dir.path()).unwrap();
        let forum = std::fs::read_to_string(dir.path().join(FORUM_ANNOUNCEMENT)).unwrap();
        assert!(forum.contains("This is a pre-release of Ansible 11."));
        assert!(forum.contains("new major release"));
    }

    #[test]
    fn test_load_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        assert!(AnnouncementsInfo::load(dir.path()).is_err());
    }

    fn deps(version: &str) -> DepsFile {
        DepsFile {
            ansible_version: version.to_string(),
            ansible_core_version: "2.17.1".to_string(),
            collections: BTreeMap::new(),
        }
    }

    fn published(version: &str) -> Vec<UrlInfo> {
        vec![
            url_info(&format!("ansible-{version}.tar.gz"), "sdist", b"sdist bytes"),
            url_info(
                &format!("ansible-{version}-py3-none-any.whl"),
                "bdist_wheel",
                b"wheel bytes",
            ),
        ]
    }

    #[tokio::test]
    async fn test_collect_template_vars_from_index() {
        let body = payload("10.1.0", &published("10.1.0"));
        let base = stub_index("/ansible/10.1.0/json".to_string(), body).await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ansible-10.1.0.tar.gz"), b"sdist bytes").unwrap();
        std::fs::write(dir.path().join("ansible-10.1.0-py3-none-any.whl"), b"wheel bytes").unwrap();

        let v = collect_template_vars(
            &local_client(&base),
            "10.1.0",
            &deps("10.1.0"),
            Some(dir.path()),
            true,
        )
        .await
        .unwrap();

        assert_eq!(v.version, "10.1.0");
        assert_eq!(v.release_tarball.filename, "ansible-10.1.0.tar.gz");
        assert!(v.end_of_life);
    }

    #[tokio::test]
    async fn test_collect_template_vars_unknown_release() {
        let base = stub_index("/ansible/10.1.0/json".to_string(), String::new()).await;

        let err = collect_template_vars(&local_client(&base), "10.2.0", &deps("10.2.0"), None, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ReleaseError::Announce(AnnounceError::ReleaseLookup { .. })
        ));
    }

    #[tokio::test]
    async fn test_collect_template_vars_rejects_other_version() {
        let body = payload("10.1.1", &published("10.1.1"));
        let base = stub_index("/ansible/10.1.0/json".to_string(), body).await;

        let err = collect_template_vars(&local_client(&base), "10.1.0", &deps("10.1.0"), None, false)
            .await
            .unwrap_err();
        match err {
            crate::error::ReleaseError::Announce(AnnounceError::ReleaseLookup { reason, .. }) => {
                assert_eq!(reason, "PyPI returned version 10.1.1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
