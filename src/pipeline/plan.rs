//! Translate a resolved configuration into stages.

use super::{Action, ByteCompilePlan, ReportPlan, Stage, StageKind, Step};
use crate::config::BuildConfig;
use crate::tools::{Invocation, git};

/// Build the ordered stage list for `config`.
///
/// Inspects the filesystem only to decide whether the data checkout already
/// exists; nothing is modified.
pub fn plan(config: &BuildConfig) -> Vec<Stage> {
    vec![
        Stage {
            kind: StageKind::Setup,
            steps: setup_steps(config),
        },
        Stage {
            kind: StageKind::Build,
            steps: build_steps(config),
        },
        Stage {
            kind: StageKind::Test,
            steps: test_steps(config),
        },
        Stage {
            kind: StageKind::Report,
            steps: vec![Step::new(
                "Summarize artifacts",
                Action::Report(ReportPlan {
                    version: config.version.to_string(),
                    changelog: config.changelog_file.clone(),
                    porting_guide: config.porting_guide_file.clone(),
                    sdist: config.sdist_path(),
                    wheel: config.bytecompile.then(|| config.wheel_path()),
                }),
            )],
        },
    ]
}

fn setup_steps(config: &BuildConfig) -> Vec<Step> {
    let mut steps = Vec::new();
    let repo = &config.data_repo_dir;

    if !git::is_checkout(repo) {
        if let Some(parent) = repo.parent() {
            steps.push(Step::new(
                "Create checkout parent directory",
                Action::EnsureDir(parent.to_path_buf()),
            ));
        }
        steps.push(Step::new(
            format!("Clone build data ({})", config.data_repo_ref),
            Action::Run(git::clone(&config.data_repo_url, &config.data_repo_ref, repo)),
        ));
    } else if config.data_reset {
        steps.push(Step::new(
            format!("Fetch build data ({})", config.data_repo_ref),
            Action::Run(git::fetch(repo, &config.data_repo_ref)),
        ));
        steps.push(Step::new(
            "Reset build data checkout",
            Action::Run(git::reset_to_fetched(repo)),
        ));
    } else {
        steps.push(Step::new(
            "Update build data",
            Action::Skip(format!(
                "existing checkout at {} kept (data_reset is off)",
                repo.display()
            )),
        ));
    }

    steps.push(Step::new(
        "Create sdist directory",
        Action::EnsureDir(config.sdist_dir.clone()),
    ));

    if !config.preserve_deps && !config.skip_prepare {
        steps.push(Step::new(
            "Remove existing dependency file",
            Action::RemoveFile(config.deps_path()),
        ));
    }

    steps
}

fn build_steps(config: &BuildConfig) -> Vec<Step> {
    let mut steps = Vec::new();
    let version = config.version.to_string();

    if config.skip_prepare {
        steps.push(Step::new(
            "Prepare release",
            Action::Skip(format!(
                "skip_prepare is set; reusing {}",
                config.deps_path().display()
            )),
        ));
    } else {
        let prepare = Invocation::new(&config.build_command)
            .args(["prepare", version.as_str(), "--data-dir"])
            .path_arg(&config.data_dir)
            .args(["--build-file", config.build_file.as_str()])
            .args(["--deps-file", config.deps_file.as_str()]);
        let prepare = with_tags_file(prepare, config);
        steps.push(Step::new("Prepare release", Action::Run(prepare)));
    }

    if config.force_rebuild {
        steps.push(Step::new(
            "Remove previous source distribution",
            Action::RemoveFile(config.sdist_path()),
        ));
        steps.push(Step::new(
            "Remove previous wheel",
            Action::RemoveFile(config.wheel_path()),
        ));
    }

    let rebuild = Invocation::new(&config.build_command)
        .args(["rebuild-single", version.as_str(), "--data-dir"])
        .path_arg(&config.data_dir)
        .arg("--sdist-dir")
        .path_arg(&config.sdist_dir)
        .args(["--build-file", config.build_file.as_str()])
        .args(["--deps-file", config.deps_file.as_str()]);
    let rebuild = with_tags_file(rebuild, config).flag_if(config.bytecompile, "--build-wheel");
    steps.push(Step::new("Build release", Action::Run(rebuild)));

    steps
}

fn with_tags_file(invocation: Invocation, config: &BuildConfig) -> Invocation {
    if config.tags_validate {
        invocation.args(["--tags-file", config.tags_file.as_str()])
    } else {
        invocation
    }
}

fn test_steps(config: &BuildConfig) -> Vec<Step> {
    let mut steps = Vec::new();

    if config.tags_validate {
        let tags_file = config.tags_path();
        steps.push(Step::new(
            "Validate tags file",
            Action::ValidateTags {
                invocation: Invocation::new(&config.build_command)
                    .arg("validate-tags-file")
                    .path_arg(&tags_file),
                tags_file,
                enforce: config.tags_enforce_policy,
            },
        ));
    }

    if config.bytecompile {
        steps.push(Step::new(
            "Byte-compile wheel",
            Action::ByteCompile(ByteCompilePlan {
                wheel_pattern: config.wheel_pattern(),
                pythons: config.bytecompile_pythons.clone(),
                jobs: config.bytecompile_jobs,
            }),
        ));
    }

    if steps.is_empty() {
        steps.push(Step::new(
            "Test release",
            Action::Skip("tag validation and byte-compilation are disabled".to_string()),
        ));
    }

    steps
}
