//! `announce`: render release announcements.

use super::send::send_all;
use crate::announce::{self, DepsFile, PypiClient};
use crate::cli::{AnnounceArgs, OutputManager};
use crate::error::Result;

pub(super) async fn execute_announce(args: &AnnounceArgs, output: &OutputManager) -> Result<i32> {
    let deps_path = args.data_dir.join(args.deps_file_name());
    let deps = DepsFile::parse(&deps_path)?;
    output.verbose(&format!(
        "{}: ansible {} / ansible-core {}",
        deps_path.display(),
        deps.ansible_version,
        deps.ansible_core_version
    ))?;

    let client = PypiClient::with_base_url(&args.pypi_url)?;
    output.progress(&format!("Looking up ansible {} on PyPI", args.ansible_version))?;
    let vars = announce::collect_template_vars(
        &client,
        &args.ansible_version,
        &deps,
        args.dist_dir.as_deref(),
        args.end_of_life,
    )
    .await?;
    if args.dist_dir.is_some() {
        output.success("Local dists match PyPI")?;
    }

    for path in announce::write_announcements(&vars, &args.output_dir)? {
        output.println(&format!("Wrote: {}", path.display()))?;
    }

    if args.send {
        send_all(&args.output_dir, args.open_browser)?;
    }
    Ok(0)
}
