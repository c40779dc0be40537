//! Implementation of `extforge clean`.

use std::path::PathBuf;

use anyhow::Result;

use crate::util::fs::remove_dir_all_if_exists;
use crate::util::GlobalContext;

/// Remove the build, package and NuGet output directories.
///
/// Returns the directories that existed and were removed. The dependency
/// cache is left alone.
pub fn clean(ctx: &GlobalContext) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();

    for dir in [ctx.build_dir(), ctx.package_dir(), ctx.nuget_dir()] {
        if dir.exists() {
            tracing::debug!("Removing {}", dir.display());
            remove_dir_all_if_exists(&dir)?;
            removed.push(dir);
        }
    }

    Ok(removed)
}
