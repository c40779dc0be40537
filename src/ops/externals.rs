//! Caching of declared externals and copying of task modules.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::core::externals::discover_externals;
use crate::core::{DependencyDeclaration, ExternalsFile};
use crate::sources::{FetchOutcome, SourceCache};
use crate::util::fs::{copy_dir_all, ensure_dir, relative_path};
use crate::util::GlobalContext;

/// Discover and parse every externals file of the project.
pub fn load_externals(ctx: &GlobalContext) -> Result<Vec<ExternalsFile>> {
    discover_externals(&ctx.extensions_src(), ctx.cwd())
        .iter()
        .map(|path| ExternalsFile::load(path))
        .collect()
}

/// All dependencies across `files`, in discovery then declaration order.
pub fn collect_dependencies(files: &[ExternalsFile]) -> Vec<DependencyDeclaration> {
    files
        .iter()
        .flat_map(|f| f.dependencies.iter().cloned())
        .collect()
}

/// Ensure every declared dependency is in the cache.
pub fn cache_externals(cache: &SourceCache, files: &[ExternalsFile]) -> Result<Vec<FetchOutcome>> {
    let decls = collect_dependencies(files);
    if decls.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!("Caching {} external dependencies", decls.len());
    let outcomes = cache.ensure_all(&decls)?;

    let fresh = outcomes.iter().filter(|o| o.fresh).count();
    tracing::info!(
        "{} dependencies ready in {} ({} fetched)",
        outcomes.len(),
        cache.cache_dir().display(),
        fresh
    );
    Ok(outcomes)
}

/// Copy the task modules named by each externals file into `_build`.
///
/// `TaskModules/<type>/<name>` lands in `<dest>/<name>`, where `dest` is
/// taken relative to the externals file's directory inside `_build`.
/// Returns the copied destinations.
pub fn copy_task_modules(ctx: &GlobalContext, files: &[ExternalsFile]) -> Result<Vec<PathBuf>> {
    let mut copied = Vec::new();

    for file in files {
        let rel_dir = relative_path(ctx.cwd(), file.dir());

        for module in &file.task_modules {
            let src = ctx.task_modules_dir().join(&module.kind).join(&module.name);
            if !src.is_dir() {
                bail!(
                    "task module `{}` not found at {} (declared in {})",
                    module.name,
                    src.display(),
                    file.path.display()
                );
            }

            let dest_dir = ctx.build_dir().join(&rel_dir).join(&module.dest);
            ensure_dir(&dest_dir)?;
            let dest = dest_dir.join(&module.name);

            tracing::debug!("Copying task module {} to {}", src.display(), dest.display());
            copy_dir_all(&src, &dest)
                .with_context(|| format!("failed to copy task module `{}`", module.name))?;
            copied.push(dest);
        }
    }

    Ok(copied)
}
