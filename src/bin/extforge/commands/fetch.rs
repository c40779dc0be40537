//! `extforge fetch` command
//!
//! Populates the dependency cache from every externals file without
//! building anything.

use std::sync::Arc;

use anyhow::Result;

use crate::cli::FetchArgs;
use crate::commands::source_cache;
use crate::GlobalOptions;
use extforge::ops::{collect_dependencies, load_externals};
use extforge::util::process::SystemRunner;
use extforge::util::Status;

pub fn execute(args: FetchArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;

    let files = load_externals(&global_opts.ctx)?;
    let decls = collect_dependencies(&files);
    if decls.is_empty() {
        shell.note("No external dependencies declared");
        return Ok(());
    }

    let cache = source_cache(global_opts, Arc::new(SystemRunner), args.offline, args.jobs)?;
    let span = shell.span(
        Status::Fetching,
        format!("{} dependencies into {}", decls.len(), cache.cache_dir().display()),
    );

    let spinner = shell.spinner("Fetching dependencies");
    let outcomes = cache.ensure_all(&decls);
    spinner.finish();
    let outcomes = outcomes?;

    for outcome in &outcomes {
        let status = if outcome.fresh {
            Status::Created
        } else {
            Status::Cached
        };
        shell.status(status, &outcome.key);
    }
    span.finish_with_message(format!("{} dependencies", outcomes.len()));

    Ok(())
}
