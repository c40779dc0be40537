//! `extforge build` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::BuildArgs;
use crate::commands::source_cache;
use crate::GlobalOptions;
use extforge::ops::{build, parse_area_filter, BuildOptions, BuildTools, TscCompiler};
use extforge::util::process::{CommandRunner, SystemRunner};
use extforge::util::Status;

pub fn execute(args: BuildArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let config = &global_opts.config;

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let cache = source_cache(global_opts, Arc::clone(&runner), args.offline, args.jobs)?;
    let compiler = TscCompiler::new(config.tsc(), Arc::clone(&runner));

    let options = BuildOptions {
        areas: args.test_area_path.as_deref().map(parse_area_filter),
    };
    let tools = BuildTools {
        cache: &cache,
        compiler: &compiler,
        runner: runner.as_ref(),
        npm: config.npm(),
    };

    let span = shell.span(Status::Compiling, global_opts.ctx.cwd().display());
    let summary = build(&global_opts.ctx, &tools, &options)?;

    if summary.dependencies > 0 {
        shell.status(
            Status::Cached,
            format!(
                "{} dependencies ({} fetched)",
                summary.dependencies, summary.fetched
            ),
        );
    }
    if summary.loc_files > 0 {
        shell.status(
            Status::Generated,
            format!("{} localization files", summary.loc_files),
        );
    }
    span.finish_with_message(format!(
        "build of {} task sources and {} UI projects",
        summary.task_sources, summary.ui_projects
    ));

    Ok(())
}
