//! Command implementations

pub mod build;
pub mod cache;
pub mod clean;
pub mod completions;
pub mod fetch;
pub mod loc;
pub mod nuget;
pub mod package;

use std::sync::Arc;

use anyhow::Result;

use crate::GlobalOptions;
use extforge::sources::{CacheSettings, SourceCache};
use extforge::util::http::ReqwestClient;
use extforge::util::process::CommandRunner;

/// Build the dependency cache. CLI flags override config.
pub fn source_cache(
    global_opts: &GlobalOptions,
    runner: Arc<dyn CommandRunner>,
    offline: bool,
    jobs: Option<usize>,
) -> Result<SourceCache> {
    let config = &global_opts.config;

    let settings = CacheSettings::new(global_opts.cache_root())
        .with_npm(config.npm(), config.npm_min_version()?)
        .offline(offline || config.net.offline)
        .require_checksums(config.verify.require_checksums)
        .jobs(jobs.unwrap_or_else(|| config.jobs()).max(1));

    let http = Arc::new(ReqwestClient::new(config.timeout())?);
    Ok(SourceCache::new(settings, http, runner))
}
