//! Source cache management.
//!
//! `SourceCache` maps each declaration to its adapter and runs it through
//! the staged fetcher, one dependency or a whole externals list at a time.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use semver::Version;

use crate::core::DependencyDeclaration;
use crate::sources::npm::NpmTool;
use crate::sources::staged::FetchOutcome;
use crate::sources::{
    ArchiveSource, CacheError, CacheKeyResolver, NpmSource, NuGetV2Source, Source, StagedFetcher,
};
use crate::util::http::HttpClient;
use crate::util::process::CommandRunner;

/// Settings the cache is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Cache root directory
    pub root: PathBuf,

    /// npm program and minimum version
    pub npm: NpmTool,

    /// Fail on cache misses instead of fetching
    pub offline: bool,

    /// Reject archive-backed declarations without a `sha256`
    pub require_checksums: bool,

    /// Maximum concurrent fetches in `ensure_all`
    pub jobs: usize,
}

impl CacheSettings {
    /// Default settings for a cache root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CacheSettings {
            root: root.into(),
            npm: NpmTool::default(),
            offline: false,
            require_checksums: false,
            jobs: 1,
        }
    }

    /// Set the npm program and minimum version.
    pub fn with_npm(mut self, program: impl Into<String>, min_version: Version) -> Self {
        self.npm = NpmTool {
            program: program.into(),
            min_version,
        };
        self
    }

    /// Enable or disable offline mode.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Enable or disable the checksum requirement.
    pub fn require_checksums(mut self, require: bool) -> Self {
        self.require_checksums = require;
        self
    }

    /// Set the fetch concurrency.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }
}

/// The adapter selected for a declaration.
pub enum DependencySource {
    Archive(ArchiveSource),
    Npm(NpmSource),
    NuGetV2(NuGetV2Source),
}

impl DependencySource {
    fn inner(&self) -> &dyn Source {
        match self {
            DependencySource::Archive(s) => s,
            DependencySource::Npm(s) => s,
            DependencySource::NuGetV2(s) => s,
        }
    }
}

impl Source for DependencySource {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn declaration(&self) -> &DependencyDeclaration {
        self.inner().declaration()
    }

    fn fetch_and_layout(&self, dest: &Path) -> Result<(), CacheError> {
        self.inner().fetch_and_layout(dest)
    }
}

/// Manages the dependency cache and its adapters.
pub struct SourceCache {
    fetcher: StagedFetcher,
    settings: CacheSettings,
    http: Arc<dyn HttpClient>,
    runner: Arc<dyn CommandRunner>,
}

impl SourceCache {
    /// Create a new source cache.
    pub fn new(
        settings: CacheSettings,
        http: Arc<dyn HttpClient>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        SourceCache {
            fetcher: StagedFetcher::new(CacheKeyResolver::new(settings.root.clone())),
            settings,
            http,
            runner,
        }
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.settings.root
    }

    /// Get the staged fetcher.
    pub fn fetcher(&self) -> &StagedFetcher {
        &self.fetcher
    }

    /// Get the settings the cache was built from.
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Select the adapter for a declaration.
    ///
    /// Validates the declaration and the checksum policy first.
    pub fn source_for(&self, decl: &DependencyDeclaration) -> Result<DependencySource, CacheError> {
        self.fetcher.resolver().resolve(decl)?;

        match decl {
            DependencyDeclaration::Archive { url, sha256 } => {
                self.check_checksum_policy(decl)?;
                Ok(DependencySource::Archive(ArchiveSource::new(
                    url.clone(),
                    sha256.clone(),
                    self.http.clone(),
                )))
            }
            DependencyDeclaration::RegistryPackage { name, version } => {
                Ok(DependencySource::Npm(NpmSource::new(
                    name.clone(),
                    version.clone(),
                    self.settings.npm.clone(),
                    self.runner.clone(),
                )))
            }
            DependencyDeclaration::SecondaryRepositoryPackage { .. } => {
                self.check_checksum_policy(decl)?;
                Ok(DependencySource::NuGetV2(NuGetV2Source::new(
                    decl,
                    self.http.clone(),
                )?))
            }
        }
    }

    fn check_checksum_policy(&self, decl: &DependencyDeclaration) -> Result<(), CacheError> {
        if self.settings.require_checksums && decl.sha256().is_none() {
            return Err(CacheError::invalid(format!(
                "`{}` has no `sha256` and checksums are required",
                decl
            )));
        }
        Ok(())
    }

    /// Ensure a single dependency is cached.
    pub fn ensure(&self, decl: &DependencyDeclaration) -> Result<FetchOutcome, CacheError> {
        let source = self.source_for(decl)?;

        if self.settings.offline && !self.fetcher.is_cached(decl)? {
            return Err(CacheError::Network {
                url: decl.to_string(),
                message: "not cached and offline mode is enabled".to_string(),
            });
        }

        tracing::debug!("Using {} source for {}", source.name(), decl);
        self.fetcher
            .ensure_cached(decl, |dir| source.fetch_and_layout(dir))
    }

    /// Ensure every dependency in a list is cached.
    ///
    /// Declarations that resolve to the same cache key are fetched once;
    /// the first occurrence wins. Outcomes are returned in declaration
    /// order. The first error aborts the remaining fetches.
    ///
    /// With more than one job, versions of the same npm package still run
    /// one after another: their installs share a placeholder manifest.
    pub fn ensure_all(
        &self,
        decls: &[DependencyDeclaration],
    ) -> Result<Vec<FetchOutcome>, CacheError> {
        let unique = self.dedupe(decls)?;

        if self.settings.jobs <= 1 || unique.len() <= 1 {
            return unique.into_iter().map(|d| self.ensure(d)).collect();
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.jobs)
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!("Could not start fetch pool ({}); fetching sequentially", e);
                return unique.into_iter().map(|d| self.ensure(d)).collect();
            }
        };

        let batches = batch_by_install_root(&unique);
        tracing::debug!(
            "Fetching {} dependencies in {} batches on {} threads",
            unique.len(),
            batches.len(),
            self.settings.jobs
        );

        let fetched: Vec<Vec<(usize, FetchOutcome)>> = pool.install(|| {
            batches
                .par_iter()
                .map(|batch| {
                    batch
                        .iter()
                        .map(|&(index, decl)| self.ensure(decl).map(|o| (index, o)))
                        .collect::<Result<Vec<_>, CacheError>>()
                })
                .collect::<Result<Vec<_>, CacheError>>()
        })?;

        let mut outcomes: Vec<(usize, FetchOutcome)> = fetched.into_iter().flatten().collect();
        outcomes.sort_by_key(|(index, _)| *index);
        Ok(outcomes.into_iter().map(|(_, o)| o).collect())
    }

    /// Drop declarations whose cache key was already seen.
    fn dedupe<'a>(
        &self,
        decls: &'a [DependencyDeclaration],
    ) -> Result<Vec<&'a DependencyDeclaration>, CacheError> {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();

        for decl in decls {
            let key = self.fetcher.resolver().resolve(decl)?;
            if seen.insert(key) {
                unique.push(decl);
            } else {
                tracing::debug!("Skipping duplicate declaration {}", decl);
            }
        }

        Ok(unique)
    }
}

/// Group declarations that must not be fetched concurrently.
///
/// npm packages with the same name install under one parent directory and
/// land in a single batch, in declaration order. Everything else gets a
/// batch of its own. Each entry keeps its position in `decls`.
fn batch_by_install_root<'a>(
    decls: &[&'a DependencyDeclaration],
) -> Vec<Vec<(usize, &'a DependencyDeclaration)>> {
    let mut batches: Vec<Vec<(usize, &DependencyDeclaration)>> = Vec::new();
    let mut by_package: HashMap<&str, usize> = HashMap::new();

    for (index, &decl) in decls.iter().enumerate() {
        if let DependencyDeclaration::RegistryPackage { name, .. } = decl {
            if let Some(&batch) = by_package.get(name.as_str()) {
                batches[batch].push((index, decl));
                continue;
            }
            by_package.insert(name.as_str(), batches.len());
        }
        batches.push(vec![(index, decl)]);
    }

    batches
}
