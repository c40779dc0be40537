//! Staged fetch-and-commit into the dependency cache.
//!
//! Every fetch is assembled in a partial directory and promoted to the
//! committed tree only once the adapter has fully populated it:
//!
//! 1. A committed directory for the key means the dependency is cached.
//!    Nothing is re-validated.
//! 2. A partial directory left by an earlier attempt is deleted, never
//!    resumed.
//! 3. The partial directory is created and handed to the adapter.
//! 4. On adapter failure the error propagates and the partial directory is
//!    left on disk for inspection. Nothing is created at the committed path.
//! 5. On success the partial directory is renamed onto the committed path.
//! 6. Empty partial parents are pruned.
//!
//! Two concurrent calls for the same key are not safe: both would delete and
//! recreate the same partial directory. Callers must serialize them.
//! Different keys use disjoint paths and may run concurrently; the shared
//! parents are created and pruned in a way that tolerates that.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::DependencyDeclaration;
use crate::sources::{CacheError, CacheKey, CacheKeyResolver};
use crate::util::fs::{copy_dir_all, prune_empty_parents};

/// Result of a successful `ensure_cached` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Cache key of the entry
    pub key: CacheKey,

    /// Committed directory of the entry
    pub path: PathBuf,

    /// True if this call fetched the entry, false if it was already cached
    pub fresh: bool,
}

/// Idempotent fetch-stage-commit against a cache root.
#[derive(Debug, Clone)]
pub struct StagedFetcher {
    resolver: CacheKeyResolver,
}

impl StagedFetcher {
    /// Create a fetcher over the resolver's cache root.
    pub fn new(resolver: CacheKeyResolver) -> Self {
        StagedFetcher { resolver }
    }

    /// Get the key resolver.
    pub fn resolver(&self) -> &CacheKeyResolver {
        &self.resolver
    }

    /// Check if a declaration already has a committed entry.
    pub fn is_cached(&self, decl: &DependencyDeclaration) -> Result<bool, CacheError> {
        let key = self.resolver.resolve(decl)?;
        Ok(self.resolver.committed_path(&key).is_dir())
    }

    /// Ensure a dependency is present in the cache.
    ///
    /// `fetch_and_layout` receives an empty directory and must populate it
    /// with the dependency's final on-disk layout. It is not called when the
    /// entry is already committed.
    pub fn ensure_cached<F>(
        &self,
        decl: &DependencyDeclaration,
        fetch_and_layout: F,
    ) -> Result<FetchOutcome, CacheError>
    where
        F: FnOnce(&Path) -> Result<(), CacheError>,
    {
        let key = self.resolver.resolve(decl)?;
        let committed = self.resolver.committed_path(&key);

        if committed.is_dir() {
            tracing::info!("Already cached: {}", decl);
            return Ok(FetchOutcome {
                key,
                path: committed,
                fresh: false,
            });
        }

        let partial = self.resolver.partial_path(&key);
        discard_stale_partial(&partial)?;

        create_partial(&partial)?;
        tracing::debug!("Staging {} in {}", key, partial.display());

        if let Err(e) = fetch_and_layout(&partial) {
            tracing::debug!(
                "Fetch of {} failed; partial directory kept at {}",
                key,
                partial.display()
            );
            return Err(e);
        }

        commit(&partial, &committed)?;

        prune_empty_parents(&partial, &self.resolver.partial_root())
            .map_err(|e| CacheError::fs(&partial, e))?;

        tracing::info!("Cached {} at {}", decl, committed.display());

        Ok(FetchOutcome {
            key,
            path: committed,
            fresh: true,
        })
    }
}

/// Delete whatever an interrupted attempt left at the partial path.
fn discard_stale_partial(partial: &Path) -> Result<(), CacheError> {
    let metadata = match fs::symlink_metadata(partial) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(CacheError::fs(partial, e)),
    };

    tracing::debug!("Removing stale partial directory {}", partial.display());

    let result = if metadata.is_dir() {
        fs::remove_dir_all(partial)
    } else {
        fs::remove_file(partial)
    };
    result.map_err(|e| CacheError::fs(partial, e))
}

/// Create the partial directory and its parents.
///
/// A concurrent prune for another key can remove a parent between two
/// creation steps; creation is retried a few times when that happens.
fn create_partial(partial: &Path) -> Result<(), CacheError> {
    let mut attempts = 0;
    loop {
        match fs::create_dir_all(partial) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound && attempts < 3 => attempts += 1,
            Err(e) => return Err(CacheError::fs(partial, e)),
        }
    }
}

/// Promote a populated partial directory to its committed path.
///
/// A rename is atomic. When it fails (typically because the partial and
/// committed trees are on different filesystems) the tree is copied to a
/// sibling of the committed path and renamed from there, so the committed
/// path still only ever appears fully populated. The copy itself is not
/// atomic: an interruption leaves an `.incoming` sibling behind, which the
/// next commit for the same key deletes.
fn commit(partial: &Path, committed: &Path) -> Result<(), CacheError> {
    if let Some(parent) = committed.parent() {
        fs::create_dir_all(parent).map_err(|e| CacheError::fs(parent, e))?;
    }

    let rename_err = match fs::rename(partial, committed) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    tracing::warn!(
        "Could not rename {} to {} ({}); copying instead",
        partial.display(),
        committed.display(),
        rename_err
    );

    commit_by_copy(partial, committed)
}

/// Copy `partial` to an `.incoming` sibling of `committed`, rename that
/// into place, then delete `partial`.
fn commit_by_copy(partial: &Path, committed: &Path) -> Result<(), CacheError> {
    let incoming = incoming_path(committed);
    discard_stale_partial(&incoming)?;
    copy_dir_all(partial, &incoming).map_err(|e| CacheError::fs(&incoming, e))?;
    fs::rename(&incoming, committed).map_err(|e| CacheError::fs(committed, e))?;
    fs::remove_dir_all(partial).map_err(|e| CacheError::fs(partial, e))
}

/// Sibling of `committed` used by the copy fallback.
fn incoming_path(committed: &Path) -> PathBuf {
    let name = committed
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    committed.with_file_name(format!(".{}.incoming", name))
}
