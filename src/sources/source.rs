//! Source trait - common interface for all dependency adapters.

use std::path::Path;

use crate::core::DependencyDeclaration;
use crate::sources::CacheError;

/// A kind-specific way of producing a dependency's on-disk layout.
pub trait Source: Send + Sync {
    /// Get the source name for display.
    fn name(&self) -> &str;

    /// The declaration this source fetches.
    fn declaration(&self) -> &DependencyDeclaration;

    /// Populate `dest` (an existing, empty directory) with the dependency.
    ///
    /// May perform network I/O or run external tools. On error, whatever
    /// was written to `dest` stays there.
    fn fetch_and_layout(&self, dest: &Path) -> Result<(), CacheError>;
}
