//! Extforge - build orchestration for multi-extension plugin projects
//!
//! This crate provides the core library functionality for Extforge,
//! including the external dependency cache, the build pipeline steps,
//! and packaging of compiled extensions.

pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and mocks for Extforge unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides mock implementations for process
/// execution and HTTP operations.
#[cfg(test)]
pub mod test_support;

pub use core::{DependencyDeclaration, DependencyKind, ExternalsFile};
pub use sources::{CacheError, CacheKey, CacheKeyResolver, SourceCache, StagedFetcher};
pub use util::context::GlobalContext;
