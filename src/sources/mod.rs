//! Dependency sources and the local cache.
//!
//! Declarations resolve to cache keys (`key`), are fetched through a
//! kind-specific adapter (`archive`, `npm`, `nuget`) and committed by the
//! staged fetcher (`staged`). `SourceCache` ties them together.

pub mod archive;
pub mod cache;
pub mod error;
pub mod key;
pub mod npm;
pub mod nuget;
pub mod source;
pub mod staged;

pub use archive::ArchiveSource;
pub use cache::{CacheSettings, DependencySource, SourceCache};
pub use error::CacheError;
pub use key::{CacheKey, CacheKeyResolver, KeyKind};
pub use npm::{NpmSource, NpmTool};
pub use nuget::NuGetV2Source;
pub use source::Source;
pub use staged::{FetchOutcome, StagedFetcher};
