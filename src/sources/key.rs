//! Cache addressing.
//!
//! Maps a dependency declaration to a deterministic cache key and to the
//! committed and partial directories for that key:
//!
//! ```text
//! <root>/archive/<scrubbed-url>/          committed archive entry
//! <root>/npm/<name>/<version>/            committed npm entry
//! <root>/partial/<kind>/<segments...>/    in-progress entry for either kind
//! ```
//!
//! Equal kind, identity and version always yield equal keys. NuGet v2
//! packages are rewritten to their download URL first, so they share the
//! archive namespace.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::core::DependencyDeclaration;
use crate::sources::CacheError;

/// Directory under the cache root holding in-progress entries.
pub const PARTIAL_DIR: &str = "partial";

/// Characters that are not safe in a single path segment.
const UNSAFE_URL_CHARS: [char; 4] = ['/', '\\', ':', '?'];

/// Top-level namespace of a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyKind {
    Archive,
    Npm,
}

impl KeyKind {
    /// Directory name for this namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Archive => "archive",
            KeyKind::Npm => "npm",
        }
    }

    /// All namespaces, in listing order.
    pub fn all() -> [KeyKind; 2] {
        [KeyKind::Archive, KeyKind::Npm]
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deterministic identifier of a cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    kind: KeyKind,
    segments: Vec<String>,
}

impl CacheKey {
    /// Key for an archive URL.
    pub fn archive(url: &str) -> Self {
        CacheKey {
            kind: KeyKind::Archive,
            segments: vec![scrub_url(url)],
        }
    }

    /// Key for an npm package.
    pub fn npm(name: &str, version: &str) -> Self {
        CacheKey {
            kind: KeyKind::Npm,
            segments: vec![name.to_string(), version.to_string()],
        }
    }

    /// Get the key namespace.
    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Get the path segments below the namespace directory.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Relative path of this entry: `<kind>/<segments...>`.
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::from(self.kind.as_str());
        for segment in &self.segments {
            path.push(segment);
        }
        path
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.segments.join("/"))
    }
}

/// Replace path-unsafe URL characters with `_`.
///
/// Not injective: `a/b` and `a:b` map to the same key.
pub fn scrub_url(url: &str) -> String {
    url.chars()
        .map(|c| if UNSAFE_URL_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Resolves declarations to cache keys and cache paths.
///
/// The cache root is fixed at construction; there is no process-wide
/// default.
#[derive(Debug, Clone)]
pub struct CacheKeyResolver {
    root: PathBuf,
}

impl CacheKeyResolver {
    /// Create a resolver for the given cache root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CacheKeyResolver { root: root.into() }
    }

    /// Get the cache root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the root of the partial (staging) tree.
    pub fn partial_root(&self) -> PathBuf {
        self.root.join(PARTIAL_DIR)
    }

    /// Resolve a declaration to its cache key.
    ///
    /// Pure: performs no I/O. Fails with `InvalidDeclaration` when a
    /// required field is empty or a package name would escape the cache.
    pub fn resolve(&self, decl: &DependencyDeclaration) -> Result<CacheKey, CacheError> {
        resolve(decl)
    }

    /// Directory of the committed entry for a key.
    pub fn committed_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Directory of the partial entry for a key.
    pub fn partial_path(&self, key: &CacheKey) -> PathBuf {
        self.partial_root().join(key.relative_path())
    }
}

/// Resolve a declaration to its cache key.
pub fn resolve(decl: &DependencyDeclaration) -> Result<CacheKey, CacheError> {
    match decl {
        DependencyDeclaration::Archive { url, .. } => {
            require_non_empty("url", url)?;
            let key = CacheKey::archive(url);
            if key.segments.iter().any(|s| s.trim_matches('.').is_empty()) {
                return Err(CacheError::invalid(format!(
                    "`{}` is not a valid archive url",
                    url
                )));
            }
            Ok(key)
        }
        DependencyDeclaration::RegistryPackage { name, version } => {
            require_non_empty("name", name)?;
            require_non_empty("version", version)?;
            require_relative_segment("name", name)?;
            require_relative_segment("version", version)?;
            Ok(CacheKey::npm(name, version))
        }
        DependencyDeclaration::SecondaryRepositoryPackage {
            repository,
            name,
            version,
            ..
        } => {
            require_non_empty("repository", repository)?;
            require_non_empty("name", name)?;
            require_non_empty("version", version)?;
            let archive = decl
                .to_archive()
                .ok_or_else(|| CacheError::invalid("nugetv2 package has no archive url"))?;
            resolve(&archive)
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), CacheError> {
    if value.trim().is_empty() {
        return Err(CacheError::invalid(format!(
            "parameter `{}` cannot be null or empty",
            field
        )));
    }
    Ok(())
}

/// Reject values that would resolve outside their namespace directory.
fn require_relative_segment(field: &str, value: &str) -> Result<(), CacheError> {
    let path = Path::new(value);
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes || value.contains('\\') {
        return Err(CacheError::invalid(format!(
            "`{}` is not a valid package {}",
            value, field
        )));
    }
    Ok(())
}
