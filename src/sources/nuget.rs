//! NuGet v2 source - feed packages fetched as plain archives.
//!
//! A v2 feed serves `<repository>/package/<name>/<version>` as a zip, so the
//! package is cached exactly like an archive declared with that URL.

use std::path::Path;
use std::sync::Arc;

use crate::core::{DependencyDeclaration, DependencyKind};
use crate::sources::{ArchiveSource, CacheError, Source};
use crate::util::http::HttpClient;

/// A source for packages on a NuGet v2 feed.
pub struct NuGetV2Source {
    decl: DependencyDeclaration,
    archive: ArchiveSource,
}

impl NuGetV2Source {
    /// Create a source for a `SecondaryRepositoryPackage` declaration.
    pub fn new(decl: &DependencyDeclaration, http: Arc<dyn HttpClient>) -> Result<Self, CacheError> {
        let not_nuget = || CacheError::invalid(format!("`{}` is not a NuGet v2 package", decl));

        if decl.kind() != DependencyKind::SecondaryRepositoryPackage {
            return Err(not_nuget());
        }
        let Some(DependencyDeclaration::Archive { url, sha256 }) = decl.to_archive() else {
            return Err(not_nuget());
        };

        Ok(NuGetV2Source {
            decl: decl.clone(),
            archive: ArchiveSource::new(url, sha256, http),
        })
    }

    /// Get the rewritten download URL.
    pub fn url(&self) -> &str {
        self.archive.url()
    }
}

impl Source for NuGetV2Source {
    fn name(&self) -> &str {
        "nugetv2"
    }

    fn declaration(&self) -> &DependencyDeclaration {
        &self.decl
    }

    fn fetch_and_layout(&self, dest: &Path) -> Result<(), CacheError> {
        tracing::info!("Downloading NuGet package {}", self.decl);
        self.archive.fetch_and_layout(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{zip_bytes, MockHttpClient};
    use tempfile::TempDir;

    #[test]
    fn test_url_strips_one_trailing_slash() {
        let http: Arc<MockHttpClient> = Arc::new(MockHttpClient::new());
        let url = |repo: &str| {
            let decl = DependencyDeclaration::nuget_v2(repo, "Foo", "1.0.0");
            NuGetV2Source::new(&decl, http.clone())
                .unwrap()
                .url()
                .to_string()
        };

        assert_eq!(
            url("https://www.nuget.org/api/v2/"),
            "https://www.nuget.org/api/v2/package/Foo/1.0.0"
        );
        assert_eq!(
            url("https://www.nuget.org/api/v2"),
            "https://www.nuget.org/api/v2/package/Foo/1.0.0"
        );
        assert_eq!(url("https://feed//"), "https://feed//package/Foo/1.0.0");
    }

    #[test]
    fn test_fetch_uses_rewritten_url() {
        let http = Arc::new(MockHttpClient::new());
        http.serve(
            "https://feed/api/v2/package/Foo/1.0.0",
            zip_bytes(&[("Foo.nuspec", "<package/>"), ("lib/net45/Foo.dll", "MZ")]),
        );
        let decl = DependencyDeclaration::nuget_v2("https://feed/api/v2/", "Foo", "1.0.0");
        let source = NuGetV2Source::new(&decl, http.clone()).unwrap();

        let tmp = TempDir::new().unwrap();
        source.fetch_and_layout(tmp.path()).unwrap();

        assert!(tmp.path().join("lib/net45/Foo.dll").is_file());
        assert_eq!(
            http.requests(),
            vec!["https://feed/api/v2/package/Foo/1.0.0".to_string()]
        );
    }

    #[test]
    fn test_rejects_other_kinds() {
        let http = Arc::new(MockHttpClient::new());
        let err = NuGetV2Source::new(&DependencyDeclaration::npm("q", "1.4.1"), http)
            .err()
            .unwrap();
        assert!(matches!(err, CacheError::InvalidDeclaration { .. }));
    }
}
