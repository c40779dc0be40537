//! Dependency declarations.
//!
//! A declaration names one external artifact by kind, identity and exact
//! version. Declarations are produced by parsing an externals file and are
//! never mutated afterwards.

use std::fmt;

use serde::Serialize;

/// The kind of external dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// A zip archive fetched from a URL.
    Archive,
    /// A package installed by the npm package manager.
    RegistryPackage,
    /// A package served by a NuGet v2 feed.
    SecondaryRepositoryPackage,
}

impl DependencyKind {
    /// Section name used in `externals.json`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::Archive => "archivePackages",
            DependencyKind::RegistryPackage => "npm",
            DependencyKind::SecondaryRepositoryPackage => "nugetv2",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single external dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DependencyDeclaration {
    /// Zip archive addressed by URL.
    Archive {
        url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sha256: Option<String>,
    },

    /// npm package `name@version`.
    RegistryPackage { name: String, version: String },

    /// NuGet v2 package, fetched as `<repository>/package/<name>/<version>`.
    SecondaryRepositoryPackage {
        repository: String,
        name: String,
        version: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        sha256: Option<String>,
    },
}

impl DependencyDeclaration {
    /// Create an archive declaration.
    pub fn archive(url: impl Into<String>) -> Self {
        DependencyDeclaration::Archive {
            url: url.into(),
            sha256: None,
        }
    }

    /// Create an npm package declaration.
    pub fn npm(name: impl Into<String>, version: impl Into<String>) -> Self {
        DependencyDeclaration::RegistryPackage {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Create a NuGet v2 package declaration.
    pub fn nuget_v2(
        repository: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        DependencyDeclaration::SecondaryRepositoryPackage {
            repository: repository.into(),
            name: name.into(),
            version: version.into(),
            sha256: None,
        }
    }

    /// Attach an expected SHA256 digest (lowercase hex).
    ///
    /// Has no effect on npm packages, whose integrity is the package
    /// manager's concern.
    pub fn with_sha256(mut self, digest: impl Into<String>) -> Self {
        match &mut self {
            DependencyDeclaration::Archive { sha256, .. }
            | DependencyDeclaration::SecondaryRepositoryPackage { sha256, .. } => {
                *sha256 = Some(digest.into());
            }
            DependencyDeclaration::RegistryPackage { .. } => {}
        }
        self
    }

    /// Get the dependency kind.
    pub fn kind(&self) -> DependencyKind {
        match self {
            DependencyDeclaration::Archive { .. } => DependencyKind::Archive,
            DependencyDeclaration::RegistryPackage { .. } => DependencyKind::RegistryPackage,
            DependencyDeclaration::SecondaryRepositoryPackage { .. } => {
                DependencyKind::SecondaryRepositoryPackage
            }
        }
    }

    /// Get the identity: the URL for archives, the package name otherwise.
    pub fn identity(&self) -> &str {
        match self {
            DependencyDeclaration::Archive { url, .. } => url,
            DependencyDeclaration::RegistryPackage { name, .. } => name,
            DependencyDeclaration::SecondaryRepositoryPackage { name, .. } => name,
        }
    }

    /// Get the exact version, if the kind carries one.
    pub fn version(&self) -> Option<&str> {
        match self {
            DependencyDeclaration::Archive { .. } => None,
            DependencyDeclaration::RegistryPackage { version, .. } => Some(version),
            DependencyDeclaration::SecondaryRepositoryPackage { version, .. } => Some(version),
        }
    }

    /// Get the expected SHA256 digest, if declared.
    pub fn sha256(&self) -> Option<&str> {
        match self {
            DependencyDeclaration::Archive { sha256, .. }
            | DependencyDeclaration::SecondaryRepositoryPackage { sha256, .. } => {
                sha256.as_deref()
            }
            DependencyDeclaration::RegistryPackage { .. } => None,
        }
    }

    /// Rewrite a NuGet v2 declaration into the equivalent archive declaration.
    ///
    /// The URL is `repository` with one trailing slash stripped, followed by
    /// `/package/<name>/<version>`. Archive declarations are returned as-is;
    /// npm packages have no archive form and yield `None`.
    pub fn to_archive(&self) -> Option<DependencyDeclaration> {
        match self {
            DependencyDeclaration::Archive { .. } => Some(self.clone()),
            DependencyDeclaration::SecondaryRepositoryPackage {
                repository,
                name,
                version,
                sha256,
            } => {
                let base = repository.strip_suffix('/').unwrap_or(repository);
                Some(DependencyDeclaration::Archive {
                    url: format!("{}/package/{}/{}", base, name, version),
                    sha256: sha256.clone(),
                })
            }
            DependencyDeclaration::RegistryPackage { .. } => None,
        }
    }
}

impl fmt::Display for DependencyDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyDeclaration::Archive { url, .. } => write!(f, "{}", url),
            DependencyDeclaration::RegistryPackage { name, version } => {
                write!(f, "{}@{}", name, version)
            }
            DependencyDeclaration::SecondaryRepositoryPackage { name, version, .. } => {
                write!(f, "{} v{} (nugetv2)", name, version)
            }
        }
    }
}
