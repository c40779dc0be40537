//! Configuration file support for extforge.
//!
//! extforge reads two configuration files:
//! - Global: `<config dir>/config.toml` - User-wide defaults
//! - Project: `.extforge/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};

/// Default download timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Oldest npm accepted when installing registry packages.
pub const DEFAULT_NPM_MIN_VERSION: &str = "3.0.0";

/// extforge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dependency cache settings
    pub cache: CacheConfig,

    /// Network settings
    pub net: NetConfig,

    /// Download verification settings
    pub verify: VerifyConfig,

    /// External tool overrides
    pub tools: ToolsConfig,

    /// Build settings
    pub build: BuildConfig,

    /// NuGet packaging metadata
    pub nuget: NuGetConfig,
}

/// Dependency cache configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache root (defaults to `<project>/_temp`)
    pub root: Option<PathBuf>,
}

/// Network configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Download timeout in seconds; 0 disables the timeout
    pub timeout_secs: Option<u64>,

    /// Offline mode (only use cached dependencies)
    pub offline: bool,
}

/// Download verification configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    /// Require a `sha256` on every archive and NuGet declaration
    pub require_checksums: bool,
}

/// External tool configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub npm: Option<String>,
    pub npm_min_version: Option<String>,
    pub tsc: Option<String>,
    pub tfx: Option<String>,
    pub nuget: Option<String>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Concurrent dependency fetches
    pub jobs: Option<usize>,
}

/// Metadata written into the generated nuspec.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NuGetConfig {
    pub package_id: Option<String>,
    pub authors: Option<String>,
    pub owners: Option<String>,
    pub description: Option<String>,
    pub tags: Option<String>,
    pub api_key: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        fn take<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        take(&mut self.cache.root, other.cache.root);

        take(&mut self.net.timeout_secs, other.net.timeout_secs);
        if other.net.offline {
            self.net.offline = true;
        }

        if other.verify.require_checksums {
            self.verify.require_checksums = true;
        }

        take(&mut self.tools.npm, other.tools.npm);
        take(&mut self.tools.npm_min_version, other.tools.npm_min_version);
        take(&mut self.tools.tsc, other.tools.tsc);
        take(&mut self.tools.tfx, other.tools.tfx);
        take(&mut self.tools.nuget, other.tools.nuget);

        take(&mut self.build.jobs, other.build.jobs);

        take(&mut self.nuget.package_id, other.nuget.package_id);
        take(&mut self.nuget.authors, other.nuget.authors);
        take(&mut self.nuget.owners, other.nuget.owners);
        take(&mut self.nuget.description, other.nuget.description);
        take(&mut self.nuget.tags, other.nuget.tags);
        take(&mut self.nuget.api_key, other.nuget.api_key);
    }

    /// Download timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        match self.net.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Minimum npm version.
    pub fn npm_min_version(&self) -> Result<Version> {
        let raw = self
            .tools
            .npm_min_version
            .as_deref()
            .unwrap_or(DEFAULT_NPM_MIN_VERSION);
        Version::parse(raw).with_context(|| format!("invalid `tools.npm_min_version`: {}", raw))
    }

    /// npm program name or path.
    pub fn npm(&self) -> &str {
        self.tools.npm.as_deref().unwrap_or("npm")
    }

    /// TypeScript compiler program name or path.
    pub fn tsc(&self) -> &str {
        self.tools.tsc.as_deref().unwrap_or("tsc")
    }

    /// tfx-cli program name or path.
    pub fn tfx(&self) -> &str {
        self.tools.tfx.as_deref().unwrap_or("tfx")
    }

    /// nuget program name or path.
    pub fn nuget(&self) -> &str {
        self.tools.nuget.as_deref().unwrap_or("nuget")
    }

    /// Concurrent dependency fetches.
    pub fn jobs(&self) -> usize {
        self.build.jobs.unwrap_or(1).max(1)
    }
}

/// Load merged configuration from global and project config files.
///
/// Priority (highest to lowest):
/// 1. Project config (.extforge/config.toml)
/// 2. Global config (<config dir>/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.npm_min_version().unwrap(), Version::new(3, 0, 0));
        assert_eq!(config.npm(), "npm");
        assert_eq!(config.tfx(), "tfx");
        assert_eq!(config.jobs(), 1);
        assert!(!config.net.offline);
        assert!(config.cache.root.is_none());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[cache]
root = "/var/cache/extforge"

[net]
timeout_secs = 0
offline = true

[tools]
npm = "/opt/node/bin/npm"
npm_min_version = "6.0.0"

[build]
jobs = 4

[nuget]
package_id = "Contoso.Extensions"
authors = "Contoso"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.cache.root, Some(PathBuf::from("/var/cache/extforge")));
        assert_eq!(config.timeout(), None);
        assert!(config.net.offline);
        assert_eq!(config.npm(), "/opt/node/bin/npm");
        assert_eq!(config.npm_min_version().unwrap(), Version::new(6, 0, 0));
        assert_eq!(config.jobs(), 4);
        assert_eq!(config.nuget.package_id.as_deref(), Some("Contoso.Extensions"));
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.tools.tsc = Some("/usr/bin/tsc".to_string());
        base.build.jobs = Some(4);

        let mut override_cfg = Config::default();
        override_cfg.tools.tsc = Some("./node_modules/.bin/tsc".to_string());
        override_cfg.verify.require_checksums = true;

        base.merge(override_cfg);

        assert_eq!(base.tsc(), "./node_modules/.bin/tsc");
        assert_eq!(base.jobs(), 4); // Not overridden
        assert!(base.verify.require_checksums);
    }

    #[test]
    fn test_load_config_priority() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");

        std::fs::write(&global, "[net]\ntimeout_secs = 60\n[tools]\nnpm = \"npm-global\"\n")
            .unwrap();
        std::fs::write(&project, "[tools]\nnpm = \"npm-project\"\n").unwrap();

        let config = load_config(&global, &project);
        assert_eq!(config.npm(), "npm-project");
        assert_eq!(config.timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[net\ntimeout_secs = ").unwrap();

        assert!(Config::load(&path).is_err());
        assert_eq!(Config::load_or_default(&path), Config::default());
    }

    #[test]
    fn test_invalid_npm_min_version() {
        let mut config = Config::default();
        config.tools.npm_min_version = Some("three".to_string());
        assert!(config.npm_min_version().is_err());
    }
}
