//! Global context for extforge operations.
//!
//! Provides centralized access to configuration, paths, and environment.
//! Every pipeline path is relative to the project root, which is the
//! working directory the tool was started in.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::util::config::{load_config, Config};

static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("com", "extforge", "extforge"));

/// Name of the project-local settings directory.
pub const PROJECT_CONFIG_DIR: &str = ".extforge";

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Project root (current working directory)
    cwd: PathBuf,

    /// Directory holding the global config file
    home: PathBuf,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific project root.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = if let Some(dirs) = PROJECT_DIRS.as_ref() {
            dirs.config_dir().to_path_buf()
        } else {
            directories::BaseDirs::new()
                .map(|b| b.home_dir().join(PROJECT_CONFIG_DIR))
                .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_DIR))
        };

        GlobalContext {
            cwd,
            home,
            verbose: false,
            color: true,
        }
    }

    /// Set verbose mode.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Set color output.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Check if verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if color output is enabled.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Get the project root.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global extforge directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Get the project configuration file path.
    pub fn project_config_path(&self) -> PathBuf {
        self.cwd.join(PROJECT_CONFIG_DIR).join("config.toml")
    }

    /// Load the merged global and project configuration.
    pub fn load_config(&self) -> Config {
        load_config(&self.config_path(), &self.project_config_path())
    }

    /// Build output root (`_build`).
    pub fn build_dir(&self) -> PathBuf {
        self.cwd.join("_build")
    }

    /// Built extensions (`_build/Extensions`).
    pub fn extensions_build_dir(&self) -> PathBuf {
        self.build_dir().join("Extensions")
    }

    /// VSIX output root (`_package`).
    pub fn package_dir(&self) -> PathBuf {
        self.cwd.join("_package")
    }

    /// NuGet packaging root (`_nuget`).
    pub fn nuget_dir(&self) -> PathBuf {
        self.cwd.join("_nuget")
    }

    /// Default dependency cache root (`_temp`).
    pub fn temp_dir(&self) -> PathBuf {
        self.cwd.join("_temp")
    }

    /// Extension sources (`Extensions`).
    pub fn extensions_src(&self) -> PathBuf {
        self.cwd.join("Extensions")
    }

    /// Shared type definitions (`definitions`).
    pub fn definitions_dir(&self) -> PathBuf {
        self.cwd.join("definitions")
    }

    /// Task module sources (`TaskModules`).
    pub fn task_modules_dir(&self) -> PathBuf {
        self.cwd.join("TaskModules")
    }

    /// Root TypeScript project (`tsconfig.json`).
    pub fn tsconfig_path(&self) -> PathBuf {
        self.cwd.join("tsconfig.json")
    }

    /// Resolve the cache root: explicit override, then config, then `_temp`.
    ///
    /// Relative paths are taken relative to the project root.
    pub fn cache_root(&self, override_dir: Option<&Path>, config: &Config) -> PathBuf {
        let root = override_dir
            .map(Path::to_path_buf)
            .or_else(|| config.cache.root.clone())
            .unwrap_or_else(|| self.temp_dir());
        if root.is_absolute() {
            root
        } else {
            self.cwd.join(root)
        }
    }
}
