//! npm source - registry packages installed with the npm CLI.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;

use crate::core::DependencyDeclaration;
use crate::sources::{CacheError, Source};
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Manifest written above the install directory so npm does not warn about
/// a missing package.json. It never ends up inside the committed entry.
/// Versions of one package share it, so their installs must not overlap.
const PLACEHOLDER_MANIFEST: &str = r#"{
  "name": "temp",
  "version": "1.0.0",
  "description": "temp to avoid warnings",
  "main": "index.js",
  "dependencies": {},
  "devDependencies": {},
  "repository": "http://norepo/but/nowarning",
  "scripts": {
    "test": "echo \"Error: no test specified\" && exit 1"
  },
  "author": "",
  "license": "MIT"
}
"#;

/// Which npm to run and how old it may be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmTool {
    /// Program name or path
    pub program: String,

    /// Oldest accepted `npm --version`
    pub min_version: Version,
}

impl Default for NpmTool {
    fn default() -> Self {
        NpmTool {
            program: "npm".to_string(),
            min_version: Version::new(3, 0, 0),
        }
    }
}

/// A source for npm registry packages.
pub struct NpmSource {
    decl: DependencyDeclaration,
    name: String,
    version: String,
    tool: NpmTool,
    runner: Arc<dyn CommandRunner>,
}

impl NpmSource {
    /// Create an npm source for `name@version`.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        tool: NpmTool,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let name = name.into();
        let version = version.into();
        NpmSource {
            decl: DependencyDeclaration::npm(name.clone(), version.clone()),
            name,
            version,
            tool,
            runner,
        }
    }

    /// Package specifier passed to `npm install`.
    pub fn package_arg(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Locate npm and check that it is new enough.
    fn locate_npm(&self) -> Result<PathBuf, CacheError> {
        let npm = self
            .runner
            .find(&self.tool.program)
            .ok_or_else(|| CacheError::ToolNotFound {
                tool: self.tool.program.clone(),
                min_version: self.tool.min_version.to_string(),
            })?;

        let cmd = ProcessBuilder::new(&npm).arg("--version");
        let output = self.runner.run(&cmd).map_err(|e| CacheError::Install {
            command: cmd.display_command(),
            code: None,
            stderr: format!("{:#}", e),
        })?;

        let raw = output.stdout.replace(&['\r', '\n'][..], "");
        let found = raw.trim();
        tracing::info!("npm version: \"{}\"", found);

        let too_old = || CacheError::ToolVersionTooOld {
            tool: self.tool.program.clone(),
            found: found.to_string(),
            required: self.tool.min_version.to_string(),
        };

        let version = Version::parse(found).map_err(|_| too_old())?;
        if version < self.tool.min_version {
            return Err(too_old());
        }

        Ok(npm)
    }
}

impl Source for NpmSource {
    fn name(&self) -> &str {
        "npm"
    }

    fn declaration(&self) -> &DependencyDeclaration {
        &self.decl
    }

    fn fetch_and_layout(&self, dest: &Path) -> Result<(), CacheError> {
        tracing::info!("Downloading npm package {}", self.package_arg());

        let npm = self.locate_npm()?;

        let placeholder = dest
            .parent()
            .map(|p| p.join("package.json"))
            .ok_or_else(|| CacheError::invalid(format!("no parent for {}", dest.display())))?;
        fs::write(&placeholder, PLACEHOLDER_MANIFEST)
            .map_err(|e| CacheError::fs(&placeholder, e))?;

        // Without a local node_modules npm installs into the nearest one
        // further up the tree.
        let node_modules = dest.join("node_modules");
        fs::create_dir_all(&node_modules).map_err(|e| CacheError::fs(&node_modules, e))?;

        let cmd = ProcessBuilder::new(&npm)
            .arg("install")
            .arg(self.package_arg())
            .cwd(dest);
        let output = self.runner.run(&cmd).map_err(|e| CacheError::Install {
            command: cmd.display_command(),
            code: None,
            stderr: format!("{:#}", e),
        })?;

        if !output.stdout.trim().is_empty() {
            tracing::debug!("{}", output.stdout.trim_end());
        }

        if !output.success() {
            return Err(CacheError::Install {
                command: cmd.display_command(),
                code: output.status,
                stderr: output.stderr,
            });
        }

        match fs::remove_file(&placeholder) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::fs(&placeholder, e)),
        }
    }
}
