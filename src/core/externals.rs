//! `externals.json` parsing.
//!
//! An externals file lists the external dependencies an extension needs and
//! the shared task modules copied into its build output:
//!
//! ```json
//! {
//!   "npm": { "q": "1.4.1" },
//!   "nugetv2": { "AzureRM": { "version": "1.0.0", "repository": "https://feed/api/v2/" } },
//!   "archivePackages": [ { "url": "https://host/tool.zip" } ],
//!   "taskModule": { "0": { "type": "powershell", "name": "TlsHelper", "dest": "Tasks/Deploy/ps_modules" } }
//! }
//! ```
//!
//! Entry order is significant: dependencies are cached in file order.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::core::DependencyDeclaration;

/// File name of an externals file.
pub const EXTERNALS_FILE_NAME: &str = "externals.json";

/// A task module copy instruction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskModuleSpec {
    /// Module family directory under `TaskModules/` (e.g. "powershell")
    #[serde(rename = "type")]
    pub kind: String,

    /// Module directory name
    pub name: String,

    /// Destination, relative to the externals file's directory in the build output
    pub dest: String,
}

#[derive(Debug, Deserialize)]
struct NuGetEntry {
    version: Option<String>,
    repository: Option<String>,
    sha256: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArchiveEntry {
    url: Option<String>,
    sha256: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExternals {
    npm: Map<String, Value>,
    nugetv2: Map<String, Value>,
    #[serde(rename = "archivePackages")]
    archive_packages: Vec<ArchiveEntry>,
    #[serde(rename = "taskModule")]
    task_module: Map<String, Value>,
}

/// A parsed externals file.
#[derive(Debug, Clone, Default)]
pub struct ExternalsFile {
    /// Path the file was loaded from (empty when parsed from a string)
    pub path: PathBuf,

    /// Declared dependencies in file order
    pub dependencies: Vec<DependencyDeclaration>,

    /// Task modules to copy, in file order
    pub task_modules: Vec<TaskModuleSpec>,
}

impl ExternalsFile {
    /// Parse an externals file from JSON text.
    ///
    /// Missing fields are kept as empty strings so that validation, and the
    /// `InvalidDeclaration` error it produces, happens in one place when the
    /// declaration is resolved.
    pub fn parse(contents: &str) -> Result<Self> {
        let raw: RawExternals =
            serde_json::from_str(contents).context("failed to parse externals file")?;

        let mut dependencies = Vec::new();

        for (name, version) in &raw.npm {
            let version = match version {
                Value::String(v) => v.clone(),
                Value::Null => String::new(),
                other => bail!("npm package `{}` has a non-string version: {}", name, other),
            };
            dependencies.push(DependencyDeclaration::npm(name.clone(), version));
        }

        for (name, entry) in &raw.nugetv2 {
            let entry: NuGetEntry = serde_json::from_value(entry.clone())
                .with_context(|| format!("invalid nugetv2 entry for `{}`", name))?;
            let mut decl = DependencyDeclaration::nuget_v2(
                entry.repository.unwrap_or_default(),
                name.clone(),
                entry.version.unwrap_or_default(),
            );
            if let Some(sha256) = entry.sha256 {
                decl = decl.with_sha256(sha256);
            }
            dependencies.push(decl);
        }

        for entry in raw.archive_packages {
            let mut decl = DependencyDeclaration::archive(entry.url.unwrap_or_default());
            if let Some(sha256) = entry.sha256 {
                decl = decl.with_sha256(sha256);
            }
            dependencies.push(decl);
        }

        let mut task_modules = Vec::new();
        for (index, module) in raw.task_module {
            let spec: TaskModuleSpec = serde_json::from_value(module)
                .with_context(|| format!("invalid taskModule entry `{}`", index))?;
            task_modules.push(spec);
        }

        Ok(ExternalsFile {
            path: PathBuf::new(),
            dependencies,
            task_modules,
        })
    }

    /// Load an externals file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read externals file: {}", path.display()))?;

        let mut file = Self::parse(&contents)
            .with_context(|| format!("failed to load {}", path.display()))?;
        file.path = path.to_path_buf();
        Ok(file)
    }

    /// Directory containing this externals file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}

/// Find all externals files for a project.
///
/// Returns every `externals.json` below `extensions_dir` in sorted path
/// order, followed by the project-level `externals.json` if it exists.
pub fn discover_externals(extensions_dir: &Path, project_root: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = if extensions_dir.is_dir() {
        WalkDir::new(extensions_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == EXTERNALS_FILE_NAME)
            .map(|e| e.into_path())
            .collect()
    } else {
        Vec::new()
    };

    let root_file = project_root.join(EXTERNALS_FILE_NAME);
    if root_file.is_file() {
        found.push(root_file);
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_all_sections_in_order() {
        let file = ExternalsFile::parse(
            r#"{
                "npm": { "zeta": "2.0.0", "alpha": "1.0.0" },
                "nugetv2": {
                    "AzureRM": { "version": "4.1.0", "repository": "https://feed/api/v2/" }
                },
                "archivePackages": [
                    { "url": "https://host/a.zip" },
                    { "url": "https://host/b.zip", "sha256": "abcd" }
                ],
                "taskModule": {
                    "0": { "type": "powershell", "name": "Tls", "dest": "Tasks/X/ps_modules" }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            file.dependencies,
            vec![
                DependencyDeclaration::npm("zeta", "2.0.0"),
                DependencyDeclaration::npm("alpha", "1.0.0"),
                DependencyDeclaration::nuget_v2("https://feed/api/v2/", "AzureRM", "4.1.0"),
                DependencyDeclaration::archive("https://host/a.zip"),
                DependencyDeclaration::archive("https://host/b.zip").with_sha256("abcd"),
            ]
        );
        assert_eq!(file.task_modules.len(), 1);
        assert_eq!(file.task_modules[0].kind, "powershell");
        assert_eq!(file.task_modules[0].dest, "Tasks/X/ps_modules");
    }

    #[test]
    fn test_parse_empty_object() {
        let file = ExternalsFile::parse("{}").unwrap();
        assert!(file.dependencies.is_empty());
        assert!(file.task_modules.is_empty());
    }

    #[test]
    fn test_missing_fields_become_empty() {
        let file = ExternalsFile::parse(
            r#"{ "nugetv2": { "pkg": { "version": "1.0.0" } }, "archivePackages": [ {} ] }"#,
        )
        .unwrap();
        assert_eq!(
            file.dependencies,
            vec![
                DependencyDeclaration::nuget_v2("", "pkg", "1.0.0"),
                DependencyDeclaration::archive(""),
            ]
        );
    }

    #[test]
    fn test_non_string_npm_version_rejected() {
        let err = ExternalsFile::parse(r#"{ "npm": { "q": 1 } }"#).unwrap_err();
        assert!(err.to_string().contains("non-string version"));
    }

    #[test]
    fn test_discover_externals() {
        let tmp = TempDir::new().unwrap();
        let ext = tmp.path().join("Extensions");
        std::fs::create_dir_all(ext.join("B/Src")).unwrap();
        std::fs::create_dir_all(ext.join("A")).unwrap();
        std::fs::write(ext.join("B/Src/externals.json"), "{}").unwrap();
        std::fs::write(ext.join("A/externals.json"), "{}").unwrap();
        std::fs::write(ext.join("A/other.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("externals.json"), "{}").unwrap();

        let found = discover_externals(&ext, tmp.path());
        assert_eq!(
            found,
            vec![
                ext.join("A/externals.json"),
                ext.join("B/Src/externals.json"),
                tmp.path().join("externals.json"),
            ]
        );
    }
}
