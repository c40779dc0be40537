//! VSIX packaging of built extensions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use thiserror::Error;

use crate::ops::compile::built_extensions;
use crate::util::fs::{ensure_dir, read_to_string, remove_dir_all_if_exists, write_string};
use crate::util::process::{CommandRunner, ProcessBuilder};
use crate::util::GlobalContext;

/// Manifest file of an extension, relative to its `Src` directory.
pub const MANIFEST_FILE_NAME: &str = "vss-extension.json";

/// Error while packaging an extension.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("`{tool}` not found in PATH")]
    ToolNotFound { tool: String },

    #[error("`{command}` failed with exit code {code:?}\n{output}")]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },

    #[error("extension `{extension}` has no manifest at {}", path.display())]
    MissingManifest { extension: String, path: PathBuf },
}

/// Creates an extension package from a manifest directory.
pub trait Packager: Send + Sync {
    /// Package the manifests matching `manifest_glob` under `root` into `output`.
    fn create(&self, manifest_glob: &str, root: &Path, output: &Path) -> Result<(), PackageError>;
}

/// Packager backed by `tfx extension create`.
pub struct TfxPackager {
    program: String,
    runner: Arc<dyn CommandRunner>,
}

impl TfxPackager {
    pub fn new(program: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        TfxPackager {
            program: program.into(),
            runner,
        }
    }
}

impl Packager for TfxPackager {
    fn create(&self, manifest_glob: &str, root: &Path, output: &Path) -> Result<(), PackageError> {
        let tfx = self
            .runner
            .find(&self.program)
            .ok_or_else(|| PackageError::ToolNotFound {
                tool: self.program.clone(),
            })?;

        let cmd = ProcessBuilder::new(tfx)
            .args(["extension", "create", "--manifest-globs", manifest_glob])
            .arg("--root")
            .arg(root)
            .arg("--output-path")
            .arg(output);

        let failed = |code, output| PackageError::Failed {
            command: cmd.display_command(),
            code,
            output,
        };
        let result = self
            .runner
            .run(&cmd)
            .map_err(|e| failed(None, format!("{:#}", e)))?;
        if !result.success() {
            let mut combined = result.stdout;
            combined.push_str(&result.stderr);
            return Err(failed(result.status, combined.trim_end().to_string()));
        }
        Ok(())
    }
}

/// Options for `extforge package`.
#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Package only this extension
    pub extension: Option<String>,
    /// Publisher written into each manifest before packaging
    pub publisher: Option<String>,
}

/// Rewrite the `publisher` field of a manifest. Other fields keep their order.
pub fn set_publisher(manifest: &Path, publisher: &str) -> Result<()> {
    let contents = read_to_string(manifest)?;
    let mut doc: Value = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse {}", manifest.display()))?;

    let Some(object) = doc.as_object_mut() else {
        anyhow::bail!("{} is not a JSON object", manifest.display());
    };
    object.insert("publisher".to_string(), Value::String(publisher.to_string()));

    write_string(manifest, &serde_json::to_string(&doc)?)
}

/// Package one extension into `_package/<extension>`.
pub fn package_extension(
    ctx: &GlobalContext,
    packager: &dyn Packager,
    extension: &str,
    publisher: Option<&str>,
) -> Result<PathBuf> {
    let manifest_root = ctx.extensions_build_dir().join(extension).join("Src");
    let manifest = manifest_root.join(MANIFEST_FILE_NAME);
    if !manifest.is_file() {
        return Err(PackageError::MissingManifest {
            extension: extension.to_string(),
            path: manifest,
        }
        .into());
    }

    let output = ctx.package_dir().join(extension);
    remove_dir_all_if_exists(&output)?;

    if let Some(publisher) = publisher {
        tracing::debug!("Setting publisher of {} to {}", extension, publisher);
        set_publisher(&manifest, publisher)?;
    }

    ensure_dir(&output)?;
    packager
        .create(MANIFEST_FILE_NAME, &manifest_root, &output)
        .with_context(|| format!("failed to package extension `{}`", extension))?;

    Ok(output)
}

/// Package the requested extension, or every built extension.
///
/// When packaging everything, directories without a manifest are skipped
/// with a warning. Returns the output directories.
pub fn package(
    ctx: &GlobalContext,
    packager: &dyn Packager,
    options: &PackageOptions,
) -> Result<Vec<PathBuf>> {
    let publisher = options.publisher.as_deref();

    if let Some(extension) = &options.extension {
        return Ok(vec![package_extension(ctx, packager, extension, publisher)?]);
    }

    let mut outputs = Vec::new();
    for extension in built_extensions(ctx)? {
        let manifest = ctx
            .extensions_build_dir()
            .join(&extension)
            .join("Src")
            .join(MANIFEST_FILE_NAME);
        if !manifest.is_file() {
            tracing::warn!("Skipping `{}`: no {}", extension, MANIFEST_FILE_NAME);
            continue;
        }
        tracing::info!("Packaging {}", extension);
        outputs.push(package_extension(ctx, packager, &extension, publisher)?);
    }
    Ok(outputs)
}
