//! Wrapping a packaged extension into a NuGet package.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use semver::Version;

use crate::ops::compile::run_checked;
use crate::util::config::NuGetConfig;
use crate::util::fs::{copy_dir_all, ensure_dir, remove_dir_all_if_exists, write_string};
use crate::util::process::{CommandRunner, ProcessBuilder};
use crate::util::GlobalContext;

/// Options for `extforge nuget-package`.
#[derive(Debug, Clone)]
pub struct NuGetOptions {
    /// Packaged extension under `_package`
    pub extension: String,
    /// Package version, must be valid semver
    pub version: String,
    /// Feed to push the package to
    pub server: Option<String>,
}

/// Package metadata written into the `.nuspec` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NuSpec {
    pub id: String,
    pub version: Version,
    pub authors: String,
    pub owners: String,
    pub description: String,
    pub tags: String,
}

impl NuSpec {
    /// Metadata for `extension`, filled from config where set.
    pub fn new(extension: &str, version: Version, config: &NuGetConfig) -> Self {
        let authors = config.authors.clone().unwrap_or_else(|| "Unknown".to_string());
        NuSpec {
            id: config.package_id.clone().unwrap_or_else(|| extension.to_string()),
            version,
            owners: config.owners.clone().unwrap_or_else(|| authors.clone()),
            authors,
            description: config
                .description
                .clone()
                .unwrap_or_else(|| format!("Packaged extension {}", extension)),
            tags: config.tags.clone().unwrap_or_default(),
        }
    }

    /// Render the `.nuspec` XML document.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        out.push_str(
            "<package xmlns=\"http://schemas.microsoft.com/packaging/2010/07/nuspec.xsd\">\n",
        );
        out.push_str("   <metadata>\n");
        for (tag, value) in [
            ("id", self.id.clone()),
            ("version", self.version.to_string()),
            ("authors", self.authors.clone()),
            ("owners", self.owners.clone()),
            ("requireLicenseAcceptance", "false".to_string()),
            ("description", self.description.clone()),
            ("tags", self.tags.clone()),
        ] {
            out.push_str(&format!("      <{tag}>{}</{tag}>\n", xml_escape(&value)));
        }
        out.push_str("   </metadata>\n");
        out.push_str("</package>\n");
        out
    }

    /// File name of the package `nuget pack` produces.
    pub fn nupkg_name(&self) -> String {
        format!("{}.{}.nupkg", self.id, self.version)
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Build a NuGet package from `_package/<extension>` and optionally push it.
///
/// Returns the path of the produced `.nupkg`.
pub fn nuget_package(
    ctx: &GlobalContext,
    runner: &dyn CommandRunner,
    nuget: &str,
    config: &NuGetConfig,
    options: &NuGetOptions,
) -> Result<PathBuf> {
    let version = Version::parse(&options.version)
        .with_context(|| format!("invalid semver version: {}", options.version))?;

    let extension_dir = ctx.package_dir().join(&options.extension);
    if !extension_dir.is_dir() {
        bail!(
            "extension `{}` has not been packaged ({} does not exist)",
            options.extension,
            extension_dir.display()
        );
    }

    let nuget_path = runner
        .find(nuget)
        .with_context(|| format!("`{}` not found in PATH", nuget))?;

    let root = ctx.nuget_dir();
    remove_dir_all_if_exists(&root)?;
    let source = root.join("pack-source");
    let contents = source.join("contents");
    ensure_dir(&contents)?;
    copy_dir_all(&extension_dir, &contents)
        .with_context(|| format!("failed to copy {}", extension_dir.display()))?;

    let nuspec = NuSpec::new(&options.extension, version, config);
    let nuspec_path = source.join(format!("{}.nuspec", nuspec.id));
    tracing::info!("Generating {}", nuspec_path.display());
    write_string(&nuspec_path, &nuspec.to_xml())?;

    let target = root.join("pack-target");
    ensure_dir(&target)?;
    let pack = ProcessBuilder::new(&nuget_path)
        .arg("pack")
        .arg(&nuspec_path)
        .arg("-Version")
        .arg(nuspec.version.to_string())
        .arg("-OutputDirectory")
        .arg(&target);
    run_checked(runner, &pack).context("nuget pack failed")?;

    let nupkg = target.join(nuspec.nupkg_name());

    if let Some(server) = &options.server {
        tracing::info!("Publishing {} to {}", nupkg.display(), server);
        let mut push = ProcessBuilder::new(&nuget_path)
            .arg("push")
            .arg(&nupkg)
            .arg("-Source")
            .arg(server);
        if let Some(key) = &config.api_key {
            push = push.arg("-ApiKey").arg(key);
        }
        run_checked(runner, &push).context("nuget push failed")?;
    }

    Ok(nupkg)
}
