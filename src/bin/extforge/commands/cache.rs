//! `extforge cache` command
//!
//! Inspect and manage the dependency cache.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::{CacheArgs, CacheCleanArgs, CacheCommands};
use crate::GlobalOptions;
use extforge::sources::{CacheKeyResolver, KeyKind};
use extforge::util::fs::{list_subdirs, remove_dir_all_if_exists};
use extforge::util::Status;

pub fn execute(args: CacheArgs, global_opts: &GlobalOptions) -> Result<()> {
    match args.command {
        CacheCommands::Path => show_path(global_opts),
        CacheCommands::List => list_cache(global_opts),
        CacheCommands::Clean(clean_args) => clean_cache(clean_args, global_opts),
    }
}

/// Show cache directory path.
fn show_path(global_opts: &GlobalOptions) -> Result<()> {
    println!("{}", global_opts.cache_root().display());
    Ok(())
}

/// List committed entries per namespace.
fn list_cache(global_opts: &GlobalOptions) -> Result<()> {
    let resolver = CacheKeyResolver::new(global_opts.cache_root());

    println!("Cache directory: {}", resolver.root().display());

    for kind in KeyKind::all() {
        println!();
        println!("{}:", kind);

        let entries = committed_entries(&resolver.root().join(kind.as_str()), kind)?;
        if entries.is_empty() {
            println!("  (none)");
        }
        for (name, path) in entries {
            println!("  {} ({})", name, format_size(dir_size(&path)?));
        }
    }

    let partial = resolver.partial_root();
    if partial.is_dir() {
        println!();
        println!("partial: {}", format_size(dir_size(&partial)?));
    }

    Ok(())
}

/// Committed entries below a namespace directory, as display name and path.
///
/// Archive entries are one level deep. npm entries are `<name>/<version>`,
/// with scoped names taking one more level.
fn committed_entries(dir: &Path, kind: KeyKind) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();

    match kind {
        KeyKind::Archive => {
            for name in list_subdirs(dir)? {
                let path = dir.join(&name);
                entries.push((name, path));
            }
        }
        KeyKind::Npm => {
            let mut packages = Vec::new();
            for name in list_subdirs(dir)? {
                if name.starts_with('@') {
                    for scoped in list_subdirs(&dir.join(&name))? {
                        packages.push(format!("{}/{}", name, scoped));
                    }
                } else {
                    packages.push(name);
                }
            }
            for package in packages {
                let package_dir = dir.join(&package);
                for version in list_subdirs(&package_dir)? {
                    let path = package_dir.join(&version);
                    entries.push((format!("{}@{}", package, version), path));
                }
            }
        }
    }

    Ok(entries)
}

/// Clean cache.
fn clean_cache(args: CacheCleanArgs, global_opts: &GlobalOptions) -> Result<()> {
    let shell = &global_opts.shell;
    let resolver = CacheKeyResolver::new(global_opts.cache_root());

    let target = if args.partial {
        resolver.partial_root()
    } else {
        resolver.root().to_path_buf()
    };

    if target.exists() {
        remove_dir_all_if_exists(&target)?;
        shell.status(Status::Removed, target.display());
    } else {
        shell.note("Nothing to clean");
    }

    Ok(())
}

/// Calculate the total size of a directory recursively.
fn dir_size(path: &Path) -> Result<u64> {
    let mut size: u64 = 0;

    if path.is_file() {
        return Ok(fs::metadata(path).map(|m| m.len()).unwrap_or(0));
    }

    if !path.is_dir() {
        return Ok(0);
    }

    for entry in
        fs::read_dir(path).with_context(|| format!("failed to read: {}", path.display()))?
    {
        let path = entry?.path();

        if path.is_file() {
            size += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        } else if path.is_dir() {
            size += dir_size(&path)?;
        }
    }

    Ok(size)
}

/// Format a size in bytes to a human-readable string.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
