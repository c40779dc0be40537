//! Localization resource generation.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::util::fs::{read_to_string, write_string};

/// Name of the message catalogue files.
pub const MESSAGES_FILE_NAME: &str = "messages.json";

/// Prefix added to every message key.
pub const KEY_PREFIX: &str = "loc.messages.";

/// Path of the generated resources file for a catalogue directory.
pub fn resjson_path(dir: &Path) -> PathBuf {
    dir.join("Strings")
        .join("resources.resjson")
        .join("en-US")
        .join("resources.resjson")
}

/// Convert a messages catalogue into resjson entries.
///
/// Returns `None` if the catalogue has no `messages` object.
pub fn to_resources(messages_json: &str) -> Result<Option<Map<String, Value>>> {
    let doc: Value = serde_json::from_str(messages_json).context("invalid messages file")?;

    let Some(messages) = doc.get("messages").and_then(Value::as_object) else {
        return Ok(None);
    };

    let resources = messages
        .iter()
        .map(|(key, value)| (format!("{}{}", KEY_PREFIX, key), value.clone()))
        .collect();
    Ok(Some(resources))
}

/// Write a resjson file next to every `messages.json` below `extensions_dir`.
///
/// Returns the files written, in path order.
pub fn generate_loc(extensions_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if !extensions_dir.is_dir() {
        return Ok(written);
    }

    for entry in WalkDir::new(extensions_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", extensions_dir.display()))?;
        if !entry.file_type().is_file() || entry.file_name() != MESSAGES_FILE_NAME {
            continue;
        }

        let path = entry.path();
        tracing::info!("Generating resjson for {}", path.display());

        let contents = read_to_string(path)?;
        let Some(resources) =
            to_resources(&contents).with_context(|| format!("failed to read {}", path.display()))?
        else {
            tracing::debug!("{} has no messages", path.display());
            continue;
        };

        let dir = path.parent().unwrap_or(extensions_dir);
        let out = resjson_path(dir);
        write_string(&out, &serde_json::to_string_pretty(&resources)?)?;
        written.push(out);
    }

    Ok(written)
}
