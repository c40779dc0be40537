//! Dependency cache error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Error while resolving or caching an external dependency.
///
/// Every variant is fatal to the single fetch that produced it. Nothing in
/// the cache retries; retry policy belongs to whoever drives the fetches.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("invalid dependency declaration: {message}")]
    InvalidDeclaration { message: String },

    #[error("failed to download {url}: HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("invalid archive from {url}: {message}")]
    Archive { url: String, message: String },

    #[error("checksum mismatch for {url}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("`{tool}` not found in PATH")]
    ToolNotFound { tool: String, min_version: String },

    #[error("`{tool}` version {found} is too old (requires >= {required})")]
    ToolVersionTooOld {
        tool: String,
        found: String,
        required: String,
    },

    #[error("`{command}` failed with exit code {code:?}")]
    Install {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    /// Shorthand for an `InvalidDeclaration` error.
    pub fn invalid(message: impl Into<String>) -> Self {
        CacheError::InvalidDeclaration {
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the path it happened at.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            CacheError::InvalidDeclaration { message } => {
                Diagnostic::error(format!("invalid dependency declaration: {}", message))
                    .with_suggestion(suggestions::CHECK_EXTERNALS)
            }

            CacheError::Download { url, status } => {
                Diagnostic::error(format!("failed to download `{}`", url))
                    .with_context(format!("server responded with HTTP {}", status))
                    .with_suggestion(suggestions::FETCH_FAILED)
            }

            CacheError::Network { url, message } => {
                Diagnostic::error(format!("failed to download `{}`", url))
                    .with_context(message.clone())
                    .with_suggestion(suggestions::FETCH_FAILED)
                    .with_suggestion(suggestions::NET_TIMEOUT)
            }

            CacheError::Archive { url, message } => {
                Diagnostic::error(format!("`{}` is not a valid zip archive", url))
                    .with_context(message.clone())
                    .with_suggestion(suggestions::CHECK_EXTERNALS)
            }

            CacheError::ChecksumMismatch {
                url,
                expected,
                actual,
            } => Diagnostic::error(format!("checksum mismatch for `{}`", url))
                .with_context(format!("expected: {}", expected))
                .with_context(format!("actual:   {}", actual))
                .with_suggestion(
                    "Update the `sha256` field in externals.json if the artifact changed upstream",
                ),

            CacheError::ToolNotFound { tool, min_version } => {
                Diagnostic::error(format!("`{}` not found", tool))
                    .with_suggestion(format!(
                        "Install {} {} or newer and make sure it is on PATH",
                        tool, min_version
                    ))
                    .with_suggestion(suggestions::TOOL_OVERRIDE)
            }

            CacheError::ToolVersionTooOld {
                tool,
                found,
                required,
            } => Diagnostic::error(format!("`{}` is too old", tool))
                .with_context(format!("found {}, requires >= {}", found, required))
                .with_suggestion(format!("Upgrade {} to {} or newer", tool, required)),

            CacheError::Install {
                command,
                code,
                stderr,
            } => {
                let mut diag = Diagnostic::error(format!("`{}` failed", command))
                    .with_context(format!("exit code: {:?}", code));
                for line in stderr.lines().filter(|l| !l.trim().is_empty()).take(10) {
                    diag = diag.with_context(line.to_string());
                }
                diag.with_suggestion(suggestions::PARTIAL_LEFT)
            }

            CacheError::Filesystem { path, source } => {
                Diagnostic::error(format!("filesystem error: {}", source))
                    .with_location(path.clone())
                    .with_suggestion(suggestions::CACHE_CLEAN)
            }
        }
    }
}
