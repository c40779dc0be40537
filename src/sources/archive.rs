//! Archive source - zip files downloaded by URL.

use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::core::DependencyDeclaration;
use crate::sources::{CacheError, Source};
use crate::util::hash::{digest_matches, sha256_bytes};
use crate::util::http::HttpClient;

/// Error while unpacking a zip archive.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("entry `{0}` escapes the destination directory")]
    UnsafePath(String),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A source for zip archives addressed by URL.
pub struct ArchiveSource {
    decl: DependencyDeclaration,
    url: String,
    sha256: Option<String>,
    http: Arc<dyn HttpClient>,
}

impl ArchiveSource {
    /// Create an archive source.
    pub fn new(url: impl Into<String>, sha256: Option<String>, http: Arc<dyn HttpClient>) -> Self {
        let url = url.into();
        let decl = DependencyDeclaration::Archive {
            url: url.clone(),
            sha256: sha256.clone(),
        };
        ArchiveSource {
            decl,
            url,
            sha256,
            http,
        }
    }

    /// Get the download URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download the archive body, verifying its digest if one is declared.
    fn download(&self) -> Result<Vec<u8>, CacheError> {
        tracing::info!("Downloading archive file: {}", self.url);

        let response = self.http.get(&self.url).map_err(|e| CacheError::Network {
            url: self.url.clone(),
            message: e.message,
        })?;

        if !response.is_success() {
            return Err(CacheError::Download {
                url: self.url.clone(),
                status: response.status,
            });
        }

        if let Some(expected) = &self.sha256 {
            let actual = sha256_bytes(&response.body);
            if !digest_matches(&actual, expected) {
                return Err(CacheError::ChecksumMismatch {
                    url: self.url.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
            tracing::debug!("Archive hash verified: {}", &actual[..16]);
        }

        Ok(response.body)
    }
}

impl Source for ArchiveSource {
    fn name(&self) -> &str {
        "archive"
    }

    fn declaration(&self) -> &DependencyDeclaration {
        &self.decl
    }

    fn fetch_and_layout(&self, dest: &Path) -> Result<(), CacheError> {
        let data = self.download()?;

        // `dest` is an empty staging directory, so entries land in their
        // final place.
        tracing::info!("Extracting archive ({} bytes)", data.len());
        extract_zip(&data, dest).map_err(|e| match e {
            ExtractError::Io { path, source } => CacheError::fs(path, source),
            other => CacheError::Archive {
                url: self.url.clone(),
                message: other.to_string(),
            },
        })
    }
}

/// Unpack a zip archive held in memory into `dest`.
///
/// Entries keep their full relative paths. Entries whose names would land
/// outside `dest` are rejected.
pub fn extract_zip(data: &[u8], dest: &Path) -> Result<(), ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ExtractError::Io { path, source }
    };

    fs::create_dir_all(dest).map_err(io_err(dest))?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;

        let relative = file
            .enclosed_name()
            .ok_or_else(|| ExtractError::UnsafePath(file.name().to_string()))?;
        let out_path = dest.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&out_path).map_err(io_err(&out_path))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let mut outfile = File::create(&out_path).map_err(io_err(&out_path))?;
        io::copy(&mut file, &mut outfile).map_err(|e| {
            // A read error here means the entry data is corrupt.
            if e.kind() == io::ErrorKind::InvalidData {
                ExtractError::Zip(zip::result::ZipError::Io(e))
            } else {
                ExtractError::Io {
                    path: out_path.clone(),
                    source: e,
                }
            }
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))
                    .map_err(io_err(&out_path))?;
            }
        }
    }

    Ok(())
}
