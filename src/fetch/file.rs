//! `file://` sources.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

use super::{FetchError, Getter, Request};

/// Copies a local file to the destination.
#[derive(Debug, Clone, Default)]
pub struct FileGetter;

impl FileGetter {
    /// Create a new file getter
    pub fn new() -> Self {
        Self
    }

    /// Local path named by a `file://` URL.
    ///
    /// `file:///abs/path` is absolute. A non-empty host other than
    /// `localhost` is read as the first component of a relative path, so
    /// `file://manifests/helmfile.yaml` means `manifests/helmfile.yaml`.
    pub fn local_path(url: &Url) -> Result<PathBuf, FetchError> {
        if let Ok(path) = url.to_file_path() {
            return Ok(path);
        }

        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(PathBuf::from(format!("{}{}", host, url.path()))),
            _ => Err(FetchError::InvalidSource {
                url: url.to_string(),
                message: "not a usable file path".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Getter for FileGetter {
    async fn get_file(&self, request: &Request) -> Result<(), FetchError> {
        let src = Self::local_path(&request.source)?;

        let metadata = tokio::fs::metadata(&src)
            .await
            .map_err(|e| FetchError::io(&src, e))?;
        if metadata.is_dir() {
            return Err(FetchError::InvalidSource {
                url: request.source.to_string(),
                message: "source is a directory, expected a single file".to_string(),
            });
        }

        // Copying a file onto itself would truncate it.
        if let (Ok(a), Ok(b)) = (
            tokio::fs::canonicalize(&src).await,
            tokio::fs::canonicalize(&request.destination).await,
        ) {
            if a == b {
                debug!(path = %src.display(), "Source is already at the destination");
                return Ok(());
            }
        }

        tokio::fs::copy(&src, &request.destination)
            .await
            .map_err(|e| FetchError::io(&src, e))?;

        Ok(())
    }
}
