//! Manifest retrieval.
//!
//! The [`Fetcher`] resolves a validated [`ManifestSource`] to a [`Getter`]
//! registered for its scheme and retrieves exactly one file to a local
//! destination:
//!
//! - `file://` copies a local file
//! - `http://` and `https://` download with reqwest
//! - `s3://bucket/key` reads an object through the AWS SDK (`aws` feature)
//! - `git://host/repo.git//path/file` clones the repository and copies the file
//!
//! Any source may carry a `checksum=<algo>:<hex>` query parameter; it is
//! stripped before retrieval and verified against the retrieved file.
//!
//! After retrieval the destination must exist and be non-empty. There are no
//! retries: the first failure is returned.

mod checksum;
mod file;
mod git;
mod http;
#[cfg(feature = "aws")]
mod s3;

pub use checksum::{Checksum, ChecksumAlgorithm};
pub use file::FileGetter;
pub use git::{GitGetter, GitSource};
pub use http::HttpGetter;
#[cfg(feature = "aws")]
pub use s3::{S3Getter, S3Location};

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::config::{ManifestSource, Scheme};
use crate::process::{CommandRunner, ProcessError};

/// Where the Helmfile is written, relative to the working directory.
pub const MANIFEST_DESTINATION: &str = "./helmfile.yaml";

/// Errors produced while fetching a manifest.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The source could not be parsed as a URL.
    #[error("Invalid source URL '{url}': {source}")]
    InvalidUrl {
        /// Source as given
        url: String,
        /// Parse error
        #[source]
        source: url::ParseError,
    },

    /// The source is well-formed but cannot be used as given.
    #[error("Invalid source '{url}': {message}")]
    InvalidSource {
        /// Source as given
        url: String,
        /// Error message
        message: String,
    },

    /// No getter is registered for the scheme.
    #[error("No getter available for scheme '{0}'")]
    UnsupportedScheme(Scheme),

    /// HTTP request failed before a response was received.
    #[error("Request to '{url}' failed: {source}")]
    Http {
        /// Requested URL
        url: String,
        /// Client error
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status.
    #[error("HTTP {status} fetching '{url}'")]
    HttpStatus {
        /// Requested URL
        url: String,
        /// Status code
        status: u16,
    },

    /// S3 request failed.
    #[error("S3 fetch of '{url}' failed: {message}")]
    S3 {
        /// Requested object
        url: String,
        /// Error message
        message: String,
    },

    /// Git checkout failed.
    #[error("git clone of '{repository}' failed: {message}")]
    Git {
        /// Repository URL
        repository: String,
        /// Error message
        message: String,
    },

    /// An external tool needed by a getter could not be run.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Local filesystem operation failed during retrieval.
    #[error("IO error on '{path}': {source}")]
    Io {
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// Retrieval reported success but the destination is missing.
    #[error("Failed to stat downloaded file '{path}': {source}")]
    MissingArtifact {
        /// Destination path
        path: PathBuf,
        /// Stat error
        #[source]
        source: io::Error,
    },

    /// Retrieval reported success but the destination is empty.
    #[error("Downloaded file '{0}' is empty")]
    EmptyArtifact(PathBuf),

    /// The `checksum` query parameter is malformed.
    #[error("Invalid checksum '{0}': expected '<md5|sha1|sha256|sha512>:<hex digest>'")]
    InvalidChecksum(String),

    /// The retrieved file does not match the requested checksum.
    #[error("Checksum mismatch for '{path}': expected {algorithm}:{expected}, got {algorithm}:{actual}")]
    ChecksumMismatch {
        /// Destination path
        path: PathBuf,
        /// Digest algorithm
        algorithm: ChecksumAlgorithm,
        /// Requested digest
        expected: String,
        /// Digest of the retrieved file
        actual: String,
    },

    /// The caller cancelled the fetch.
    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the failure happened while talking to the source.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Http { .. }
                | FetchError::HttpStatus { .. }
                | FetchError::S3 { .. }
                | FetchError::Git { .. }
                | FetchError::Process(_)
                | FetchError::Io { .. }
        )
    }
}

/// A single-file retrieval request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Source with any fetcher-level query parameters removed
    pub source: Url,
    /// Local file to write
    pub destination: PathBuf,
}

/// Scheme-specific retrieval.
#[async_trait]
pub trait Getter: Send + Sync {
    /// Retrieve `request.source` into the file at `request.destination`,
    /// replacing any existing content.
    async fn get_file(&self, request: &Request) -> Result<(), FetchError>;
}

/// Dispatches fetches to the getter registered for each scheme.
#[derive(Clone)]
pub struct Fetcher {
    getters: HashMap<Scheme, Arc<dyn Getter>>,
}

impl Fetcher {
    /// Fetcher with the built-in getters for every supported scheme.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        let http: Arc<dyn Getter> = Arc::new(HttpGetter::new());

        let fetcher = Self::empty()
            .with_getter(Scheme::File, Arc::new(FileGetter::new()))
            .with_getter(Scheme::Http, Arc::clone(&http))
            .with_getter(Scheme::Https, http)
            .with_getter(Scheme::Git, Arc::new(GitGetter::new(runner)));

        #[cfg(feature = "aws")]
        let fetcher = fetcher.with_getter(Scheme::S3, Arc::new(S3Getter::new()));

        fetcher
    }

    /// Fetcher with no getters registered.
    pub fn empty() -> Self {
        Self {
            getters: HashMap::new(),
        }
    }

    /// Register (or replace) the getter for `scheme`.
    pub fn with_getter(mut self, scheme: Scheme, getter: Arc<dyn Getter>) -> Self {
        self.getters.insert(scheme, getter);
        self
    }

    /// Retrieve `source` to `destination` and return the artifact size.
    pub async fn fetch(
        &self,
        source: &ManifestSource,
        destination: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64, FetchError> {
        let mut url = Url::parse(source.as_str()).map_err(|e| FetchError::InvalidUrl {
            url: source.to_string(),
            source: e,
        })?;

        let checksum = take_query_param(&mut url, "checksum")
            .map(|value| value.parse::<Checksum>())
            .transpose()?;

        let getter = self
            .getters
            .get(&source.scheme())
            .ok_or(FetchError::UnsupportedScheme(source.scheme()))?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::io(parent, e))?;
        }

        let request = Request {
            source: url,
            destination: destination.to_path_buf(),
        };
        debug!(source = %request.source, destination = %destination.display(), "Fetching manifest");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            result = getter.get_file(&request) => result?,
        }

        let size = verify_artifact(destination).await?;

        if let Some(checksum) = checksum {
            checksum.verify(destination).await?;
            info!(algorithm = %checksum.algorithm(), "Manifest checksum verified");
        }

        Ok(size)
    }
}

/// Confirm the retrieved file exists and is not empty.
async fn verify_artifact(path: &Path) -> Result<u64, FetchError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| FetchError::MissingArtifact {
            path: path.to_path_buf(),
            source: e,
        })?;

    if metadata.len() == 0 {
        return Err(FetchError::EmptyArtifact(path.to_path_buf()));
    }

    Ok(metadata.len())
}

/// Remove `key` from the URL query and return its last value.
pub(crate) fn take_query_param(url: &mut Url, key: &str) -> Option<String> {
    let mut found = None;
    let remaining: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(k, v)| {
            if k == key {
                found = Some(v.into_owned());
                None
            } else {
                Some((k.into_owned(), v.into_owned()))
            }
        })
        .collect();

    if found.is_some() {
        if remaining.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(remaining);
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::LocalRunner;
    use tempfile::tempdir;

    struct WriteBytes(&'static [u8]);

    #[async_trait]
    impl Getter for WriteBytes {
        async fn get_file(&self, request: &Request) -> Result<(), FetchError> {
            tokio::fs::write(&request.destination, self.0)
                .await
                .map_err(|e| FetchError::io(&request.destination, e))
        }
    }

    struct Pending;

    #[async_trait]
    impl Getter for Pending {
        async fn get_file(&self, _request: &Request) -> Result<(), FetchError> {
            std::future::pending().await
        }
    }

    fn source(url: &str) -> ManifestSource {
        ManifestSource::parse(url).unwrap()
    }

    #[test]
    fn test_take_query_param() {
        let mut url = Url::parse("https://example.com/h.yaml?checksum=sha256:ab&x=1").unwrap();
        assert_eq!(take_query_param(&mut url, "checksum").as_deref(), Some("sha256:ab"));
        assert_eq!(url.as_str(), "https://example.com/h.yaml?x=1");

        let mut url = Url::parse("https://example.com/h.yaml?checksum=md5:00").unwrap();
        take_query_param(&mut url, "checksum");
        assert_eq!(url.as_str(), "https://example.com/h.yaml");

        let mut url = Url::parse("https://example.com/h.yaml?x=1").unwrap();
        assert_eq!(take_query_param(&mut url, "checksum"), None);
        assert_eq!(url.as_str(), "https://example.com/h.yaml?x=1");
    }

    #[tokio::test]
    async fn test_fetch_returns_size() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("nested/helmfile.yaml");
        let fetcher = Fetcher::empty().with_getter(Scheme::Https, Arc::new(WriteBytes(b"releases: []\n")));

        let size = fetcher
            .fetch(&source("https://example.com/h.yaml"), &dest, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(size, 13);
        assert!(dest.exists());
    }

    #[tokio::test]
    async fn test_empty_result_is_not_a_transport_error() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("helmfile.yaml");
        let fetcher = Fetcher::empty().with_getter(Scheme::Https, Arc::new(WriteBytes(b"")));

        let err = fetcher
            .fetch(&source("https://example.com/h.yaml"), &dest, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::EmptyArtifact(ref p) if p == &dest));
        assert!(!err.is_transport());
    }

    #[tokio::test]
    async fn test_unregistered_scheme() {
        let dir = tempdir().unwrap();
        let err = Fetcher::empty()
            .fetch(
                &source("s3://bucket/helmfile.yaml"),
                &dir.path().join("helmfile.yaml"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::UnsupportedScheme(Scheme::S3)));
    }

    #[tokio::test]
    async fn test_cancelled_fetch() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("helmfile.yaml");
        let fetcher = Fetcher::empty().with_getter(Scheme::Http, Arc::new(Pending));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = fetcher
            .fetch(&source("http://example.com/h.yaml"), &dest, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Cancelled));
    }

    #[tokio::test]
    async fn test_default_fetcher_registers_builtin_schemes() {
        let fetcher = Fetcher::new(Arc::new(LocalRunner::new()));
        for scheme in [Scheme::File, Scheme::Http, Scheme::Https, Scheme::Git] {
            assert!(fetcher.getters.contains_key(&scheme), "missing {}", scheme);
        }
        #[cfg(feature = "aws")]
        assert!(fetcher.getters.contains_key(&Scheme::S3));
    }

    #[tokio::test]
    async fn test_invalid_checksum_parameter() {
        let dir = tempdir().unwrap();
        let fetcher = Fetcher::empty().with_getter(Scheme::Https, Arc::new(WriteBytes(b"x")));

        let err = fetcher
            .fetch(
                &source("https://example.com/h.yaml?checksum=crc32:1234"),
                &dir.path().join("helmfile.yaml"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::InvalidChecksum(_)));
    }
}
