//! Configuration module for kubeinit
//!
//! Configuration comes exclusively from three environment variables:
//! - `HELMFILE_FILE`: where to fetch the Helmfile from
//! - `CLOUD_PROVIDER`: which cloud the cluster lives in
//! - `CLUSTER_NAME`: the cluster to configure credentials for
//!
//! Variables are validated in that order and loading stops at the first
//! problem, so callers only ever see one error.

use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable holding the manifest source URL.
pub const HELMFILE_FILE_VAR: &str = "HELMFILE_FILE";

/// Environment variable holding the cloud provider tag.
pub const CLOUD_PROVIDER_VAR: &str = "CLOUD_PROVIDER";

/// Environment variable holding the cluster name.
pub const CLUSTER_NAME_VAR: &str = "CLUSTER_NAME";

static SOURCE_SCHEME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(file|https?|s3|git)://").expect("source scheme pattern is valid")
});

/// Errors produced while loading configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is unset (or empty, for the cluster name).
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    /// A variable is set but is not valid Unicode.
    #[error("{0} environment variable is not valid unicode")]
    NotUnicode(&'static str),

    /// The manifest source does not start with an accepted scheme.
    #[error("HELMFILE_FILE must start with file://, http://, https://, s3://, or git:// (got '{0}')")]
    InvalidSourceScheme(String),

    /// The provider tag is not one of the supported values.
    #[error("CLOUD_PROVIDER must be one of: aws, azure, gcp (got '{0}')")]
    UnsupportedProvider(String),
}

impl ConfigError {
    /// Name of the environment variable this error is about.
    pub fn variable(&self) -> &'static str {
        match self {
            ConfigError::Missing(var) | ConfigError::NotUnicode(var) => var,
            ConfigError::InvalidSourceScheme(_) => HELMFILE_FILE_VAR,
            ConfigError::UnsupportedProvider(_) => CLOUD_PROVIDER_VAR,
        }
    }
}

/// URL scheme of a manifest source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// Local file copy
    File,
    /// Plain HTTP download
    Http,
    /// HTTPS download
    Https,
    /// S3 object
    S3,
    /// File inside a git repository
    Git,
}

impl Scheme {
    /// Scheme name as it appears in a URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::File => "file",
            Scheme::Http => "http",
            Scheme::Https => "https",
            Scheme::S3 => "s3",
            Scheme::Git => "git",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A manifest source URL whose scheme has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSource {
    url: String,
    scheme: Scheme,
}

impl ManifestSource {
    /// Validate a source string.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let captures = SOURCE_SCHEME
            .captures(value)
            .ok_or_else(|| ConfigError::InvalidSourceScheme(value.to_string()))?;

        let scheme = match &captures[1] {
            "file" => Scheme::File,
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            "s3" => Scheme::S3,
            _ => Scheme::Git,
        };

        Ok(Self {
            url: value.to_string(),
            scheme,
        })
    }

    /// The source URL as given.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The validated scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Supported cloud providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudProvider {
    /// Amazon Web Services (EKS)
    Aws,
    /// Microsoft Azure (AKS)
    Azure,
    /// Google Cloud Platform (GKE)
    Gcp,
}

impl CloudProvider {
    /// All supported providers.
    pub const ALL: [CloudProvider; 3] = [CloudProvider::Aws, CloudProvider::Azure, CloudProvider::Gcp];

    /// Tag as read from `CLOUD_PROVIDER`.
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Azure => "azure",
            CloudProvider::Gcp => "gcp",
        }
    }

    /// Human-readable provider name for log messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "AWS",
            CloudProvider::Azure => "Azure",
            CloudProvider::Gcp => "GCP",
        }
    }
}

impl FromStr for CloudProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(CloudProvider::Aws),
            "azure" => Ok(CloudProvider::Azure),
            "gcp" => Ok(CloudProvider::Gcp),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, immutable bootstrap configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    manifest_source: ManifestSource,
    cloud_provider: CloudProvider,
    cluster_name: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env_vars(|key| match env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(()),
        })
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_env_vars(|key| Ok(lookup(key)))
    }

    fn from_env_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<Option<String>, ()>,
    {
        let read = |var: &'static str| -> Result<String, ConfigError> {
            lookup(var)
                .map_err(|_| ConfigError::NotUnicode(var))?
                .ok_or(ConfigError::Missing(var))
        };

        let manifest_source = ManifestSource::parse(&read(HELMFILE_FILE_VAR)?)?;
        let cloud_provider = read(CLOUD_PROVIDER_VAR)?.parse::<CloudProvider>()?;

        let cluster_name = read(CLUSTER_NAME_VAR)?;
        if cluster_name.is_empty() {
            return Err(ConfigError::Missing(CLUSTER_NAME_VAR));
        }

        Ok(Self {
            manifest_source,
            cloud_provider,
            cluster_name,
        })
    }

    /// Where the Helmfile is fetched from.
    pub fn manifest_source(&self) -> &ManifestSource {
        &self.manifest_source
    }

    /// Cloud provider hosting the cluster.
    pub fn cloud_provider(&self) -> CloudProvider {
        self.cloud_provider
    }

    /// Name of the target cluster.
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }
}
