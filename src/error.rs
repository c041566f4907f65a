//! Error types for kubeinit.
//!
//! Each stage of the bootstrap owns its error type; this module aggregates
//! them into the single [`Error`] surfaced by [`crate::bootstrap::Bootstrap`].

use thiserror::Error;

use crate::cluster::ConfigureError;
use crate::config::ConfigError;
use crate::deploy::RunError;
use crate::fetch::FetchError;

/// Result type alias for kubeinit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for kubeinit.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid environment input.
    #[error("Failed to load config: {0}")]
    Config(#[from] ConfigError),

    /// Manifest retrieval failed or produced no usable file.
    #[error("Failed to download Helmfile: {0}")]
    Fetch(#[from] FetchError),

    /// Cloud credential configuration failed.
    #[error("Failed to configure cluster: {0}")]
    Configure(#[from] ConfigureError),

    /// The deployment tool failed.
    #[error("Failed to apply Helmfile: {0}")]
    Deploy(#[from] RunError),

    /// The run was cancelled (Ctrl-C) while a stage was in progress.
    #[error("Interrupted while trying to {stage}")]
    Interrupted {
        /// Stage that was running
        stage: &'static str,
    },
}

impl Error {
    /// Short label of the bootstrap stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            Error::Config(_) => "load config",
            Error::Fetch(_) => "download manifest",
            Error::Configure(_) => "configure cluster",
            Error::Deploy(_) => "apply manifest",
            Error::Interrupted { stage } => stage,
        }
    }

    /// Returns the error code for CLI exit status.
    ///
    /// Stage failures exit 1; an interrupt exits 130 (128 + SIGINT).
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Interrupted { .. } => 130,
            _ => 1,
        }
    }

    /// Returns true if the run was cancelled rather than failing.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted { .. })
    }
}
