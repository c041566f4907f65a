//! # kubeinit - Kubernetes cluster bootstrap
//!
//! kubeinit prepares a freshly provisioned cluster for its workloads in one
//! sequential pass:
//!
//! 1. read `HELMFILE_FILE`, `CLOUD_PROVIDER` and `CLUSTER_NAME` from the
//!    environment,
//! 2. fetch the Helmfile to `./helmfile.yaml` (file, http(s), s3 or git),
//! 3. configure kubeconfig credentials for the cluster,
//! 4. run `helmfile -f ./helmfile.yaml apply`.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                 CLI (clap) + logging guard                 │
//! └───────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │                Bootstrap (strict sequence)                 │
//! └───────────────────────────────────────────────────────────┘
//!          │                   │                    │
//!          ▼                   ▼                    ▼
//! ┌─────────────────┐ ┌─────────────────┐ ┌─────────────────┐
//! │     Fetcher     │ │     Cluster     │ │   Deployment    │
//! │ (file/http/s3/  │ │  Configurator   │ │     Runner      │
//! │      git)       │ │  (aws eks ...)  │ │ (helmfile apply)│
//! └─────────────────┘ └─────────────────┘ └─────────────────┘
//!          │                   │                    │
//!          └───────────────────┼────────────────────┘
//!                              ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │              CommandRunner (child processes)               │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use kubeinit::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     Bootstrap::new(Arc::new(LocalRunner::new()))
//!         .run(&config, &CancellationToken::new())
//!         .await
//! }
//! ```

#![warn(clippy::all)]

// Re-export commonly used items in prelude
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::bootstrap::Bootstrap;
    pub use crate::cluster::{ClusterConfigurator, ConfigureError, CredentialStrategy};
    pub use crate::config::{CloudProvider, Config, ConfigError, ManifestSource, Scheme};
    pub use crate::deploy::{DeploymentRunner, RunError};
    pub use crate::error::{Error, Result};
    pub use crate::fetch::{FetchError, Fetcher, Getter, MANIFEST_DESTINATION};
    pub use crate::process::{CommandOutput, CommandRunner, CommandSpec, LocalRunner, ProcessError};
    pub use tokio_util::sync::CancellationToken;
}

/// Error types and result aliases.
pub mod error;

/// Environment-driven configuration.
pub mod config;

/// Structured logging setup and the flush-on-drop guard.
pub mod logging;

/// External command execution.
pub mod process;

/// Manifest retrieval for every supported source scheme.
pub mod fetch;

/// Cloud credential configuration.
pub mod cluster;

/// `helmfile apply`.
pub mod deploy;

/// The end-to-end bootstrap sequence.
pub mod bootstrap;

pub use error::{Error, Result};

/// Version of kubeinit
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
