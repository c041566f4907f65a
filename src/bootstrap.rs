//! The bootstrap sequence.
//!
//! ```text
//! Config ──▶ fetch manifest ──▶ configure cluster ──▶ helmfile apply
//! ```
//!
//! Stages run strictly in order and the first failure ends the run. Nothing
//! done by an earlier stage is rolled back.
//!
//! Cancelling the token aborts whichever stage is running; a child process
//! started by that stage is killed when its future is dropped.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cluster::ClusterConfigurator;
use crate::config::Config;
use crate::deploy::DeploymentRunner;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, MANIFEST_DESTINATION};
use crate::process::CommandRunner;

/// Wires the fetcher, cluster configurator and deployment runner together.
#[derive(Clone)]
pub struct Bootstrap {
    fetcher: Fetcher,
    configurator: ClusterConfigurator,
    deployer: DeploymentRunner,
    destination: PathBuf,
}

impl Bootstrap {
    /// Bootstrap running every external command through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            fetcher: Fetcher::new(Arc::clone(&runner)),
            configurator: ClusterConfigurator::new(Arc::clone(&runner)),
            deployer: DeploymentRunner::new(runner),
            destination: PathBuf::from(MANIFEST_DESTINATION),
        }
    }

    /// Write the manifest somewhere other than `./helmfile.yaml`.
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Replace the fetcher.
    pub fn with_fetcher(mut self, fetcher: Fetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Where the manifest is written.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Run every stage for `config`.
    pub async fn run(&self, config: &Config, cancel: &CancellationToken) -> Result<()> {
        info!(
            source = %config.manifest_source(),
            provider = %config.cloud_provider(),
            cluster = config.cluster_name(),
            "kubeinit started"
        );

        let bytes = until_cancelled(
            cancel,
            "download manifest",
            self.fetcher.fetch(config.manifest_source(), &self.destination, cancel),
        )
        .await?;
        info!(
            destination = %self.destination.display(),
            bytes,
            "Helmfile downloaded successfully"
        );

        until_cancelled(
            cancel,
            "configure cluster",
            self.configurator.configure(config.cloud_provider(), config.cluster_name()),
        )
        .await?;
        info!(cluster = config.cluster_name(), "Kubernetes cluster configured successfully");

        until_cancelled(cancel, "apply manifest", self.deployer.run(&self.destination)).await?;
        info!(cluster = config.cluster_name(), "Helmfile applied");

        Ok(())
    }
}

/// Run one stage, giving up as soon as `cancel` fires.
async fn until_cancelled<T, E, F>(
    cancel: &CancellationToken,
    stage: &'static str,
    stage_future: F,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    Error: From<E>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(stage, "Stage interrupted");
            Err(Error::Interrupted { stage })
        }
        result = stage_future => Ok(result?),
    }
}
