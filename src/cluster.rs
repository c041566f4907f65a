//! Cloud credential configuration for the target cluster.
//!
//! Each provider maps to a [`CredentialStrategy`]. Only AWS runs a real
//! command today (`aws eks update-kubeconfig`); Azure and GCP are accepted
//! but only announce that support is missing.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::CloudProvider;
use crate::process::{CommandRunner, CommandSpec, ProcessError};

/// Errors raised while configuring cluster credentials.
#[derive(Error, Debug)]
pub enum ConfigureError {
    /// The credential command could not be run.
    #[error("Failed to run credential command for {provider}: {source}")]
    Process {
        /// Provider being configured
        provider: CloudProvider,
        /// Underlying process error
        #[source]
        source: ProcessError,
    },

    /// The credential command exited non-zero.
    #[error("'{command}' exited with code {exit_code}: {output}")]
    CommandFailed {
        /// Provider being configured
        provider: CloudProvider,
        /// Command line that failed
        command: String,
        /// Exit code
        exit_code: i32,
        /// Combined output of the command
        output: String,
    },
}

/// How credentials are obtained for a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStrategy {
    /// Run a CLI command that writes the kubeconfig
    Command(CommandSpec),
    /// Provider is accepted but credential setup is not implemented yet
    NotYetImplemented,
}

impl CredentialStrategy {
    /// Strategy for `provider` and `cluster_name`.
    pub fn for_provider(provider: CloudProvider, cluster_name: &str) -> Self {
        match provider {
            CloudProvider::Aws => CredentialStrategy::Command(
                CommandSpec::new("aws").args(["eks", "update-kubeconfig", "--name", cluster_name]),
            ),
            CloudProvider::Azure => CredentialStrategy::NotYetImplemented,
            CloudProvider::Gcp => CredentialStrategy::NotYetImplemented,
        }
    }
}

/// Configures local kubeconfig credentials for a cluster.
#[derive(Clone)]
pub struct ClusterConfigurator {
    runner: Arc<dyn CommandRunner>,
}

impl ClusterConfigurator {
    /// Create a configurator that runs provider CLIs through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Configure credentials for `cluster_name` on `provider`.
    pub async fn configure(
        &self,
        provider: CloudProvider,
        cluster_name: &str,
    ) -> Result<(), ConfigureError> {
        info!(
            cluster = cluster_name,
            provider = %provider,
            "Configuring {} cluster",
            provider.display_name()
        );

        let command = match CredentialStrategy::for_provider(provider, cluster_name) {
            CredentialStrategy::Command(command) => command,
            CredentialStrategy::NotYetImplemented => {
                warn!(
                    provider = %provider,
                    "{} support is not implemented yet",
                    provider.display_name()
                );
                return Ok(());
            }
        };

        let rendered = command.to_string();
        let output = self
            .runner
            .run(command)
            .await
            .map_err(|source| ConfigureError::Process { provider, source })?;

        if !output.success {
            return Err(ConfigureError::CommandFailed {
                provider,
                command: rendered,
                exit_code: output.exit_code,
                output: output.output_lossy().trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::test_support;
    use crate::process::{CommandOutput, MockCommandRunner};

    #[test]
    fn test_strategies() {
        assert_eq!(
            CredentialStrategy::for_provider(CloudProvider::Aws, "demo"),
            CredentialStrategy::Command(
                CommandSpec::new("aws").args(["eks", "update-kubeconfig", "--name", "demo"])
            )
        );
        assert_eq!(
            CredentialStrategy::for_provider(CloudProvider::Azure, "demo"),
            CredentialStrategy::NotYetImplemented
        );
        assert_eq!(
            CredentialStrategy::for_provider(CloudProvider::Gcp, "demo"),
            CredentialStrategy::NotYetImplemented
        );
    }

    #[tokio::test]
    async fn test_aws_runs_update_kubeconfig() {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|cmd| cmd.to_string() == "aws eks update-kubeconfig --name demo")
            .times(1)
            .returning(|_| Ok(CommandOutput::success(b"Added new context".to_vec())));

        ClusterConfigurator::new(Arc::new(runner))
            .configure(CloudProvider::Aws, "demo")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_aws_failure_is_surfaced() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|_| {
            Ok(CommandOutput::failure(
                254,
                b"An error occurred (ResourceNotFoundException)\n".to_vec(),
            ))
        });

        let err = ClusterConfigurator::new(Arc::new(runner))
            .configure(CloudProvider::Aws, "missing")
            .await
            .unwrap_err();

        match err {
            ConfigureError::CommandFailed {
                provider,
                command,
                exit_code,
                output,
            } => {
                assert_eq!(provider, CloudProvider::Aws);
                assert_eq!(command, "aws eks update-kubeconfig --name missing");
                assert_eq!(exit_code, 254);
                assert_eq!(output, "An error occurred (ResourceNotFoundException)");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_aws_cli_missing() {
        let mut runner = MockCommandRunner::new();
        runner.expect_run().times(1).returning(|_| {
            Err(ProcessError::NotFound {
                program: "aws".into(),
            })
        });

        let err = ClusterConfigurator::new(Arc::new(runner))
            .configure(CloudProvider::Aws, "demo")
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigureError::Process { .. }));
    }

    #[tokio::test]
    async fn test_unimplemented_providers_warn_without_running_commands() {
        for provider in [CloudProvider::Azure, CloudProvider::Gcp] {
            let (logs, _guard) = test_support::capture();
            // No expectations: any call panics.
            let runner = MockCommandRunner::new();

            ClusterConfigurator::new(Arc::new(runner))
                .configure(provider, "demo")
                .await
                .unwrap();

            let info = logs.lines_at(" INFO ");
            let warn = logs.lines_at(" WARN ");
            assert_eq!(info.len(), 1);
            assert!(info[0].contains(&format!("Configuring {} cluster", provider.display_name())));
            assert_eq!(warn.len(), 1);
            assert!(warn[0].contains(&format!(
                "{} support is not implemented yet",
                provider.display_name()
            )));
        }
    }
}
