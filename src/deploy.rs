//! Helmfile deployment.

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};

/// Errors raised while applying the manifest.
#[derive(Error, Debug)]
pub enum RunError {
    /// The deployment tool could not be run.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// The deployment tool exited non-zero.
    #[error("'{command}' exited with code {exit_code}")]
    Failed {
        /// Command line that failed
        command: String,
        /// Exit code
        exit_code: i32,
        /// Combined output of the command
        output: String,
    },
}

/// Runs `helmfile apply` against a manifest.
#[derive(Clone)]
pub struct DeploymentRunner {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl DeploymentRunner {
    /// Create a deployment runner using `helmfile` from `PATH`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            program: "helmfile".to_string(),
        }
    }

    /// The command that applies `manifest`.
    pub fn command(&self, manifest: &Path) -> CommandSpec {
        CommandSpec::new(self.program.as_str())
            .arg("-f")
            .arg(manifest.to_string_lossy())
            .arg("apply")
    }

    /// Apply `manifest`, logging the combined output of the tool.
    pub async fn run(&self, manifest: &Path) -> Result<CommandOutput, RunError> {
        let command = self.command(manifest);
        let rendered = command.to_string();

        let output = self.runner.run(command).await?;
        let text = output.output_lossy();

        if !output.success {
            error!(command = %rendered, exit_code = output.exit_code, output = ?text, "command failed");
            return Err(RunError::Failed {
                command: rendered,
                exit_code: output.exit_code,
                output: text,
            });
        }

        info!(output = ?text, "command output");
        Ok(output)
    }
}
