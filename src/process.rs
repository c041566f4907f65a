//! Local process execution
//!
//! Every external tool kubeinit drives (`aws`, `git`, `helmfile`) goes
//! through the [`CommandRunner`] trait. Commands are a program plus a discrete
//! argument list; nothing is passed through a shell.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::io;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, trace};

/// Errors raised while running an external command.
///
/// A command that runs and exits non-zero is not an error here; see
/// [`CommandOutput::success`].
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be found on `PATH`.
    #[error("'{program}' not found in PATH")]
    NotFound {
        /// Program name
        program: String,
    },

    /// The program was found but could not be started.
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Waiting for the program or reading its output failed.
    #[error("Failed to wait for '{program}': {source}")]
    Wait {
        /// Program name
        program: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
}

/// A program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Create a command for the given program with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program to run.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, in order.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (-1 when the process was terminated by a signal).
    pub exit_code: i32,
    /// Standard output and standard error, interleaved in arrival order.
    pub output: Vec<u8>,
    /// Convenience flag: `true` if the process exited successfully.
    pub success: bool,
}

impl CommandOutput {
    /// Create a successful command result
    pub fn success(output: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code: 0,
            output: output.into(),
            success: true,
        }
    }

    /// Create a failed command result
    pub fn failure(exit_code: i32, output: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            output: output.into(),
            success: false,
        }
    }

    /// Captured output decoded lossily as UTF-8.
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Runs external commands to completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command`, blocking the caller until it exits.
    async fn run(&self, command: CommandSpec) -> Result<CommandOutput, ProcessError>;
}

/// Runs commands as child processes of the current host.
#[derive(Debug, Clone, Default)]
pub struct LocalRunner;

impl LocalRunner {
    /// Create a new local runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for LocalRunner {
    async fn run(&self, command: CommandSpec) -> Result<CommandOutput, ProcessError> {
        let program = command.program().to_string();
        debug!(command = %command, "Executing local command");

        let resolved = which::which(&program).map_err(|_| ProcessError::NotFound {
            program: program.clone(),
        })?;

        let mut child = Command::new(&resolved)
            .args(command.arguments())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.clone(),
                source,
            })?;

        let buffer = Mutex::new(Vec::new());
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let (stdout_result, stderr_result, status) = tokio::join!(
            drain(stdout, &buffer),
            drain(stderr, &buffer),
            child.wait()
        );

        let wait_error = |source| ProcessError::Wait {
            program: program.clone(),
            source,
        };
        stdout_result.map_err(wait_error)?;
        stderr_result.map_err(wait_error)?;
        let status = status.map_err(wait_error)?;

        let output = buffer.into_inner();
        let exit_code = status.code().unwrap_or(-1);
        trace!(exit_code = %exit_code, output_len = %output.len(), "Command completed");

        if status.success() {
            Ok(CommandOutput::success(output))
        } else {
            Ok(CommandOutput::failure(exit_code, output))
        }
    }
}

/// Copy everything from `reader` into the shared buffer.
async fn drain<R>(reader: Option<R>, buffer: &Mutex<Vec<u8>>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok(());
    };

    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buffer.lock().extend_from_slice(&chunk[..n]);
    }
}
