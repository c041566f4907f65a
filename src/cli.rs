//! CLI module for kubeinit
//!
//! Only logging is configured from the command line; the bootstrap itself
//! reads its inputs from the environment.

use clap::Parser;
use kubeinit::logging::{LogFormat, LoggingOptions};

/// kubeinit - fetch a Helmfile, configure cluster credentials, apply it
///
/// Reads HELMFILE_FILE, CLOUD_PROVIDER (aws, azure, gcp) and CLUSTER_NAME
/// from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "kubeinit")]
#[command(author = "Kubeinit Contributors")]
#[command(version)]
#[command(about = "Bootstrap a Kubernetes cluster from a Helmfile", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json, env = "KUBEINIT_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-2)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(2)
    }

    /// Logging settings for this invocation.
    pub fn logging_options(&self) -> LoggingOptions {
        LoggingOptions {
            format: self.log_format,
            verbosity: self.verbosity(),
            ansi: !self.no_color && std::env::var_os("NO_COLOR").is_none(),
        }
    }
}
