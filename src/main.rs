//! kubeinit - Kubernetes cluster bootstrap
//!
//! This is the main entry point for the kubeinit CLI.

mod cli;

use anyhow::Context;
use cli::Cli;
use kubeinit::bootstrap::Bootstrap;
use kubeinit::config::Config;
use kubeinit::logging;
use kubeinit::process::LocalRunner;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Held until main returns so buffered records are flushed on every path
    let _log_guard = match logging::init(cli.logging_options())
        .context("failed to initialize logging")
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("kubeinit: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(stage = e.stage(), error = %e, "kubeinit failed");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> kubeinit::Result<()> {
    let config = Config::load()?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    Bootstrap::new(Arc::new(LocalRunner::new()))
        .run(&config, &cancel)
        .await?;

    Ok(())
}
