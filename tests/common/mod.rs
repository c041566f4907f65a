//! Shared test utilities and fixtures for the kubeinit test suite.
//!
//! This module provides:
//! - A scripted [`CommandRunner`] that records invocations
//! - Thread-local log capture
//! - Environment lookups built from literal pairs
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::subscriber::DefaultGuard;

use kubeinit::process::{CommandOutput, CommandRunner, CommandSpec, ProcessError};

// ============================================================================
// Mock Runner
// ============================================================================

/// Command runner returning canned results per program.
pub struct MockRunner {
    commands_executed: RwLock<Vec<String>>,
    results: RwLock<HashMap<String, CommandOutput>>,
    default_result: RwLock<CommandOutput>,
    never_exits: RwLock<Vec<String>>,
}

impl MockRunner {
    /// Create a runner where every command succeeds with no output.
    pub fn new() -> Self {
        Self {
            commands_executed: RwLock::new(Vec::new()),
            results: RwLock::new(HashMap::new()),
            default_result: RwLock::new(CommandOutput::success(Vec::new())),
            never_exits: RwLock::new(Vec::new()),
        }
    }

    /// Make every invocation of `program` run forever.
    pub fn set_never_exits(&self, program: impl Into<String>) {
        self.never_exits.write().push(program.into());
    }

    /// Set the result for every invocation of `program`.
    pub fn set_result(&self, program: impl Into<String>, result: CommandOutput) {
        self.results.write().insert(program.into(), result);
    }

    /// Get all commands that were executed, rendered as command lines.
    pub fn get_commands(&self) -> Vec<String> {
        self.commands_executed.read().clone()
    }

    /// Number of commands executed.
    pub fn command_count(&self) -> usize {
        self.commands_executed.read().len()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, command: CommandSpec) -> Result<CommandOutput, ProcessError> {
        self.commands_executed.write().push(command.to_string());
        let hangs = self
            .never_exits
            .read()
            .iter()
            .any(|p| p == command.program());
        if hangs {
            std::future::pending::<()>().await;
        }

        let result = self
            .results
            .read()
            .get(command.program())
            .cloned()
            .unwrap_or_else(|| self.default_result.read().clone());
        Ok(result)
    }
}

/// Wrap a mock runner for use by the library while keeping a handle to it.
pub fn shared(runner: MockRunner) -> (Arc<MockRunner>, Arc<dyn CommandRunner>) {
    let runner = Arc::new(runner);
    let dyn_runner: Arc<dyn CommandRunner> = runner.clone();
    (runner, dyn_runner)
}

// ============================================================================
// Log Capture
// ============================================================================

/// In-memory buffer collecting formatted log records.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture every record emitted on this thread until the guard drops.
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

// ============================================================================
// Environment
// ============================================================================

/// Lookup function over literal key/value pairs.
pub fn env_lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}
