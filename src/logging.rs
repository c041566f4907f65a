//! Structured logging using the tracing crate.
//!
//! Records go to a buffered stderr sink. [`init`] hands back a
//! [`LoggingGuard`] that flushes the sink when dropped, so the guard must live
//! until the very end of `main`.

use clap::ValueEnum;
use parking_lot::Mutex;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per record
    #[default]
    Json,
    /// Single-line human-readable records
    Compact,
    /// Multi-line human-readable records
    Pretty,
}

/// Shared, buffered log destination.
#[derive(Clone)]
pub struct LogSink {
    inner: Arc<Mutex<BufWriter<Box<dyn Write + Send>>>>,
}

impl LogSink {
    /// Sink writing to standard error.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Sink writing to an arbitrary destination.
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufWriter::new(Box::new(writer)))),
        }
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Flushes buffered log records when dropped.
#[must_use = "dropping the guard flushes and stops buffering log output"]
pub struct LoggingGuard {
    sink: LogSink,
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        let _ = self.sink.flush();
    }
}

/// Logging settings derived from the command line.
#[derive(Debug, Clone, Copy)]
pub struct LoggingOptions {
    /// Output format
    pub format: LogFormat,
    /// Verbosity level (0 = info, 1 = debug, 2+ = trace)
    pub verbosity: u8,
    /// Emit ANSI colors (human-readable formats only)
    pub ansi: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            verbosity: 0,
            ansi: false,
        }
    }
}

impl LoggingOptions {
    fn build_filter(&self) -> EnvFilter {
        let default_filter = match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };

        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
    }

    fn build_layer(&self, sink: LogSink) -> Box<dyn Layer<Registry> + Send + Sync> {
        match self.format {
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(sink)
                .boxed(),
            LogFormat::Compact => tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(self.ansi)
                .with_target(self.verbosity >= 2)
                .with_writer(sink)
                .boxed(),
            LogFormat::Pretty => tracing_subscriber::fmt::layer()
                .pretty()
                .with_ansi(self.ansi)
                .with_target(self.verbosity >= 2)
                .with_writer(sink)
                .boxed(),
        }
    }
}

/// Install the global subscriber writing to `sink`.
pub fn init_with_sink(options: LoggingOptions, sink: LogSink) -> Result<LoggingGuard, TryInitError> {
    tracing_subscriber::registry()
        .with(options.build_layer(sink.clone()))
        .with(options.build_filter())
        .try_init()?;

    Ok(LoggingGuard { sink })
}

/// Install the global subscriber writing to stderr.
pub fn init(options: LoggingOptions) -> Result<LoggingGuard, TryInitError> {
    init_with_sink(options, LogSink::stderr())
}
