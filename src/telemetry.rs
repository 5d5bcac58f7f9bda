//! Telemetry utilities: subscriber setup, span constructors and command timing.

use std::time::Instant;

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. `json` switches
/// the formatter to one JSON object per line for supervisor log ingestion.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Guard for timing command execution.
///
/// Logs command latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        debug!(command = %self.command, elapsed_ms, "command finished");
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for one chat session attempt.
    pub fn session(server: &str, attempt: u32) -> Span {
        info_span!("session", server = %server, attempt = attempt)
    }

    /// Create a span for a command execution.
    pub fn command(token: &str, target: &str) -> Span {
        info_span!("command", token = %token, target = %target)
    }

    /// Create a span for the bridge listener.
    pub fn bridge(port: u16) -> Span {
        info_span!("bridge", port = port)
    }
}
