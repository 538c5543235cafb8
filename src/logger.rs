//! Logging setup for the binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job. Logs go to stderr so reports on stdout stay pipeable.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::registry::Registry;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::AppError;

/// Install the global subscriber.
///
/// `directive` is an `EnvFilter` directive such as `warn`, `debug` or
/// `fitscan::fit::profile=trace`.
pub fn setup_log(directive: &str) -> Result<(), AppError> {
    let env_filter = EnvFilter::try_new(directive)
        .map_err(|e| AppError::new(2, format!("Invalid log level '{directive}': {e}")))?;

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_timer(CompactTimestamp);

    Registry::default()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| AppError::new(2, format!("Failed to install logger: {e}")))?;

    tracing::debug!("Logging is configured with level: {directive}");
    Ok(())
}

#[derive(Clone)]
struct CompactTimestamp;

impl FormatTime for CompactTimestamp {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S"))
    }
}
