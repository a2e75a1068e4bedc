//! Logging initialization and configuration.
//!
//! Observer side-channel output (stderr lines, realtime stdout lines) is
//! emitted through `tracing`, so installing a subscriber is what makes it
//! visible.

use std::io;

use tracing::Subscriber;
use tracing_subscriber::fmt::format::{Compact, DefaultFields, Format};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "script_glue=info";

/// Formatting layer shared by every initializer. Stdout is left to the
/// caller's records.
type StderrLayer<S> = fmt::Layer<S, DefaultFields, Format<Compact>, fn() -> io::Stderr>;

fn stderr_layer<S>() -> StderrLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .compact()
        .with_writer(io::stderr as fn() -> io::Stderr)
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize the logging system.
///
/// Uses the `RUST_LOG` environment variable for filtering. If not set,
/// defaults to `script_glue=info`. Logs are written to stderr.
///
/// # Panics
///
/// Panics if called more than once, or if another tracing subscriber
/// has already been set.
pub fn init() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(stderr_layer())
        .init();
}

/// Try to initialize the logging system.
///
/// Returns `Ok(())` if successful, or `Err` if logging has already been
/// initialized.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(stderr_layer())
        .try_init()
}

/// Try to initialize logging with an explicit filter such as `debug` or
/// `script_glue=trace`.
///
/// A bare level applies to this crate only. Unparseable filters fall back
/// to the default.
pub fn init_with_filter(filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let directive = if filter.contains('=') || filter.contains(',') {
        filter.to_string()
    } else {
        format!("script_glue={}", filter)
    };
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_init_idempotent() {
        // First call may or may not succeed depending on test order
        let _ = try_init();
        let _ = try_init();
        let _ = init_with_filter("debug");
    }

    #[test]
    fn test_stderr_layer_stacks_on_filters() {
        // Each initializer stacks the same layer; builds without installing
        let _ = tracing_subscriber::registry()
            .with(default_filter())
            .with(stderr_layer());
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new(DEFAULT_FILTER))
            .with(stderr_layer());

        let writer: fn() -> io::Stderr = io::stderr;
        let _: StderrLayer<tracing_subscriber::Registry> =
            fmt::layer().compact().with_writer(writer);
    }

    #[test]
    fn test_logging_works() {
        let _ = try_init();

        tracing::info!("test info message");
        tracing::warn!(stream = "stderr", "test warn message");
        tracing::error!("test error message");
    }
}
