//! Logging and (optional) profiling setup
//!
//! Logs go to stderr through a `tracing-subscriber` fmt layer filtered by `RUST_LOG`. With the
//! `profiling` feature a `tracing-chrome` layer additionally records every profiling scope to a
//! Chrome trace file, flushed when the returned guard is dropped.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Keeps the trace file open until dropped
pub struct LoggingGuard {
    #[cfg(feature = "profiling")]
    _chrome: tracing_chrome::FlushGuard,
}

/// Filter used when `RUST_LOG` is not set
fn default_directives(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Install the global subscriber
pub fn setup_logging(verbose: bool) -> LoggingGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter);

    #[cfg(feature = "profiling")]
    {
        let (chrome_layer, guard) = tracing_chrome::ChromeLayerBuilder::new().build();
        tracing_subscriber::registry()
            .with(chrome_layer)
            .with(fmt_layer)
            .init();
        tracing::info!("Logging initialized (chrome trace enabled)");
        LoggingGuard { _chrome: guard }
    }

    #[cfg(not(feature = "profiling"))]
    {
        tracing_subscriber::registry().with(fmt_layer).init();
        LoggingGuard {}
    }
}
