//! Log output for the binary.
//!
//! Library crates log through `log`; the subscriber's `tracing-log` bridge
//! picks those records up alongside native `tracing` events.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,warden=debug";

/// The filter from `RUST_LOG`, or [`DEFAULT_FILTER`].
pub fn filter_from(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. `verbose` forces debug output everywhere.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        filter_from(std::env::var("RUST_LOG").ok().as_deref())
    };
    // A second init (as in tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
