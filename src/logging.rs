//! Log output for binaries. The library itself only emits `tracing` events.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable overriding the log filter, e.g. `ORBIT_LOG=orbit=debug`.
pub const LOG_ENV: &str = "ORBIT_LOG";

/// Install a stderr subscriber. `default_filter` applies when `ORBIT_LOG` is
/// unset or invalid. Later calls are no-ops.
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| default_filter.into());

    // Fails only if a global subscriber is already set.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
