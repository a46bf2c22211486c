//! Logging initialisation

use tracing_subscriber::EnvFilter;

/// Initialise the global subscriber. `RUST_LOG` wins; otherwise the crates
/// of this workspace log at info.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
