#![forbid(unsafe_code)]

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Installs the stderr subscriber once; later calls are no-ops.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
