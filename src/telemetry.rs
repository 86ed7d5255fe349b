//! Console logging setup.

use tracing_subscriber::EnvFilter;

/// Installs a console subscriber honoring `RUST_LOG`, defaulting to `info`.
///
/// Safe to call more than once; only the first installation wins. Library
/// code never calls this; it is for binaries and test harnesses that want
/// the event stream and instrumentation on stderr.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
