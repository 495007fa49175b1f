//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Default filter directive when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVE: &str = "pv_feasibility=info";

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`.
///
/// Logs go to stderr so the report printed on stdout stays machine-readable.
/// Calling this twice is harmless: the second install is ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
