use tracing_subscriber::EnvFilter;

/// Installs a global `fmt` subscriber filtered by the `RUST_LOG` environment variable. Returns
/// `false` if another global subscriber was already installed.
pub fn install_tracing_logger() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .is_ok()
}
