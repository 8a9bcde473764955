use tracing_subscriber::EnvFilter;

/// Installs a compact fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Returns false if a global
/// subscriber was already installed, in which case nothing changes.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init()
        .is_ok()
}
