//! `tracing` initialization for binaries and integration tests.

/// Install a global `tracing_subscriber` if one isn't already installed.
///
/// Uses `try_init` so calling this more than once (e.g. across integration
/// test binaries) never panics.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sona=info")),
        )
        .try_init();
}
