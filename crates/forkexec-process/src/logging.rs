//! Logging setup.

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG`, falling back
/// to `debug` or `info`.
///
/// Returns `false` when a global subscriber was already installed, so test
/// binaries can call this from every test.
pub fn init_logging(debug: bool) -> bool {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_thread_ids(true)
        .try_init()
        .is_ok()
}
