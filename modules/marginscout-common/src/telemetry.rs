use tracing_subscriber::EnvFilter;

/// Initialize tracing for pipeline binaries and long-running jobs.
/// Respects RUST_LOG; defaults to info for this workspace.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("marginscout=info")),
        )
        .init();
}
