//! Standard tracing subscriber setup for CLI binaries.

/// Initialize a tracing subscriber with env-based filtering.
///
/// Default directive: `flowctx=info`. Targets match by prefix, so this
/// covers every `flowctx_*` crate as well.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("flowctx=info".parse().unwrap_or_default());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
