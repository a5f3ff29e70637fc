use tracing_subscriber::EnvFilter;

/// Console logging on stderr; stdout is reserved for responses.
///
/// Defaults to `info`, overridable with `RUST_LOG`.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();
}
