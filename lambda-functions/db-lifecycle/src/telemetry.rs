use tracing_subscriber::EnvFilter;

/// JSON logs for CloudWatch. Verbosity comes from `RUST_LOG`, then `LOG_LEVEL`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("LOG_LEVEL"))
        .unwrap_or_else(|_| EnvFilter::new("error"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();
}
