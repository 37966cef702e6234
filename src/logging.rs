use env_logger::{Builder, Env};

/// Logs go to stderr; stdout carries the signal stream.
pub fn init() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}
