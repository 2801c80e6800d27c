//! Process-wide logger setup.

/// Initialize `env_logger` with an `info` default; `RUST_LOG` overrides it.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
