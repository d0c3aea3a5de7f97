//! Broker log output.
//!
//! `main` calls [`init`] once with `logging.level` from the loaded
//! settings (`ROUTEMQ_LOGGING__LEVEL` overrides it). Unknown level names
//! fall back to `info`.

/// Install the fmt subscriber at `level`. A second call is a no-op, which
/// keeps tests that share a process from fighting over the global.
pub fn init(level: &str) {
    let installed = tracing_subscriber::fmt()
        .with_max_level(parse_level(level))
        .with_target(false)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!(level, "logging initialised");
    }
}

pub(crate) fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "error" => tracing::Level::ERROR,
        "warn" | "warning" => tracing::Level::WARN,
        "debug" => tracing::Level::DEBUG,
        "trace" => tracing::Level::TRACE,
        _ => tracing::Level::INFO,
    }
}
