//! Logging initialization for the bridge.
//!
//! Thin wrapper over the observability crate: JSONL to
//! `<base>/logs/bridge.jsonl`, plus stderr when running in the foreground.

use crate::Paths;

/// Install the global tracing subscriber.
///
/// `level` is used when `RUST_LOG` is not set.
pub fn init_logging(paths: &Paths, level: &str, also_stderr: bool) {
    observability::init_with_config(observability::LogConfig {
        service_name: "moddata-bridge".into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        log_path: Some(paths.log_file()),
        file_output: true,
        also_stderr,
    });
}

/// Parse a log level string into a tracing Level. Unknown values map to INFO.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
