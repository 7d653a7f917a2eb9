//! # Observability
//!
//! Logging layer shared by the moddata bridge binaries.
//!
//! Crates in the workspace only ever use `tracing` macros. The binary calls
//! [`init_with_config`] once at startup, which installs:
//!
//! - a JSONL layer appending one object per event to
//!   `~/.moddata-bridge/logs/bridge.jsonl` (or [`LogConfig::log_path`]);
//! - an optional compact stderr layer for foreground runs.
//!
//! Both layers honour `RUST_LOG`, falling back to [`LogConfig::default_level`].
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "bridge".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod json_layer;
mod writer;

use std::io;
use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use json_layer::{JsonLayer, LogEntry};
pub use writer::{AppendLogWriter, WriterFactory};

/// Directory under the home directory used when no log path is configured.
const DEFAULT_BASE_DIR_NAME: &str = ".moddata-bridge";
/// File name of the central JSONL log.
pub const DEFAULT_LOG_FILE_NAME: &str = "bridge.jsonl";

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, written into every JSONL line.
    pub service_name: String,

    /// Default filter directive when `RUST_LOG` is unset (e.g. "info").
    pub default_level: String,

    /// JSONL file location. `None` uses `~/.moddata-bridge/logs/bridge.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Write JSONL to the log file.
    pub file_output: bool,

    /// Also emit compact human-readable lines to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            file_output: true,
            also_stderr: false,
        }
    }
}

/// Initialize logging with custom configuration.
///
/// Installing a second global subscriber is a no-op. If the log file cannot
/// be opened the file layer is dropped and stderr output is forced on.
pub fn init_with_config(config: LogConfig) {
    let log_path = config.log_path.clone().or_else(default_log_path);

    let (json_layer, open_error) = match (&log_path, config.file_output) {
        (Some(path), true) => match AppendLogWriter::new(path) {
            Ok(writer) => (
                Some(JsonLayer::new(
                    config.service_name.clone(),
                    WriterFactory::new(writer),
                )),
                None,
            ),
            Err(err) => (None, Some(err)),
        },
        _ => (None, None),
    };

    let stderr_layer = if config.also_stderr || open_error.is_some() {
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_writer(io::stderr),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(json_layer.map(|l| l.with_filter(env_filter(&config.default_level))))
        .with(stderr_layer.map(|l| l.with_filter(env_filter(&config.default_level))))
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    match (open_error, log_path) {
        (Some(err), Some(path)) => tracing::warn!(
            log_path = %path.display(),
            error = %err,
            "failed to open log file; logging to stderr only"
        ),
        (None, Some(path)) if config.file_output => tracing::debug!(
            log_path = %path.display(),
            service = %config.service_name,
            "observability initialized"
        ),
        _ => {}
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(DEFAULT_BASE_DIR_NAME)
            .join("logs")
            .join(DEFAULT_LOG_FILE_NAME)
    })
}
