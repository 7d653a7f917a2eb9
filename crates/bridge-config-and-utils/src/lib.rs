//! Configuration, filesystem paths and logging setup for the moddata bridge.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_HANDLER_TIMEOUT_MS, DEFAULT_LOG_LEVEL, DEFAULT_PAYLOAD_EXTENSION,
    DEFAULT_POLL_INTERVAL_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
