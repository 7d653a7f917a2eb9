//! Application wiring and lifecycle management.

mod commands;
mod init;
mod lifecycle;
mod runtime;

pub use commands::{check_status, requeue_command, run_once};
pub use init::run_bridge;
