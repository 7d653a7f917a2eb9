//! Foreground bridge process.

use super::lifecycle::PidGuard;
use super::runtime::BridgeRuntime;
use crate::error::BridgeResult;
use crate::file_host::FileHost;
use bridge_config_and_utils::{Config, Paths};
use std::sync::Arc;
use tracing::info;

/// Run the bridge until Ctrl-C.
pub async fn run_bridge(config: Config, paths: Paths) -> BridgeResult<()> {
    paths.ensure_dirs()?;
    let pid_guard = PidGuard::acquire(&paths.pid_file())?;

    info!(
        pid = pid_guard.pid(),
        base_dir = %paths.base_dir().display(),
        interval_secs = config.poll_interval_secs,
        handler_timeout_ms = config.handler_timeout_ms,
        "Starting moddata bridge"
    );

    let host = Arc::new(FileHost::open(paths.host_state_file())?);
    info!(path = %host.path().display(), "Host state loaded");
    let mut runtime = BridgeRuntime::build(&config, &paths, host)?;
    runtime.start()?;

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, exiting...");

    if runtime.is_running() {
        runtime.shutdown().await;
    }
    Ok(())
}
