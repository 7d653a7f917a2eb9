//! Process-wide bridge state and the startup routine.

use crate::error::BridgeResult;
use bridge_config_and_utils::{Config, Paths};
use command_store::CommandStore;
use handler_registry::{register_builtins, HandlerRegistry, HostPort};
use poll_dispatcher::{CycleReport, Dispatcher, EventJournal};
use poll_scheduler::PollScheduler;
use std::sync::Arc;
use tracing::{info, warn};

/// The command store described by `config` under `paths`.
pub fn command_store(config: &Config, paths: &Paths) -> CommandStore {
    CommandStore::new(paths.inbox_dir(), paths.processed_dir(), paths.failed_dir())
        .with_extension(&config.payload_extension)
}

/// Owns the dispatcher (and with it the registry) plus the poll timer.
///
/// Built once per process. [`start`](Self::start) may be called again, for
/// example after a reload; it re-arms the timer without rebuilding anything.
pub struct BridgeRuntime {
    dispatcher: Arc<Dispatcher>,
    scheduler: PollScheduler,
}

impl BridgeRuntime {
    /// Build the store, registry and dispatcher. Does not start polling.
    pub fn build(config: &Config, paths: &Paths, host: Arc<dyn HostPort>) -> BridgeResult<Self> {
        let store = command_store(config, paths);
        store.ensure_layout()?;

        let registry = register_builtins(HandlerRegistry::builder(), host).build();
        info!(actions = ?registry.actions(), "Handler registry built");

        let mut dispatcher = Dispatcher::new(store, Arc::new(registry))
            .with_handler_timeout(config.handler_timeout());
        if config.journal_enabled {
            dispatcher = dispatcher.with_journal(EventJournal::new(paths.journal_file()));
        }

        Ok(Self {
            dispatcher: Arc::new(dispatcher),
            scheduler: PollScheduler::new(config.poll_interval()),
        })
    }

    /// Ensure the directory layout and arm the poll timer.
    ///
    /// Safe to call repeatedly: existing directories are kept and any timer
    /// armed by an earlier call is cancelled first.
    pub fn start(&mut self) -> BridgeResult<()> {
        self.dispatcher.store().ensure_layout()?;

        let dispatcher = self.dispatcher.clone();
        self.scheduler.arm(move || {
            let dispatcher = dispatcher.clone();
            async move {
                dispatcher.run_cycle().await;
            }
        })?;

        info!(
            inbox = %self.dispatcher.store().inbox_dir().display(),
            interval_secs = self.scheduler.period().as_secs(),
            "Bridge started"
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_armed()
    }

    /// Run one cycle now, outside the timer.
    pub async fn run_once(&self) -> CycleReport {
        self.dispatcher.run_cycle().await
    }

    #[cfg(test)]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Cancel the timer and wait for an in-flight cycle to finish.
    pub async fn shutdown(&mut self) {
        self.scheduler.shutdown().await;
        if self.dispatcher.handler_outstanding() {
            warn!("A timed-out handler is still running; exit waits for it to return");
        }
        info!(cycles = self.dispatcher.cycles_run(), "Bridge stopped");
    }
}
