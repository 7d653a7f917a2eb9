//! The poll cycle.

use crate::{
    CommandEvent, CommandEventKind, CycleReport, CycleStatus, Disposition, EntryError,
    EntryReport, EventJournal,
};
use chrono::Utc;
use command_decoder::{decode, Command};
use command_store::{CommandStore, Outcome, PendingEntry};
use handler_registry::{HandlerError, HandlerRegistry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, info_span, warn, Instrument};

/// How long a handler may run before its command is failed.
pub const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(5);

/// A handler still running after its command was failed for timing out.
struct Straggler {
    file_name: String,
    action: String,
    task: JoinHandle<Result<(), HandlerError>>,
}

/// Runs poll cycles over a [`CommandStore`] using a frozen [`HandlerRegistry`].
///
/// Cheap to share behind an `Arc`; concurrent [`run_cycle`](Self::run_cycle)
/// calls do not overlap. After a handler times out, the rest of that cycle's
/// commands stay in the inbox and later cycles are skipped until the handler
/// returns, so no two handlers ever run at once.
pub struct Dispatcher {
    store: CommandStore,
    registry: Arc<HandlerRegistry>,
    journal: Option<EventJournal>,
    handler_timeout: Duration,
    cycle_lock: Mutex<Option<Straggler>>,
    cycles: AtomicU64,
}

impl Dispatcher {
    pub fn new(store: CommandStore, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            store,
            registry,
            journal: None,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
            cycle_lock: Mutex::new(None),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Record one [`CommandEvent`] per attempted command.
    pub fn with_journal(mut self, journal: EventJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn store(&self) -> &CommandStore {
        &self.store
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn handler_timeout(&self) -> Duration {
        self.handler_timeout
    }

    /// Number of cycles that actually ran (skipped calls excluded).
    pub fn cycles_run(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Whether a timed-out handler is still running. Reads false while a
    /// cycle is in progress.
    pub fn handler_outstanding(&self) -> bool {
        match self.cycle_lock.try_lock() {
            Ok(straggler) => straggler
                .as_ref()
                .is_some_and(|straggler| !straggler.task.is_finished()),
            Err(_) => false,
        }
    }

    /// Run one poll cycle: attempt every pending command in name order.
    ///
    /// Never fails. Per-command failures end up in the report's entries; a
    /// store failure while listing ends up in [`CycleStatus::Aborted`]. The
    /// report is [`CycleStatus::Skipped`] while another cycle or a timed-out
    /// handler is still running.
    pub async fn run_cycle(&self) -> CycleReport {
        let started_at = Utc::now();
        let Ok(mut straggler) = self.cycle_lock.try_lock() else {
            debug!("Poll cycle already in progress, skipping");
            return CycleReport::new(CycleStatus::Skipped, started_at);
        };
        if !self.reap(&mut straggler).await {
            return CycleReport::new(CycleStatus::Skipped, started_at);
        }

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        self.run_locked(started_at, &mut straggler)
            .instrument(info_span!("poll_cycle", cycle))
            .await
    }

    /// Collect a finished straggler. Returns false if it is still running.
    async fn reap(&self, slot: &mut Option<Straggler>) -> bool {
        let straggler = match slot.take() {
            None => return true,
            Some(straggler) if !straggler.task.is_finished() => {
                debug!(
                    file = %straggler.file_name,
                    action = %straggler.action,
                    "Timed-out handler still running, skipping cycle"
                );
                *slot = Some(straggler);
                return false;
            }
            Some(straggler) => straggler,
        };

        let result = match straggler.task.await {
            Ok(result) => result,
            Err(join_err) => Err(join_failure(join_err)),
        };
        match &result {
            Ok(()) => warn!(
                file = %straggler.file_name,
                action = %straggler.action,
                "Timed-out handler finished after its command was failed; its effect was applied"
            ),
            Err(err) => info!(
                file = %straggler.file_name,
                action = %straggler.action,
                error = %err,
                "Timed-out handler finished with an error"
            ),
        }

        let mut event = CommandEvent::new(
            CommandEventKind::HandlerFinishedLate,
            &straggler.file_name,
        );
        event.action = Some(straggler.action);
        event.error = result.err().map(|err| err.to_string());
        self.record(&event);
        true
    }

    async fn run_locked(
        &self,
        started_at: chrono::DateTime<Utc>,
        straggler: &mut Option<Straggler>,
    ) -> CycleReport {
        let clock = Instant::now();

        let pending = match self
            .store
            .ensure_layout()
            .and_then(|()| self.store.list_pending())
        {
            Ok(pending) => pending,
            Err(err) => {
                error!(error = %err, "Poll cycle aborted");
                let mut report = CycleReport::new(CycleStatus::Aborted(err), started_at);
                report.elapsed = clock.elapsed();
                return report;
            }
        };

        let mut report = CycleReport::new(CycleStatus::Completed, started_at);
        for (index, entry) in pending.iter().enumerate() {
            report.entries.push(self.process_entry(entry, straggler).await);
            if straggler.is_some() {
                warn!(
                    file = %entry.name(),
                    remaining = pending.len() - index - 1,
                    "Handler timed out, leaving remaining commands for a later cycle"
                );
                break;
            }
        }
        report.elapsed = clock.elapsed();

        if report.entries.is_empty() {
            debug!("No pending commands");
        } else {
            info!(
                processed = report.processed(),
                failed = report.failed(),
                stranded = report.stranded(),
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Poll cycle finished"
            );
        }
        report
    }

    async fn process_entry(
        &self,
        entry: &PendingEntry,
        straggler: &mut Option<Straggler>,
    ) -> EntryReport {
        let file_name = entry.name();

        let (action, result) = match self.load(entry) {
            Ok(command) => {
                let action = command.action.clone();
                let result = self.execute(file_name, command, straggler).await;
                (Some(action), result)
            }
            Err(err) => (None, Err(err)),
        };

        let outcome = match &result {
            Ok(()) => Outcome::Success,
            Err(err) => {
                warn!(
                    file = %file_name,
                    action = action.as_deref().unwrap_or("-"),
                    stage = err.stage(),
                    error = %err,
                    "Command failed"
                );
                Outcome::Failure
            }
        };

        let (disposition, relocation_error) = match self.store.archive(entry, outcome) {
            Ok(_) => {
                if outcome == Outcome::Success {
                    info!(
                        file = %file_name,
                        action = action.as_deref().unwrap_or("-"),
                        "Command processed"
                    );
                    (Disposition::Processed, None)
                } else {
                    (Disposition::Failed, None)
                }
            }
            Err(err) => {
                error!(
                    file = %file_name,
                    intended = outcome.as_str(),
                    error = %err,
                    "Could not archive command, leaving it in the inbox"
                );
                (Disposition::Stranded { intended: outcome }, Some(err))
            }
        };

        let report = EntryReport {
            file_name: file_name.to_string(),
            action,
            disposition,
            error: result.err(),
            relocation_error,
        };
        self.journal(&report);
        report
    }

    fn load(&self, entry: &PendingEntry) -> Result<Command, EntryError> {
        let bytes = self.store.read(entry).map_err(EntryError::Read)?;
        Ok(decode(&bytes)?)
    }

    /// Run the handler for `command`. On timeout the still-running task is
    /// parked in `straggler`.
    async fn execute(
        &self,
        file_name: &str,
        command: Command,
        straggler: &mut Option<Straggler>,
    ) -> Result<(), EntryError> {
        let handler = self.registry.resolve(&command.action)?;

        let action = command.action.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            handler.handle(&command.params, &command.target)
        });
        match tokio::time::timeout(self.handler_timeout, &mut task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join_err)) => Err(join_failure(join_err).into()),
            Err(_) => {
                *straggler = Some(Straggler {
                    file_name: file_name.to_string(),
                    action,
                    task,
                });
                Err(HandlerError::TimedOut(self.handler_timeout).into())
            }
        }
    }

    fn journal(&self, report: &EntryReport) {
        let kind = match report.disposition {
            Disposition::Processed => CommandEventKind::CommandProcessed,
            Disposition::Failed => CommandEventKind::CommandFailed,
            Disposition::Stranded { .. } => CommandEventKind::CommandStranded,
        };
        let mut event = CommandEvent::new(kind, &report.file_name);
        event.action = report.action.clone();
        event.error = match &report.relocation_error {
            Some(err) => Some(err.to_string()),
            None => report.error.as_ref().map(ToString::to_string),
        };
        self.record(&event);
    }

    fn record(&self, event: &CommandEvent) {
        let Some(journal) = &self.journal else {
            return;
        };
        if let Err(err) = journal.record(event) {
            warn!(
                path = %journal.path().display(),
                error = %err,
                "Failed to write command event"
            );
        }
    }
}

fn join_failure(err: JoinError) -> HandlerError {
    if !err.is_panic() {
        return HandlerError::Failed(format!("handler task cancelled: {}", err));
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    HandlerError::Panicked(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use handler_registry::{Params, Target};
    use tempfile::tempdir;

    fn dispatcher(root: &std::path::Path, registry: HandlerRegistry) -> Dispatcher {
        Dispatcher::new(CommandStore::from_root(root), Arc::new(registry))
    }

    #[tokio::test]
    async fn empty_inbox_completes_with_no_entries() {
        let dir = tempdir().unwrap();
        let dispatcher = dispatcher(dir.path(), HandlerRegistry::builder().build());

        let report = dispatcher.run_cycle().await;

        assert!(report.is_completed());
        assert!(report.entries.is_empty());
        assert!(dir.path().join("commands").is_dir());
        assert_eq!(dispatcher.cycles_run(), 1);
    }

    #[tokio::test]
    async fn overlapping_cycle_is_skipped() {
        let dir = tempdir().unwrap();
        let dispatcher = dispatcher(dir.path(), HandlerRegistry::builder().build());

        let _held = dispatcher.cycle_lock.lock().await;
        let report = dispatcher.run_cycle().await;

        assert!(report.is_skipped());
        assert_eq!(dispatcher.cycles_run(), 0);
    }

    #[tokio::test]
    async fn panic_payload_is_captured() {
        let dir = tempdir().unwrap();
        let registry = HandlerRegistry::builder()
            .register_fn("boom", |_: &Params, _: &Target| panic!("kaboom"))
            .build();
        let dispatcher = dispatcher(dir.path(), registry);

        let mut straggler = None;
        let err = dispatcher
            .execute("boom.json", Command::new("boom"), &mut straggler)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EntryError::Handler(HandlerError::Panicked(ref msg)) if msg == "kaboom"
        ));
        assert!(straggler.is_none());
    }

    #[tokio::test]
    async fn timed_out_task_is_parked_until_it_finishes() {
        let dir = tempdir().unwrap();
        let registry = HandlerRegistry::builder()
            .register_fn("sleepy", |_: &Params, _: &Target| {
                std::thread::sleep(Duration::from_millis(150));
                Ok(())
            })
            .build();
        let dispatcher =
            dispatcher(dir.path(), registry).with_handler_timeout(Duration::from_millis(20));

        let mut straggler = None;
        let err = dispatcher
            .execute("sleepy.json", Command::new("sleepy"), &mut straggler)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EntryError::Handler(HandlerError::TimedOut(_))
        ));
        assert_eq!(straggler.as_ref().unwrap().file_name, "sleepy.json");

        // Parked in the dispatcher, it blocks the next cycle.
        *dispatcher.cycle_lock.lock().await = straggler;
        assert!(dispatcher.handler_outstanding());
        assert!(dispatcher.run_cycle().await.is_skipped());
        assert_eq!(dispatcher.cycles_run(), 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!dispatcher.handler_outstanding());
        assert!(dispatcher.run_cycle().await.is_completed());
        assert!(dispatcher.cycle_lock.lock().await.is_none());
    }

    #[tokio::test]
    async fn defaults() {
        let dir = tempdir().unwrap();
        let dispatcher = dispatcher(dir.path(), HandlerRegistry::builder().build());
        assert_eq!(dispatcher.handler_timeout(), DEFAULT_HANDLER_TIMEOUT);
        assert!(dispatcher.registry().is_empty());
        assert_eq!(dispatcher.store().inbox_dir(), dir.path().join("commands"));
    }
}
