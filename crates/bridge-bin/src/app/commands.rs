//! One-shot CLI commands.

use super::lifecycle::{is_process_alive, read_pid_file, PidGuard};
use super::runtime::{command_store, BridgeRuntime};
use crate::error::BridgeResult;
use crate::file_host::FileHost;
use bridge_config_and_utils::{Config, Paths};
use poll_dispatcher::{CycleReport, CycleStatus, Disposition, EventJournal};
use std::sync::Arc;

const RECENT_EVENTS: usize = 5;

/// Run a single poll cycle and print what happened.
pub async fn run_once(config: Config, paths: Paths) -> BridgeResult<()> {
    paths.ensure_dirs()?;
    // Refuses to run alongside a live bridge that polls the same inbox.
    let _pid_guard = PidGuard::acquire(&paths.pid_file())?;

    let host = Arc::new(FileHost::open(paths.host_state_file())?);
    let runtime = BridgeRuntime::build(&config, &paths, host)?;
    let report = runtime.run_once().await;

    print!("{}", summarize(&report));
    Ok(())
}

/// Print whether the bridge is running and the inbox / archive counts.
pub fn check_status(config: &Config, paths: &Paths) -> BridgeResult<()> {
    match read_pid_file(&paths.pid_file())? {
        Some(pid) if is_process_alive(pid) => println!("Bridge is running (pid {})", pid),
        Some(pid) => println!("Bridge is not running (stale pid file for {})", pid),
        None => println!("Bridge is not running"),
    }

    let store = command_store(config, paths);
    let counts = store.counts()?;
    println!("  Inbox:     {}", store.inbox_dir().display());
    println!("  Pending:   {}", counts.pending);
    println!("  Processed: {}", counts.processed);
    println!("  Failed:    {}", counts.failed);

    if config.journal_enabled {
        let events = EventJournal::new(paths.journal_file()).recent(RECENT_EVENTS)?;
        if !events.is_empty() {
            println!("  Recent:");
            for event in events {
                println!(
                    "    {} {:?} {}{}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.kind,
                    event.file_name,
                    event
                        .error
                        .map(|err| format!(" ({})", err))
                        .unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

/// Move `file_name` from `failed/` back into the inbox.
pub fn requeue_command(config: &Config, paths: &Paths, file_name: &str) -> BridgeResult<()> {
    let entry = command_store(config, paths).requeue(file_name)?;
    println!("Requeued {}", entry.name());
    Ok(())
}

fn summarize(report: &CycleReport) -> String {
    let mut out = String::new();
    match &report.status {
        CycleStatus::Skipped => out.push_str("Cycle skipped: another cycle is running\n"),
        CycleStatus::Aborted(err) => out.push_str(&format!("Cycle aborted: {}\n", err)),
        CycleStatus::Completed if report.entries.is_empty() => {
            out.push_str("No pending commands\n")
        }
        CycleStatus::Completed => {
            for entry in &report.entries {
                let disposition = match entry.disposition {
                    Disposition::Processed => "processed",
                    Disposition::Failed => "failed",
                    Disposition::Stranded { .. } => "stranded",
                };
                out.push_str(&format!(
                    "  {:<10} {} [{}]",
                    disposition,
                    entry.file_name,
                    entry.action.as_deref().unwrap_or("-")
                ));
                if let Some(err) = &entry.error {
                    out.push_str(&format!(": {}", err));
                }
                if let Some(err) = &entry.relocation_error {
                    out.push_str(&format!(" (not archived: {})", err));
                }
                out.push('\n');
            }
            out.push_str(&format!(
                "{} processed, {} failed, {} stranded in {} ms\n",
                report.processed(),
                report.failed(),
                report.stranded(),
                report.elapsed.as_millis()
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn run_once_applies_commands_to_host_state_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let config = Config::default();
        std::fs::create_dir_all(paths.inbox_dir()).unwrap();
        std::fs::write(
            paths.inbox_dir().join("cmd_1.json"),
            r#"{"action":"add_funds","params":{"amount":100}}"#,
        )
        .unwrap();

        run_once(config, paths.clone()).await.unwrap();

        let state = FileHost::open(paths.host_state_file()).unwrap().snapshot();
        assert_eq!(state.household_funds, Some(100));
        assert!(paths.processed_dir().join("cmd_1.json").exists());
        assert!(!paths.pid_file().exists());
    }

    #[test]
    fn requeue_moves_failed_file_back() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let config = Config::default();
        let store = command_store(&config, &paths);
        store.ensure_layout().unwrap();
        std::fs::write(paths.failed_dir().join("002.json"), "{}").unwrap();

        requeue_command(&config, &paths, "002.json").unwrap();

        assert!(paths.inbox_dir().join("002.json").exists());
        assert!(requeue_command(&config, &paths, "002.json").is_err());
    }

    #[test]
    fn status_works_on_empty_base_dir() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("fresh"));
        check_status(&Config::default(), &paths).unwrap();
    }

    #[tokio::test]
    async fn summary_lists_each_entry() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        let host = Arc::new(handler_registry::InMemoryHost::default());
        let runtime = BridgeRuntime::build(&Config::default(), &paths, host).unwrap();
        std::fs::write(paths.inbox_dir().join("001.json"), r#"{"action":"noop"}"#).unwrap();
        std::fs::write(paths.inbox_dir().join("002.json"), r#"{"action":"dance"}"#).unwrap();

        let summary = summarize(&runtime.run_once().await);

        assert!(summary.contains("processed  001.json [noop]"));
        assert!(summary.contains("failed     002.json [dance]: Unknown action: dance"));
        assert!(summary.contains("1 processed, 1 failed, 0 stranded"));
        assert_eq!(summarize(&runtime.run_once().await), "No pending commands\n");
    }
}
