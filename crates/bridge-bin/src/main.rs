//! Moddata bridge - polls a directory inbox for JSON commands and executes
//! them against the host.

mod app;
mod error;
mod file_host;

use std::path::PathBuf;

use bridge_config_and_utils::{init_logging, Config, Paths};
use clap::{Parser, Subcommand};

/// Moddata bridge command-line interface.
#[derive(Parser)]
#[command(name = "moddata-bridge")]
#[command(about = "File-based command bridge: executes JSON commands dropped into an inbox")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Defaults to the configured level.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for the inbox, archives, logs and config. Defaults to ~/.moddata-bridge
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the inbox until interrupted
    Start,
    /// Run a single poll cycle and exit
    RunOnce,
    /// Show pending, processed and failed counts
    Status,
    /// Move a failed command back into the inbox
    Requeue {
        /// File name of the command in the failed directory
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let config = Config::load(&paths)?;

    let command = cli.command.unwrap_or(Commands::Start);
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(&paths, level, matches!(command, Commands::Start));

    match command {
        Commands::Start => app::run_bridge(config, paths).await?,
        Commands::RunOnce => app::run_once(config, paths).await?,
        Commands::Status => app::check_status(&config, &paths)?,
        Commands::Requeue { file } => app::requeue_command(&config, &paths, &file)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_start() {
        let cli = Cli::parse_from(["moddata-bridge"]);
        assert!(cli.command.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "moddata-bridge",
            "requeue",
            "002.json",
            "--base-dir",
            "/tmp/bridge",
            "-l",
            "debug",
        ]);
        assert!(matches!(cli.command, Some(Commands::Requeue { ref file }) if file == "002.json"));
        assert_eq!(cli.base_dir, Some(PathBuf::from("/tmp/bridge")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn run_once_uses_kebab_case() {
        let cli = Cli::parse_from(["moddata-bridge", "run-once"]);
        assert!(matches!(cli.command, Some(Commands::RunOnce)));
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
