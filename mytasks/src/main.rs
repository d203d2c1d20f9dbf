//! `MyTasks`: personal task manager shell.
//!
//! Reads commands from stdin and prints plain lines. Configuration via CLI
//! flags, environment variables, or config file
//! (`~/.config/mytasks/config.toml`).
//!
//! ```bash
//! # Persist the login state in the default data directory
//! cargo run --bin mytasks
//!
//! # Keep everything in memory
//! cargo run --bin mytasks -- --ephemeral
//!
//! # Or via environment variables
//! MYTASKS_SETTINGS_FILE=/tmp/mytasks.bin MYTASKS_LOG=debug cargo run
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;

use mytasks::auth::AuthController;
use mytasks::config::{AppConfig, CliArgs};
use mytasks::shell::{Command, Shell, parse_command};
use mytasks::store::{AuthStore, SettingsStore};
use mytasks::store::memory::{MemoryAuthStore, MemorySettingsStore, MemoryTaskStore};
use mytasks::store::settings_file::FileSettingsStore;
use mytasks::tasks::TaskController;

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    // Load and resolve configuration (CLI args > env > config file > defaults).
    let config = match AppConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            AppConfig::default()
        }
    };

    // Logs go to a file so stdout stays with the shell.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!("mytasks starting");

    let result = match config.settings_path.clone() {
        Some(path) => {
            let settings = FileSettingsStore::open(path).await.map_err(io::Error::other)?;
            tracing::info!(path = %settings.path().display(), "settings file opened");
            run_shell(Arc::new(settings), &config).await
        }
        None => run_shell(Arc::new(MemorySettingsStore::new()), &config).await,
    };

    tracing::info!("mytasks exiting");
    result
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("mytasks.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Read-eval-print loop over stdin.
async fn run_shell<P: SettingsStore + 'static>(
    settings: Arc<P>,
    config: &AppConfig,
) -> io::Result<()> {
    let auth_store = Arc::new(MemoryAuthStore::new());
    // Each account sees only its own tasks.
    let task_store = MemoryTaskStore::per_user(auth_store.subscribe_current_identity());
    let tasks = TaskController::new(task_store);
    let auth = AuthController::new(auth_store, settings)
        .with_min_password_length(config.min_password_length);
    let shell = Shell::new(tasks, auth, config.date_format.clone());

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout
        .write_all(b"MyTasks. Type 'help' for commands.\n")
        .await?;
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let quit = matches!(parse_command(&line), Ok(Command::Quit));
        for out in shell.run_line(&line).await {
            stdout.write_all(out.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
        if quit {
            break;
        }
    }
    stdout.flush().await
}
