//! Binary entry point: resolve configuration, start file logging, open the
//! database, and drive the Ratatui event loop until the user exits.
use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::Context;
use student_records_manager::db::database_exists;
use student_records_manager::{run_app, App, Config, Database};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Returning a `Result` bubbles up fatal initialization problems (for example
/// an unwritable data directory) to the terminal instead of crashing silently.
fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_logging(&config)?;

    let fresh = !database_exists(&config.database_path);
    let db = Database::open(&config)?;
    info!(fresh, "starting student records manager");

    let mut app = App::new(db)?;
    let result = run_app(&mut app);

    // The connection is released even when the UI loop failed.
    let closed = app.into_database().close();
    result.and(closed)
}

/// Send tracing output to the log file; the terminal is owned by the TUI.
fn init_logging(config: &Config) -> anyhow::Result<()> {
    if let Some(parent) = config.log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context("failed to create log directory")?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
        .context("failed to open log file")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
