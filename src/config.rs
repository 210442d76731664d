//! Runtime configuration resolved from the environment. A `.env` file in the
//! working directory is honoured so local setups can point the app at a
//! scratch database without exporting variables by hand.

use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".student-records";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "students.sqlite";
/// Log file written next to the database; stdout belongs to the TUI.
const LOG_FILE_NAME: &str = "student-records.log";

pub const DB_PATH_VAR: &str = "STUDENT_RECORDS_DB";
pub const LOG_PATH_VAR: &str = "STUDENT_RECORDS_LOG";
pub const SEED_VAR: &str = "STUDENT_RECORDS_SEED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub log_path: PathBuf,
    /// Insert a sample student when the table starts out empty.
    pub seed_demo: bool,
}

impl Config {
    /// Load `.env` (if any) and build the configuration from the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source. Split out of
    /// `from_env` so tests do not have to mutate the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_path = match non_empty(DB_PATH_VAR) {
            Some(path) => PathBuf::from(path),
            None => data_dir()?.join(DB_FILE_NAME),
        };

        let log_path = match non_empty(LOG_PATH_VAR) {
            Some(path) => PathBuf::from(path),
            None => database_path
                .parent()
                .map(|dir| dir.join(LOG_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME)),
        };

        let seed_demo = non_empty(SEED_VAR)
            .map(|raw| parse_flag(&raw))
            .transpose()?
            .unwrap_or(false);

        Ok(Self {
            database_path,
            log_path,
            seed_demo,
        })
    }
}

/// Resolve `~/.student-records`.
fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{SEED_VAR} must be a boolean flag, got `{other}`")),
    }
}
