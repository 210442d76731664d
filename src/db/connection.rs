use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use icu::collator::options::{CollatorOptions, Strength};
use icu::collator::Collator;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, Transaction};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::NewStudent;

use super::queries::{LOWER_FN, NAME_COLLATION};
use super::students::{count_students, insert_student};

/// Student inserted into an empty table when seeding is enabled.
const SAMPLE_STUDENT: (&str, i32) = ("Juan Pérez", 20);

/// Owner of the SQLite connection. `main` builds one and hands it to the UI;
/// every data-access call borrows it through [`Database::read`] or
/// [`Database::write`] for exactly the duration of that call.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Ensure the database file exists, create the schema if needed, and
    /// return a live handle.
    pub fn open(config: &Config) -> Result<Self> {
        let db_path = &config.database_path;
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("failed to create data directory")?;
        }

        let conn = Connection::open(db_path).context("failed to open SQLite database")?;
        let mut db = Self::from_connection(conn)?;
        info!(path = %db_path.display(), "database opened");

        if config.seed_demo {
            db.seed_if_empty()?;
        }
        Ok(db)
    }

    /// Private in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        register_text_functions(&conn)?;
        ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Run a read-only operation. No transaction is opened.
    pub fn read<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        op(&self.conn)
    }

    /// Run a mutating operation inside its own transaction. The transaction
    /// is committed when `op` succeeds and rolled back when it fails, so no
    /// exit path leaves it pending.
    pub fn write<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let tx = self
            .conn
            .transaction()
            .context("failed to begin transaction")?;

        match op(&tx) {
            Ok(value) => {
                tx.commit().context("failed to commit transaction")?;
                debug!("transaction committed");
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "rolling back transaction");
                if let Err(rollback_err) = tx.rollback() {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Insert the sample student when the table is empty. Returns whether a
    /// row was written.
    pub fn seed_if_empty(&mut self) -> Result<bool> {
        self.write(|tx| {
            if count_students(tx)? > 0 {
                return Ok(false);
            }
            let (name, age) = SAMPLE_STUDENT;
            let student = insert_student(tx, &NewStudent::new(name, age))?;
            info!(id = student.id, "seeded sample student");
            Ok(true)
        })
    }

    /// Release the connection. Called once on shutdown.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, err)| anyhow!(err).context("failed to close database"))?;
        info!("database closed");
        Ok(())
    }
}

/// SQLite's own `LOWER` and `NOCASE` only fold ASCII, which misses names
/// like "MARÍA". Both are replaced with Unicode-aware versions.
fn register_text_functions(conn: &Connection) -> Result<()> {
    let mut options = CollatorOptions::default();
    // Secondary strength: accents matter, case does not.
    options.strength = Some(Strength::Secondary);
    let collator = Collator::try_new(Default::default(), options)
        .map_err(|err| anyhow!("failed to load collation data: {err}"))?;
    conn.create_collation(NAME_COLLATION, move |a, b| collator.compare(a, b))
        .context("failed to register name collation")?;

    conn.create_scalar_function(
        LOWER_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: String = ctx.get(0)?;
            Ok(text.to_lowercase())
        },
    )
    .context("failed to register lower-case function")?;
    Ok(())
}

/// Create the single `students` table if it does not exist yet. Ages are held
/// to the 32-bit range the application reads them back as.
fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            age INTEGER NOT NULL CHECK (age BETWEEN -2147483648 AND 2147483647)
        )",
        [],
    )
    .context("failed to create students table")?;
    Ok(())
}

/// True when `path` already holds a database file. Lets `main` log whether
/// this run starts from scratch.
pub fn database_exists(path: &Path) -> bool {
    path.is_file()
}
