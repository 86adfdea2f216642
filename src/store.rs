// Local key/value store backed by SQLite

use eyre::{Context, Result, eyre};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const CURRENT_VERSION: u32 = 1;
const DB_FILE: &str = "taskboard.db";

/// String slots addressed by key, one per collection plus the config slot
///
/// Cloned handles share the same connection.
#[derive(Clone)]
pub struct LocalStore {
    base_path: Option<PathBuf>,
    db: Arc<Mutex<Connection>>,
}

impl LocalStore {
    /// Open or create a store in the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        // Create directory if it doesn't exist
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;

        let db_path = base_path.join(DB_FILE);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let store = Self {
            base_path: Some(base_path),
            db: Arc::new(Mutex::new(db)),
        };
        store.create_schema()?;
        store.write_version()?;

        Ok(store)
    }

    /// Open a store that lives only as long as the process
    pub fn in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let store = Self {
            base_path: None,
            db: Arc::new(Mutex::new(db)),
        };
        store.create_schema()?;
        Ok(store)
    }

    /// Directory holding the database, if on disk
    pub fn base_path(&self) -> Option<&Path> {
        self.base_path.as_deref()
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.lock().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        Ok(())
    }

    fn write_version(&self) -> Result<()> {
        let Some(base_path) = &self.base_path else {
            return Ok(());
        };
        let version_path = base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }

    /// Read a slot; `None` if never written
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        Self::validate_key(key)?;

        let value = self
            .db
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .with_context(|| format!("Failed to read slot {}", key))?;

        Ok(value)
    }

    /// Write a slot, replacing any previous value
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        Self::validate_key(key)?;

        self.db
            .lock()
            .execute(
                "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                rusqlite::params![key, value],
            )
            .with_context(|| format!("Failed to write slot {}", key))?;

        debug!(key, bytes = value.len(), "Wrote slot");
        Ok(())
    }

    /// Remove a slot; removing an absent slot is not an error
    pub fn remove(&self, key: &str) -> Result<()> {
        Self::validate_key(key)?;

        self.db
            .lock()
            .execute("DELETE FROM kv WHERE key = ?1", [key])
            .with_context(|| format!("Failed to remove slot {}", key))?;

        Ok(())
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(eyre!("Slot key cannot be empty"));
        }
        if key.len() > 64 {
            return Err(eyre!("Slot key too long: {} (max 64 chars)", key));
        }
        if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            return Err(eyre!("Invalid slot key: {} (must be alphanumeric with _/-)", key));
        }
        Ok(())
    }
}
