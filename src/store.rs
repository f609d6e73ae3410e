// src/store.rs
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use thiserror::Error;

// Custom Error type for store operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Store connection failed")]
    Connection(#[from] rusqlite::Error),
    #[error("Failed to get application data directory")]
    DataDir,
    #[error("I/O error accessing store file")]
    Io(#[from] std::io::Error),
    #[error("Store query failed: {0}")]
    QueryFailed(rusqlite::Error),
    #[error("Store write failed: {0}")]
    WriteFailed(rusqlite::Error),
    #[error("Store delete failed: {0}")]
    DeleteFailed(rusqlite::Error),
}

/// The local key-value store the session snapshot is written to.
///
/// Mirrors the mobile platform's string-keyed storage contract: values are
/// opaque strings, reads of absent keys yield `None`. The session component
/// treats every error from these calls as non-fatal.
pub trait SnapshotStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error>;
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;
    fn remove(&self, key: &str) -> Result<(), Error>;
}

const STORE_FILE_NAME: &str = "session.sqlite";
const DATA_ENV_VAR: &str = "GEAR_SESSION_DATA_DIR";

/// Gets the path to the SQLite store file within the app's data directory.
/// Exposed at crate root as `get_store_path_util`
pub fn get_store_path() -> Result<PathBuf, Error> {
    let app_dir = if let Ok(path_str) = std::env::var(DATA_ENV_VAR) {
        PathBuf::from(path_str)
    } else {
        let data_dir = dirs::data_dir().ok_or(Error::DataDir)?;
        data_dir.join("gear-session") // Same dir name as config
    };
    if !app_dir.exists() {
        std::fs::create_dir_all(&app_dir)?;
    }
    Ok(app_dir.join(STORE_FILE_NAME))
}

/// SQLite-backed implementation of the key-value contract. A single `kv`
/// table holds one row per key; the session snapshot occupies exactly one.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (and initializes) the store at the given path.
    /// # Errors
    /// Returns `Error::Connection` if the file cannot be opened or the
    /// schema cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let conn = Connection::open(path).map_err(Error::Connection)?;
        init(&conn)?;
        Ok(Self { conn })
    }

    /// Opens an in-memory store. Used by tests and embedders that do not
    /// want durability.
    /// # Errors
    /// Returns `Error::Connection` on SQLite failure.
    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().map_err(Error::Connection)?;
        init(&conn)?;
        Ok(Self { conn })
    }
}

/// Initializes the key-value schema.
fn init(conn: &Connection) -> Result<(), Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .map_err(Error::QueryFailed)?;
    Ok(())
}

impl SnapshotStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(Error::QueryFailed)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(Error::WriteFailed)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(Error::DeleteFailed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{SnapshotStore, SqliteStore};

    #[test]
    fn get_absent_key_returns_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn set_overwrites_existing_value() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("k", "first").unwrap();
        store.set("k", "second").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn remove_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("k", "v").unwrap();
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.sqlite");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("k", "persisted").unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("persisted"));
    }
}
