use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use super::error::StoreError;
use super::schema::init_database;

/// Shared handle to the broker's single SQLite file.
///
/// `rusqlite::Connection` is `!Sync`; every store wraps this same handle in
/// a `Mutex` rather than opening one connection per table, since SQLite
/// already serializes writers and WAL mode lets readers proceed without
/// blocking on them.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join("broker.sqlite3");
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        init_database(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        init_database(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_data_dir_and_a_durable_wal_backed_file() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("broker-data");
        assert!(!data_dir.exists());

        let db = Database::open(&data_dir).unwrap();
        assert!(data_dir.join("broker.sqlite3").exists());

        let conn = db.lock().unwrap();
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn reopening_an_existing_database_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("broker-data");

        {
            let db = Database::open(&data_dir).unwrap();
            let tenants = super::super::TenantStore::new(db);
            tenants.create("acme", "key-1").unwrap();
        }

        let db = Database::open(&data_dir).unwrap();
        let tenants = super::super::TenantStore::new(db);
        assert!(tenants.find_by_name("acme").unwrap().is_some());
    }
}
