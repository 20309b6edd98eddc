use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::database::Database;
use super::error::{classify, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub api_key: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct TenantStore {
    db: Database,
}

impl TenantStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a new tenant. Racing inserts on `name` surface as
    /// [`StoreError::AlreadyExists`] rather than a raw constraint error.
    pub fn create(&self, name: &str, api_key: &str) -> Result<Tenant, StoreError> {
        let conn = self.db.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO tenants (name, api_key, created_at) VALUES (?1, ?2, ?3)",
            params![name, api_key, now],
        )
        .map_err(classify)?;
        let id = conn.last_insert_rowid();
        Ok(Tenant {
            id,
            name: name.to_string(),
            api_key: api_key.to_string(),
            created_at: now,
        })
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<Tenant>, StoreError> {
        let conn = self.db.lock()?;
        conn.query_row(
            "SELECT id, name, api_key, created_at FROM tenants WHERE name = ?1",
            params![name],
            row_to_tenant,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn find_by_api_key(&self, api_key: &str) -> Result<Option<Tenant>, StoreError> {
        let conn = self.db.lock()?;
        conn.query_row(
            "SELECT id, name, api_key, created_at FROM tenants WHERE api_key = ?1",
            params![api_key],
            row_to_tenant,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Tenant>, StoreError> {
        let conn = self.db.lock()?;
        conn.query_row(
            "SELECT id, name, api_key, created_at FROM tenants WHERE id = ?1",
            params![id],
            row_to_tenant,
        )
        .optional()
        .map_err(StoreError::from)
    }
}

fn row_to_tenant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        api_key: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TenantStore {
        TenantStore::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn create_and_find_roundtrips() {
        let store = store();
        let created = store.create("acme", "key-1").unwrap();
        let found = store.find_by_name("acme").unwrap().unwrap();
        assert_eq!(created.id, found.id);
        assert_eq!(found.api_key, "key-1");
    }

    #[test]
    fn duplicate_name_is_already_exists() {
        let store = store();
        store.create("acme", "key-1").unwrap();
        let err = store.create("acme", "key-2").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[test]
    fn missing_tenant_is_none_not_error() {
        let store = store();
        assert!(store.find_by_name("nope").unwrap().is_none());
    }
}
