use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::database::Database;
use super::error::{classify, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCredential {
    pub id: i64,
    pub tenant_id: i64,
    pub device_id: String,
    pub token_hash: String,
    pub token_lookup: String,
    pub name: String,
    pub labels: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub expires_at: Option<String>,
}

const DEFAULT_LIST_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct DeviceCredentialStore {
    db: Database,
}

impl DeviceCredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Inserts a device credential. Racing inserts on `device_id` or
    /// `token_lookup` surface as [`StoreError::AlreadyExists`].
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        &self,
        tenant_id: i64,
        device_id: &str,
        token_hash: &str,
        token_lookup: &str,
        name: &str,
        labels: Option<&str>,
        notes: Option<&str>,
        expires_at: Option<&str>,
    ) -> Result<DeviceCredential, StoreError> {
        let conn = self.db.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO device_credentials
                (tenant_id, device_id, token_hash, token_lookup, name, labels, notes, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                tenant_id, device_id, token_hash, token_lookup, name, labels, notes, now, expires_at
            ],
        )
        .map_err(classify)?;
        let id = conn.last_insert_rowid();
        Ok(DeviceCredential {
            id,
            tenant_id,
            device_id: device_id.to_string(),
            token_hash: token_hash.to_string(),
            token_lookup: token_lookup.to_string(),
            name: name.to_string(),
            labels: labels.map(str::to_string),
            notes: notes.map(str::to_string),
            created_at: now,
            expires_at: expires_at.map(str::to_string),
        })
    }

    /// Looks a credential up by its deterministic peppered digest. This is
    /// the only lookup CONNECT performs — it never scans by device id.
    pub fn find_by_token_lookup(
        &self,
        token_lookup: &str,
    ) -> Result<Option<DeviceCredential>, StoreError> {
        let conn = self.db.lock()?;
        conn.query_row(
            "SELECT id, tenant_id, device_id, token_hash, token_lookup, name, labels, notes, created_at, expires_at
             FROM device_credentials WHERE token_lookup = ?1",
            params![token_lookup],
            row_to_credential,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn find_by_device_id(
        &self,
        device_id: &str,
    ) -> Result<Option<DeviceCredential>, StoreError> {
        let conn = self.db.lock()?;
        conn.query_row(
            "SELECT id, tenant_id, device_id, token_hash, token_lookup, name, labels, notes, created_at, expires_at
             FROM device_credentials WHERE device_id = ?1",
            params![device_id],
            row_to_credential,
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn update(
        &self,
        device_id: &str,
        name: Option<&str>,
        labels: Option<&str>,
        notes: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.db.lock()?;
        let existing = conn
            .query_row(
                "SELECT name, labels, notes FROM device_credentials WHERE device_id = ?1",
                params![device_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?
            .ok_or(StoreError::NotFound)?;

        let next_name = name.unwrap_or(&existing.0);
        let next_labels = labels.or(existing.1.as_deref());
        let next_notes = notes.or(existing.2.as_deref());

        conn.execute(
            "UPDATE device_credentials SET name = ?2, labels = ?3, notes = ?4 WHERE device_id = ?1",
            params![device_id, next_name, next_labels, next_notes],
        )?;
        Ok(())
    }

    /// Replaces a credential's verifier and lookup digest in place — an
    /// admin-initiated rotation to a new plaintext. Existing MQTT sessions
    /// already stamped from the old credential are left connected; rotation
    /// only affects future CONNECTs (see the open question on mid-session
    /// revocation).
    pub fn rotate_token(
        &self,
        device_id: &str,
        token_hash: &str,
        token_lookup: &str,
    ) -> Result<(), StoreError> {
        let conn = self.db.lock()?;
        let updated = conn
            .execute(
                "UPDATE device_credentials SET token_hash = ?2, token_lookup = ?3 WHERE device_id = ?1",
                params![device_id, token_hash, token_lookup],
            )
            .map_err(classify)?;
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn delete(&self, device_id: &str) -> Result<(), StoreError> {
        let conn = self.db.lock()?;
        let deleted = conn.execute(
            "DELETE FROM device_credentials WHERE device_id = ?1",
            params![device_id],
        )?;
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub fn list(
        &self,
        tenant_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<DeviceCredential>, StoreError> {
        let conn = self.db.lock()?;
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT);
        let offset = offset.unwrap_or(0);
        let mut stmt = conn.prepare(
            r#"
            SELECT id, tenant_id, device_id, token_hash, token_lookup, name, labels, notes, created_at, expires_at
            FROM device_credentials
            WHERE tenant_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let rows = stmt.query_map(params![tenant_id, limit, offset], row_to_credential)?;
        let mut credentials = Vec::new();
        for row in rows {
            credentials.push(row?);
        }
        Ok(credentials)
    }

    pub fn count(&self, tenant_id: i64) -> Result<i64, StoreError> {
        let conn = self.db.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM device_credentials WHERE tenant_id = ?1",
            params![tenant_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn row_to_credential(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeviceCredential> {
    Ok(DeviceCredential {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        device_id: row.get(2)?,
        token_hash: row.get(3)?,
        token_lookup: row.get(4)?,
        name: row.get(5)?,
        labels: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        expires_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tenants::TenantStore;

    fn stores() -> (TenantStore, DeviceCredentialStore, i64) {
        let db = Database::open_in_memory().unwrap();
        let tenants = TenantStore::new(db.clone());
        let devices = DeviceCredentialStore::new(db);
        let tenant = tenants.create("acme", "key-1").unwrap();
        (tenants, devices, tenant.id)
    }

    #[test]
    fn create_and_lookup_by_digest() {
        let (_tenants, devices, tenant_id) = stores();
        devices
            .create(tenant_id, "dev-1", "hash", "digest-1", "Sensor 1", None, None, None)
            .unwrap();
        let found = devices.find_by_token_lookup("digest-1").unwrap().unwrap();
        assert_eq!(found.device_id, "dev-1");
    }

    #[test]
    fn duplicate_device_id_is_already_exists() {
        let (_tenants, devices, tenant_id) = stores();
        devices
            .create(tenant_id, "dev-1", "hash", "digest-1", "Sensor 1", None, None, None)
            .unwrap();
        let err = devices
            .create(tenant_id, "dev-1", "hash2", "digest-2", "Sensor 1 dup", None, None, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[test]
    fn duplicate_token_lookup_is_already_exists() {
        let (_tenants, devices, tenant_id) = stores();
        devices
            .create(tenant_id, "dev-1", "hash", "digest-1", "Sensor 1", None, None, None)
            .unwrap();
        let err = devices
            .create(tenant_id, "dev-2", "hash2", "digest-1", "Sensor 2", None, None, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }

    #[test]
    fn delete_missing_device_is_not_found() {
        let (_tenants, devices, _tenant_id) = stores();
        let err = devices.delete("missing").unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn list_respects_default_limit_and_tenant_scoping() {
        let (tenants, devices, tenant_id) = stores();
        let other_tenant = tenants.create("other", "key-2").unwrap();
        for i in 0..3 {
            devices
                .create(
                    tenant_id,
                    &format!("dev-{i}"),
                    "hash",
                    &format!("digest-{i}"),
                    "Sensor",
                    None,
                    None,
                    None,
                )
                .unwrap();
        }
        devices
            .create(other_tenant.id, "dev-other", "hash", "digest-other", "Sensor", None, None, None)
            .unwrap();

        let listed = devices.list(tenant_id, None, None).unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(devices.count(tenant_id).unwrap(), 3);
        assert_eq!(devices.count(other_tenant.id).unwrap(), 1);
    }

    #[test]
    fn rotate_token_replaces_hash_and_lookup_and_retires_the_old_digest() {
        let (_tenants, devices, tenant_id) = stores();
        devices
            .create(tenant_id, "dev-1", "old-hash", "old-digest", "Sensor 1", None, None, None)
            .unwrap();

        devices.rotate_token("dev-1", "new-hash", "new-digest").unwrap();

        assert!(devices.find_by_token_lookup("old-digest").unwrap().is_none());
        let rotated = devices.find_by_token_lookup("new-digest").unwrap().unwrap();
        assert_eq!(rotated.token_hash, "new-hash");
        assert_eq!(rotated.device_id, "dev-1");
    }

    #[test]
    fn rotate_token_on_missing_device_is_not_found() {
        let (_tenants, devices, _tenant_id) = stores();
        let err = devices.rotate_token("missing", "hash", "digest").unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }
}
