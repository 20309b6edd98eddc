use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::database::Database;
use super::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub tenant_id: i64,
    pub topic: String,
    pub payload: String,
    pub timestamp: String,
}

impl TelemetryRecord {
    pub fn new(tenant_id: i64, topic: String, payload: String) -> Self {
        Self {
            tenant_id,
            topic,
            payload,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Clone)]
pub struct TelemetryStore {
    db: Database,
}

impl TelemetryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persists a batch in a single transaction. Either the whole batch
    /// lands or none of it does — the batcher retries the entire batch on
    /// failure, so a partial write would duplicate rows on the next attempt.
    pub fn insert_batch(&self, records: &[TelemetryRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.db.lock()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO telemetry (tenant_id, topic, payload, timestamp) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.tenant_id,
                    record.topic,
                    record.payload,
                    record.timestamp
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn count(&self) -> Result<i64, StoreError> {
        let conn = self.db.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM telemetry", [], |row| row.get(0))?;
        Ok(count)
    }
}
