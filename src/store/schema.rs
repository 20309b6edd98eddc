use rusqlite::Connection;

pub const TENANTS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tenants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    api_key TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);
"#;

pub const DEVICE_CREDENTIALS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS device_credentials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    device_id TEXT NOT NULL UNIQUE,
    token_hash TEXT NOT NULL,
    token_lookup TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    labels TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    expires_at TEXT
);
"#;

pub const DEVICE_CREDENTIALS_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_device_credentials_tenant ON device_credentials(tenant_id);
"#;

pub const TELEMETRY_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS telemetry (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tenant_id INTEGER NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
    topic TEXT NOT NULL,
    payload TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
"#;

pub const TELEMETRY_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_telemetry_timestamp ON telemetry(timestamp);
CREATE INDEX IF NOT EXISTS idx_telemetry_topic ON telemetry(topic);
CREATE INDEX IF NOT EXISTS idx_telemetry_tenant ON telemetry(tenant_id);
"#;

pub fn init_database(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(TENANTS_TABLE_SCHEMA)?;
    conn.execute_batch(DEVICE_CREDENTIALS_TABLE_SCHEMA)?;
    conn.execute_batch(DEVICE_CREDENTIALS_INDEXES)?;
    conn.execute_batch(TELEMETRY_TABLE_SCHEMA)?;
    conn.execute_batch(TELEMETRY_INDEXES)?;
    Ok(())
}
