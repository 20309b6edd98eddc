mod database;
mod devices;
mod error;
mod schema;
mod tenants;
mod telemetry;

pub use database::Database;
pub use devices::{DeviceCredential, DeviceCredentialStore};
pub use error::{classify, StoreError};
pub use tenants::{Tenant, TenantStore};
pub use telemetry::{TelemetryRecord, TelemetryStore};
