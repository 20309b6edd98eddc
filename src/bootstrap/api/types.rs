use serde::{Deserialize, Serialize};

use crate::store::Tenant;

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapRequest {
    pub name: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BootstrapResponse {
    pub id: i64,
    pub name: String,
    pub api_key: String,
}

impl From<Tenant> for BootstrapResponse {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name,
            api_key: tenant.api_key,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}
