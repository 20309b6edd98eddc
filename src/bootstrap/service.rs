use std::net::IpAddr;
use std::time::Duration;

use tracing::info;

use crate::crypto::{generate_api_key, Pepper};
use crate::store::{Tenant, TenantStore};
use crate::validation::validate_tenant_name;

use super::error::BootstrapError;
use super::rate_limit::BootstrapRateLimiter;
use super::token;

/// Orchestrates the tenant bootstrap contract end to end: rate limit, name
/// grammar, token window/hash, name uniqueness, then a fresh API key.
pub struct BootstrapService {
    tenants: TenantStore,
    pepper: Pepper,
    rate_limiter: BootstrapRateLimiter,
}

impl BootstrapService {
    pub fn new(
        tenants: TenantStore,
        pepper: Pepper,
        rate_limit_per_minute: u32,
    ) -> Self {
        Self {
            tenants,
            pepper,
            rate_limiter: BootstrapRateLimiter::new(rate_limit_per_minute, Duration::from_secs(60)),
        }
    }

    /// Mints a fresh bootstrap token for `name`. Exposed for admin tooling
    /// and tests; the broker itself never calls this — an operator with the
    /// pepper hands a token to whoever stands up a new tenant.
    pub fn generate_token(&self, name: &str) -> String {
        token::generate(name, &self.pepper)
    }

    pub fn create_tenant(&self, ip: IpAddr, name: &str, token: &str) -> Result<Tenant, BootstrapError> {
        self.rate_limiter.check(ip)?;

        validate_tenant_name(name).map_err(|err| BootstrapError::Malformed(err.to_string()))?;

        super::token::verify(name, token, &self.pepper)?;

        if self.tenants.find_by_name(name)?.is_some() {
            return Err(BootstrapError::AlreadyExists);
        }

        let api_key = generate_api_key();
        let tenant = self.tenants.create(name, &api_key)?;
        info!(tenant_id = tenant.id, name = %tenant.name, "tenant created via bootstrap");
        Ok(tenant)
    }
}
