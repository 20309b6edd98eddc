use chrono::{DateTime, Utc};
use tracing::{error, warn};

use crate::crypto::{lookup_digest, verify_secret, Pepper};
use crate::store::DeviceCredentialStore;

use super::error::AuthError;
use super::session::Session;

/// Authenticates an MQTT CONNECT against the device credential store.
///
/// Single-credential mode: the device token travels as the MQTT username
/// with no password. Every other shape (`username` absent, or a
/// `password` also present) is rejected before the store is even
/// consulted.
#[derive(Clone)]
pub struct Authenticator {
    devices: DeviceCredentialStore,
    pepper: Pepper,
}

impl Authenticator {
    pub fn new(devices: DeviceCredentialStore, pepper: Pepper) -> Self {
        Self { devices, pepper }
    }

    pub async fn authenticate(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Session, AuthError> {
        let token = match (username, password) {
            (Some(token), None) => token.to_string(),
            (Some(_), Some(password)) if !password.is_empty() => return Err(AuthError),
            (Some(token), Some(_)) => token.to_string(),
            (None, _) => return Err(AuthError),
        };

        let lookup = lookup_digest(&token, &self.pepper);
        let credential = match self.devices.find_by_token_lookup(&lookup) {
            Ok(Some(credential)) => credential,
            Ok(None) => return Err(AuthError),
            Err(err) => {
                error!(error = %err, "credential lookup failed during CONNECT");
                return Err(AuthError);
            }
        };

        let token_hash = credential.token_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_secret(&token, &token_hash))
            .await
            .unwrap_or_else(|join_err| {
                error!(error = %join_err, "credential verification task panicked");
                false
            });

        if !verified {
            return Err(AuthError);
        }

        if is_expired(&credential.expires_at) {
            warn!(device_id = %credential.device_id, "rejected CONNECT with expired credential");
            return Err(AuthError);
        }

        Ok(Session {
            tenant_id: credential.tenant_id,
            device_id: credential.device_id,
        })
    }
}

fn is_expired(expires_at: &Option<String>) -> bool {
    match expires_at {
        Some(ts) => DateTime::parse_from_rfc3339(ts)
            .map(|dt| dt.with_timezone(&Utc) < Utc::now())
            .unwrap_or(false),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_secret;
    use crate::store::Database;

    fn setup() -> (Authenticator, i64, String) {
        let db = Database::open_in_memory().unwrap();
        let tenants = crate::store::TenantStore::new(db.clone());
        let devices = DeviceCredentialStore::new(db);
        let pepper = Pepper::new("test-pepper".to_string());
        let tenant = tenants.create("acme", "key-1").unwrap();

        let token = "device-secret-token";
        let token_hash = hash_secret(token).unwrap();
        let token_lookup = lookup_digest(token, &pepper);
        devices
            .create(tenant.id, "dev-1", &token_hash, &token_lookup, "Sensor", None, None, None)
            .unwrap();

        (Authenticator::new(devices, pepper), tenant.id, token.to_string())
    }

    #[tokio::test]
    async fn valid_token_as_username_with_no_password_authenticates() {
        let (auth, tenant_id, token) = setup();
        let session = auth.authenticate(Some(&token), None).await.unwrap();
        assert_eq!(session.tenant_id, tenant_id);
        assert_eq!(session.device_id, "dev-1");
    }

    #[tokio::test]
    async fn missing_username_is_rejected() {
        let (auth, _tenant_id, _token) = setup();
        assert_eq!(auth.authenticate(None, None).await.unwrap_err(), AuthError);
    }

    #[tokio::test]
    async fn username_with_nonempty_password_is_rejected() {
        let (auth, _tenant_id, token) = setup();
        assert_eq!(
            auth.authenticate(Some(&token), Some("anything")).await.unwrap_err(),
            AuthError
        );
    }

    #[tokio::test]
    async fn wrong_token_is_rejected() {
        let (auth, _tenant_id, _token) = setup();
        assert_eq!(auth.authenticate(Some("wrong-token"), None).await.unwrap_err(), AuthError);
    }

    #[tokio::test]
    async fn expired_credential_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let tenants = crate::store::TenantStore::new(db.clone());
        let devices = DeviceCredentialStore::new(db);
        let pepper = Pepper::new("test-pepper".to_string());
        let tenant = tenants.create("acme", "key-1").unwrap();

        let token = "device-secret-token";
        let token_hash = hash_secret(token).unwrap();
        let token_lookup = lookup_digest(token, &pepper);
        devices
            .create(
                tenant.id,
                "dev-1",
                &token_hash,
                &token_lookup,
                "Sensor",
                None,
                None,
                Some("2000-01-01T00:00:00Z"),
            )
            .unwrap();

        let auth = Authenticator::new(devices, pepper);
        assert_eq!(auth.authenticate(Some(token), None).await.unwrap_err(), AuthError);
    }

    /// Spec.md §8 scenario 4 ("Rotation"): after an admin rotates a
    /// device's credential to a new plaintext, the old plaintext is
    /// rejected and the new one is accepted.
    #[tokio::test]
    async fn rotated_credential_rejects_old_token_and_accepts_new_token() {
        let db = Database::open_in_memory().unwrap();
        let tenants = crate::store::TenantStore::new(db.clone());
        let devices = DeviceCredentialStore::new(db);
        let pepper = Pepper::new("test-pepper".to_string());
        let tenant = tenants.create("acme", "key-1").unwrap();

        let old_token = "token-abc";
        let old_hash = hash_secret(old_token).unwrap();
        let old_lookup = lookup_digest(old_token, &pepper);
        devices
            .create(tenant.id, "dev-1", &old_hash, &old_lookup, "Sensor", None, None, None)
            .unwrap();

        let new_token = "token-xyz";
        let new_hash = hash_secret(new_token).unwrap();
        let new_lookup = lookup_digest(new_token, &pepper);
        devices.rotate_token("dev-1", &new_hash, &new_lookup).unwrap();

        let auth = Authenticator::new(devices, pepper);
        assert_eq!(auth.authenticate(Some(old_token), None).await.unwrap_err(), AuthError);

        let session = auth.authenticate(Some(new_token), None).await.unwrap();
        assert_eq!(session.tenant_id, tenant.id);
        assert_eq!(session.device_id, "dev-1");
    }
}
