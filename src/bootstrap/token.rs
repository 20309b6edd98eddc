use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::crypto::{constant_time_eq_str, Pepper};

use super::error::BootstrapError;

/// Window within which a generated token remains valid.
const TOKEN_WINDOW_MS: i64 = 60_000;

/// Generates a tenant bootstrap token: `"{timestampMs}:{hexDigest}"`, where
/// the digest is `SHA-256(name || pepper || timestampMs)`.
pub fn generate(name: &str, pepper: &Pepper) -> String {
    let ts_str = Utc::now().timestamp_millis().to_string();
    let digest = digest(name, pepper, &ts_str);
    format!("{ts_str}:{digest}")
}

/// Verifies a bootstrap token against `name`: well-formed, within the
/// validity window, and hash-matching — all in constant time on the digest
/// comparison.
pub fn verify(name: &str, token: &str, pepper: &Pepper) -> Result<(), BootstrapError> {
    let (ts_str, hash_hex) = token.split_once(':').ok_or(BootstrapError::Malformed(
        "token must be \"timestamp:digest\"".to_string(),
    ))?;

    let ts: i64 = ts_str
        .parse()
        .map_err(|_| BootstrapError::Malformed("token timestamp is not a valid integer".to_string()))?;
    if ts < 0 {
        return Err(BootstrapError::Malformed("token timestamp must not be negative".to_string()));
    }

    let now = Utc::now().timestamp_millis();
    let elapsed = now - ts;
    if elapsed < 0 || elapsed > TOKEN_WINDOW_MS {
        return Err(BootstrapError::Unauthorized);
    }

    let expected = digest(name, pepper, ts_str);
    if !constant_time_eq_str(&expected, hash_hex) {
        return Err(BootstrapError::Unauthorized);
    }

    Ok(())
}

fn digest(name: &str, pepper: &Pepper, ts_str: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(pepper.as_str().as_bytes());
    hasher.update(ts_str.as_bytes());
    hex::encode(hasher.finalize())
}
