use rand::RngCore;
use scrypt::{scrypt, Params};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::error::CryptoError;
use super::pepper::Pepper;

const SALT_LEN: usize = 16;
const KEY_LEN: usize = 64;
// N=2^14, r=8, p=1 — memory-hard parameters equivalent to the scrypt-class
// KDF called for in the spec; deliberately slow (tens of ms) so it is run
// off the async reactor (see auth::authenticator).
const LOG_N: u8 = 14;
const R: u32 = 8;
const P: u32 = 1;

fn params() -> Result<Params, CryptoError> {
    Params::new(LOG_N, R, P, KEY_LEN).map_err(|e| CryptoError::InvalidParams(e.to_string()))
}

/// Hashes a plaintext secret into a verifier string `"{saltHex}${keyHex}"`.
pub fn hash_secret(secret: &str) -> Result<String, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let mut key = [0u8; KEY_LEN];
    scrypt(secret.as_bytes(), &salt, &params()?, &mut key)
        .map_err(|e| CryptoError::KdfFailed(e.to_string()))?;

    Ok(format!("{}${}", hex::encode(salt), hex::encode(key)))
}

/// Verifies `secret` against a verifier string produced by [`hash_secret`].
///
/// A malformed verifier returns `false` rather than propagating an error —
/// callers must never distinguish "bad verifier" from "wrong secret" (see
/// [`crate::auth::authenticator`]).
pub fn verify_secret(secret: &str, verifier: &str) -> bool {
    let Some((salt_hex, key_hex)) = verifier.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected_key) = hex::decode(key_hex) else {
        return false;
    };

    let Ok(params) = params() else {
        return false;
    };

    let mut actual_key = vec![0u8; expected_key.len()];
    if scrypt(secret.as_bytes(), &salt, &params, &mut actual_key).is_err() {
        return false;
    }

    constant_time_eq(&actual_key, &expected_key)
}

/// Deterministic peppered lookup digest: `SHA-256(secret || pepper)`, hex.
///
/// Used as an indexed database key so CONNECT can locate a credential
/// without scanning every row.
pub fn lookup_digest(secret: &str, pepper: &Pepper) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(pepper.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a fresh tenant API key: 256 random bits, hex-encoded.
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Constant-time byte comparison. Unequal lengths short-circuit to `false`
/// without invoking the constant-time primitive, which panics on
/// mismatched-length input.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_roundtrips() {
        let verifier = hash_secret("token-abc").unwrap();
        assert!(verify_secret("token-abc", &verifier));
        assert!(!verify_secret("token-xyz", &verifier));
    }

    #[test]
    fn two_hashes_of_same_plaintext_differ_but_both_verify() {
        let a = hash_secret("token-abc").unwrap();
        let b = hash_secret("token-abc").unwrap();
        assert_ne!(a, b);
        assert!(verify_secret("token-abc", &a));
        assert!(verify_secret("token-abc", &b));
    }

    #[test]
    fn malformed_verifier_returns_false_not_error() {
        assert!(!verify_secret("token-abc", "not-a-verifier"));
        assert!(!verify_secret("token-abc", "zz$zz"));
        assert!(!verify_secret("token-abc", ""));
    }

    #[test]
    fn lookup_digest_is_deterministic_and_pepper_dependent() {
        let pepper_a = Pepper::new("pepper-a".to_string());
        let pepper_b = Pepper::new("pepper-b".to_string());
        let d1 = lookup_digest("token-abc", &pepper_a);
        let d2 = lookup_digest("token-abc", &pepper_a);
        let d3 = lookup_digest("token-abc", &pepper_b);
        assert_eq!(d1, d2);
        assert_ne!(d1, d3);
    }

    #[test]
    fn constant_time_eq_rejects_length_mismatch_without_panicking() {
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"abc", b"abc"));
    }

    #[test]
    fn generated_api_keys_are_64_hex_chars_and_unique() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
