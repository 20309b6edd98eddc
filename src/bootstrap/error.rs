use thiserror::Error;

use crate::store::StoreError;

/// Failure taxonomy surfaced distinctly to the bootstrap HTTP caller, per
/// the spec's error design — unlike the MQTT path, admin-facing errors are
/// not collapsed into one opaque variant.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error("token is invalid or expired")]
    Unauthorized,
    #[error("tenant name already exists")]
    AlreadyExists,
    #[error("too many bootstrap attempts, try again later")]
    RateLimited,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for BootstrapError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists => BootstrapError::AlreadyExists,
            other => BootstrapError::Internal(other.to_string()),
        }
    }
}
