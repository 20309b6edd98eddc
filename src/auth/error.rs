use thiserror::Error;

/// Uniform authentication/authorization failure. Every rejection reason on
/// the MQTT path collapses into this single variant — missing credential,
/// bad secret, and expired credential must not be distinguishable to a
/// client, or CONNECT becomes a credential-enumeration oracle.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("not authorized")]
pub struct AuthError;
