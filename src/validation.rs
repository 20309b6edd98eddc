use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("tenant name {0:?} is invalid: {1}")]
    InvalidName(String, &'static str),
    #[error("payload of {actual} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge { actual: usize, limit: usize },
}

/// Validates a tenant name against `^[a-z0-9]([a-z0-9-]*[a-z0-9])?$` with no
/// consecutive hyphens.
///
/// Hand-rolled rather than regex-based: the grammar is small and this keeps
/// the crate's dependency set aligned with the rest of the pack, none of
/// which reaches for a regex engine for a single-line grammar check.
pub fn validate_tenant_name(name: &str) -> Result<(), ValidationError> {
    let bytes = name.as_bytes();

    let Some(&first) = bytes.first() else {
        return Err(ValidationError::InvalidName(name.to_string(), "must not be empty"));
    };
    let last = *bytes.last().expect("non-empty checked above");

    if !is_alnum(first) {
        return Err(ValidationError::InvalidName(
            name.to_string(),
            "must start with a lowercase letter or digit",
        ));
    }
    if !is_alnum(last) {
        return Err(ValidationError::InvalidName(
            name.to_string(),
            "must end with a lowercase letter or digit",
        ));
    }
    if let Some(&bad) = bytes.iter().find(|&&c| !is_alnum(c) && c != b'-') {
        return Err(ValidationError::InvalidName(
            name.to_string(),
            invalid_char_reason(bad),
        ));
    }
    if name.contains("--") {
        return Err(ValidationError::InvalidName(
            name.to_string(),
            "must not contain consecutive hyphens",
        ));
    }

    Ok(())
}

fn is_alnum(c: u8) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

fn invalid_char_reason(c: u8) -> &'static str {
    if c.is_ascii_uppercase() {
        "must be lowercase"
    } else {
        "may only contain lowercase letters, digits, and hyphens"
    }
}

/// Enforces the telemetry payload size ceiling (spec default 64 KiB).
pub fn check_payload_size(actual: usize, limit: usize) -> Result<(), ValidationError> {
    if actual > limit {
        return Err(ValidationError::PayloadTooLarge { actual, limit });
    }
    Ok(())
}
