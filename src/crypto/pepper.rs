use rand::RngCore;

/// Process-wide secret mixed into every peppered digest.
///
/// Loaded once at startup and passed by reference into the crypto
/// primitives; this type intentionally carries no `Default` impl so that
/// callers can't accidentally conjure one without going through
/// `server::load_pepper`'s production/development branching.
#[derive(Clone)]
pub struct Pepper(String);

impl Pepper {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Generates a random ephemeral pepper for development use.
    ///
    /// Never call this in production: every process restart would
    /// invalidate every previously issued token lookup digest.
    pub fn ephemeral() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
