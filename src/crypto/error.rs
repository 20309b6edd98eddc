use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("scrypt parameters invalid: {0}")]
    InvalidParams(String),
    #[error("scrypt KDF failed: {0}")]
    KdfFailed(String),
}
