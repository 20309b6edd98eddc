mod error;
mod pepper;
mod secret;

pub use error::CryptoError;
pub use pepper::Pepper;
pub use secret::{
    constant_time_eq, constant_time_eq_str, generate_api_key, hash_secret, lookup_digest,
    verify_secret,
};
