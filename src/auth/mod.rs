mod authenticator;
mod error;
mod session;

pub use authenticator::Authenticator;
pub use error::AuthError;
pub use session::{Session, SessionStore};
