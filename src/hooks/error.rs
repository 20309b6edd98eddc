use thiserror::Error;

use crate::topic::TopicError;

/// Failure surface for the per-packet authorization hooks. Both variants
/// collapse to the same MQTT-visible outcome (drop/refuse); the distinction
/// only matters for the log line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HookError {
    #[error("session is not authenticated")]
    Unauthenticated,
    #[error(transparent)]
    Topic(#[from] TopicError),
}
