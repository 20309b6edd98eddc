use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BatcherError {
    #[error("batcher is stopped")]
    Stopped,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
