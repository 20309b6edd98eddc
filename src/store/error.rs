use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("data directory error: {0}")]
    Io(#[from] std::io::Error),
    #[error("already exists")]
    AlreadyExists,
    #[error("not found")]
    NotFound,
    #[error("lock poisoned")]
    LockPoisoned,
}

/// Classifies a raw `rusqlite` uniqueness violation as `AlreadyExists`.
///
/// Concurrent creations racing on `deviceId` or `tokenLookup` surface as a
/// `SQLITE_CONSTRAINT` error from the driver; callers must treat this the
/// same as a pre-check finding an existing row.
pub fn classify(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(ref sqlite_err, _) = err {
        if sqlite_err.code == rusqlite::ErrorCode::ConstraintViolation {
            return StoreError::AlreadyExists;
        }
    }
    StoreError::Database(err)
}
