use thiserror::Error;

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// The store did not accept a connection within the configured timeout
    #[error("Timed out connecting to database after {timeout:?}")]
    ConnectTimeout { timeout: std::time::Duration },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Every sqlx failure fails the upload the same way. `chat_images` has no unique constraint and inserts use
/// `RETURNING`, so there is nothing finer to distinguish.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Other(anyhow::Error::from(err))
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_is_not_special_cased() {
        let err = DbError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, DbError::Other(_)));
        assert!(err.to_string().contains("no rows returned"), "{err}");
    }

    #[test]
    fn test_other_errors_keep_their_description() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Connection refused");
        let err = DbError::from(sqlx::Error::Io(io));
        assert!(matches!(err, DbError::Other(_)));
        assert!(err.to_string().contains("Connection refused"));
    }
}
