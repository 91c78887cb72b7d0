//! Error types for the dialect driver.
//!
//! Three families are distinguished: validation errors raised before any I/O,
//! lifecycle errors for misuse of a logical connection, and execution errors
//! which are carried through unchanged from the underlying client.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Connection already released: cannot {operation}")]
    ConnectionReleased { operation: String },

    #[error("Transaction error: {message}")]
    Transaction { message: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    /// Execution error from the sqlx backend, untouched.
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// Execution error from any other client implementation, untouched.
    #[error(transparent)]
    Client(Box<dyn std::error::Error + Send + Sync>),
}

impl DbError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a lifecycle error for an operation attempted after release.
    pub fn connection_released(operation: impl Into<String>) -> Self {
        Self::ConnectionReleased {
            operation: operation.into(),
        }
    }

    /// Create a transaction error.
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Wrap an arbitrary client error without altering it.
    pub fn client(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Client(err.into())
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// Raised by this crate before any statement reached the client.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    /// Raised because the logical connection was used outside its lifecycle.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::ConnectionReleased { .. } | Self::Transaction { .. }
        )
    }

    /// Reported by the underlying client while executing a statement.
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Sqlx(_) | Self::Client(_))
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));

        let err = DbError::connection_released("execute query");
        assert_eq!(
            err.to_string(),
            "Connection already released: cannot execute query"
        );
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::connection("refused", "Check the server is running");
        assert_eq!(err.suggestion(), Some("Check the server is running"));
        assert_eq!(DbError::invalid_input("bad").suggestion(), None);
    }

    #[test]
    fn test_error_families() {
        assert!(DbError::invalid_input("chunk size").is_validation());
        assert!(DbError::connection_released("commit").is_lifecycle());
        assert!(DbError::transaction("already active").is_lifecycle());
        assert!(DbError::from(sqlx::Error::RowNotFound).is_execution());
        assert!(!DbError::invalid_input("x").is_execution());
    }

    #[test]
    fn test_client_errors_are_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "socket closed");
        let err = DbError::client(io);
        assert_eq!(err.to_string(), "socket closed");
        assert!(err.is_execution());
    }

    #[test]
    fn test_sqlx_errors_are_transparent() {
        let err = DbError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.to_string(), sqlx::Error::PoolClosed.to_string());
    }
}
