//! Cursor storage error types.

use thiserror::Error;

/// Errors that can occur while persisting or reading pipeline state.
#[derive(Error, Debug, Clone)]
pub enum StateError {
    /// The backing store could not be reached.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A read or write against the backing store failed.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// The persisted record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A persisted value has an unexpected format.
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

impl StateError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageError(msg.into())
    }

    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl From<redis::RedisError> for StateError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            Self::ConnectionError(err.to_string())
        } else {
            Self::StorageError(err.to_string())
        }
    }
}

impl From<std::io::Error> for StateError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
