//! Relational source error types.

use thiserror::Error;

/// Errors that can occur while reading from the relational store.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    /// The connection could not be opened or was lost.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The query failed inside an open connection.
    #[error("Query error: {0}")]
    QueryError(String),

    /// A returned row did not have the expected shape.
    #[error("Decode error: {0}")]
    DecodeError(String),
}

impl SourceError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Whether the error means the connection must be reopened.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}
