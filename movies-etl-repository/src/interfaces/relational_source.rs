//! Relational source trait definitions.

use async_trait::async_trait;

use crate::errors::SourceError;
use crate::types::BatchQuery;
use movies_etl_shared::RawRecord;

/// Opens connections to the relational store.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Open a new connection.
    async fn connect(&self) -> Result<Box<dyn SourceConnection>, SourceError>;
}

/// An open connection to the relational store.
///
/// Dropping the connection closes it.
#[async_trait]
pub trait SourceConnection: Send {
    /// Execute an extraction query and decode its rows.
    ///
    /// # Returns
    ///
    /// * `Ok(records)` - Rows of `query.kind`, in query order
    /// * `Err(SourceError::ConnectionError)` - The connection is no longer usable
    /// * `Err(SourceError)` - The query or row decoding failed
    async fn fetch(&mut self, query: &BatchQuery) -> Result<Vec<RawRecord>, SourceError>;
}
