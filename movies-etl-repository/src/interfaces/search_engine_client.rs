//! Search engine client trait definition.
//!
//! This module defines the abstract interface for search engine operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;
use crate::types::BulkSummary;
use movies_etl_shared::SearchDocument;

/// Opens connections to a search engine.
///
/// The loader calls `connect` on every (re)connect attempt and drops the
/// returned client once a batch has been written.
#[async_trait]
pub trait SearchConnector: Send + Sync {
    /// Open a new client.
    ///
    /// # Returns
    ///
    /// * `Ok(client)` - A client that has not been probed yet
    /// * `Err(SearchError)` - If the client cannot be built
    async fn connect(&self) -> Result<Box<dyn SearchEngineClient>, SearchError>;
}

/// Abstract interface for search engine operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Check if the search engine is reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine answered the probe
    /// * `Ok(false)` - If it answered with a failure status
    /// * `Err(SearchError)` - If the probe could not be sent
    async fn ping(&self) -> Result<bool, SearchError>;

    /// Upsert documents in a single bulk request.
    ///
    /// Each document is written to its own `index` under its own `id`,
    /// replacing any previous version.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkSummary)` - Acknowledged and rejected counts
    /// * `Err(SearchError)` - If the request as a whole failed
    async fn bulk_upsert(&self, documents: &[SearchDocument]) -> Result<BulkSummary, SearchError>;

    /// Ensure an index exists, creating it with `settings` when missing.
    ///
    /// # Arguments
    ///
    /// * `index` - Name of the index
    /// * `settings` - Index settings and mappings used on creation
    async fn ensure_index_exists(&self, index: &str, settings: &Value) -> Result<(), SearchError>;
}
