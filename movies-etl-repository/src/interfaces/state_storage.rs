//! Cursor state storage trait definition.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::StateError;

/// Durable storage for the pipeline's cursor record.
///
/// The record is a flat map of string fields stored under one key. Backends
/// must survive process restarts; a single writer is assumed.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Replace the persisted record.
    async fn save_state(&self, state: &HashMap<String, String>) -> Result<(), StateError>;

    /// Read the persisted record.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - The current record
    /// * `Ok(None)` - If nothing has been persisted yet
    async fn retrieve_state(&self) -> Result<Option<HashMap<String, String>>, StateError>;
}
