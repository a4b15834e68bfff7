//! In-memory cursor storage.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::StateError;
use crate::interfaces::StateStorage;

/// Cursor storage kept in process memory.
///
/// Does not survive restarts; used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<Option<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage holding an existing record.
    pub fn with_state(state: HashMap<String, String>) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> Option<HashMap<String, String>> {
        self.state.lock().ok().and_then(|state| state.clone())
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn save_state(&self, state: &HashMap<String, String>) -> Result<(), StateError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StateError::storage(e.to_string()))?;
        *guard = Some(state.clone());
        Ok(())
    }

    async fn retrieve_state(&self) -> Result<Option<HashMap<String, String>>, StateError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StateError::storage(e.to_string()))?;
        Ok(guard.clone())
    }
}
