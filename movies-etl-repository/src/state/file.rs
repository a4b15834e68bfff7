//! JSON file cursor storage.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::errors::StateError;
use crate::interfaces::StateStorage;

/// Cursor storage persisted as a JSON object on the local filesystem.
///
/// Writes go to a sibling temporary file first and are renamed over the
/// target, so a crash never leaves a truncated record behind.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Create a storage writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the record.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStorage for JsonFileStorage {
    async fn save_state(&self, state: &HashMap<String, String>) -> Result<(), StateError> {
        let bytes = serde_json::to_vec_pretty(state)?;
        let temp = self.temp_path();
        fs::write(&temp, bytes).await?;
        fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    async fn retrieve_state(&self) -> Result<Option<HashMap<String, String>>, StateError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("state.json"));

        assert!(storage.retrieve_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = HashMap::new();
        state.insert("datetime".to_string(), "2024-01-01 00:00:00".to_string());
        state.insert("offset".to_string(), "300".to_string());
        JsonFileStorage::new(&path).save_state(&state).await.unwrap();

        let reopened = JsonFileStorage::new(&path);
        assert_eq!(reopened.retrieve_state().await.unwrap(), Some(state));
        assert!(!reopened.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = JsonFileStorage::new(&path).retrieve_state().await.unwrap_err();
        assert!(matches!(err, StateError::SerializationError(_)));
    }
}
