//! Redis-backed cursor storage.
//!
//! The record is kept as a Redis hash under the base key.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use tracing::info;

use crate::config::RedisConfig;
use crate::errors::StateError;
use crate::interfaces::StateStorage;

/// Cursor storage persisted in a Redis hash.
#[derive(Clone)]
pub struct RedisStorage {
    connection: MultiplexedConnection,
    base_key: String,
}

impl RedisStorage {
    /// Connect to Redis and verify the server answers.
    ///
    /// # Returns
    ///
    /// * `Ok(RedisStorage)` - If the server answered `PING`
    /// * `Err(StateError)` - If the connection or the probe failed
    pub async fn connect(config: &RedisConfig, base_key: impl Into<String>) -> Result<Self, StateError> {
        let url = config.url()?;
        let client = redis::Client::open(url.as_str())
            .map_err(|e| StateError::connection(e.to_string()))?;
        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StateError::connection(e.to_string()))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| StateError::connection(e.to_string()))?;

        let base_key = base_key.into();
        info!(host = %config.host, port = config.port, db = config.db, key = %base_key, "Connected to Redis state storage");

        Ok(Self {
            connection,
            base_key,
        })
    }
}

#[async_trait]
impl StateStorage for RedisStorage {
    async fn save_state(&self, state: &HashMap<String, String>) -> Result<(), StateError> {
        if state.is_empty() {
            return Ok(());
        }

        let items: Vec<(&str, &str)> = state
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();

        let mut connection = self.connection.clone();
        let _: () = connection.hset_multiple(&self.base_key, &items).await?;
        Ok(())
    }

    async fn retrieve_state(&self) -> Result<Option<HashMap<String, String>>, StateError> {
        let mut connection = self.connection.clone();
        let state: HashMap<String, String> = connection.hgetall(&self.base_key).await?;

        if state.is_empty() {
            Ok(None)
        } else {
            Ok(Some(state))
        }
    }
}
