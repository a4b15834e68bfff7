//! # Movies ETL Repository
//!
//! This crate provides traits and implementations for the external systems
//! the movies ETL talks to: the relational catalog, the search engine and
//! the cursor store. It includes definitions for errors, interfaces, and
//! concrete implementations for PostgreSQL, OpenSearch, Redis and local
//! files.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod postgres;
pub mod state;
pub mod types;

pub use config::{PostgresConfig, RedisConfig};
pub use errors::{SearchError, SourceError, StateError};
pub use interfaces::{
    SearchConnector, SearchEngineClient, SourceConnection, SourceConnector, StateStorage,
};
pub use opensearch::{OpenSearchClient, OpenSearchConnector};
pub use postgres::{PostgresConnection, PostgresConnector};
pub use state::{JsonFileStorage, MemoryStorage, RedisStorage};
pub use types::{BatchQuery, BulkItemError, BulkSummary};
