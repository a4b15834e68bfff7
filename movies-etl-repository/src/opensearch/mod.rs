//! OpenSearch implementation of the search engine client.
//!
//! This module provides a concrete implementation of `SearchEngineClient`
//! using OpenSearch as the backend.

mod bulk;
mod client;
mod index_config;

pub use client::{OpenSearchClient, OpenSearchConnector};
pub use index_config::{
    genres_index_settings, index_settings, movies_index_settings, persons_index_settings,
};
