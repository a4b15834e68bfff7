//! Error types for the movies ETL pipeline.

use movies_etl_repository::{SearchError, SourceError, StateError};
use thiserror::Error;

/// Errors that can occur in the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the extractor component.
    #[error("Extractor error: {0}")]
    ExtractorError(String),

    /// Error from the transformer component.
    #[error("Transformer error: {0}")]
    TransformerError(String),

    /// Error from the loader component.
    #[error("Loader error: {0}")]
    LoaderError(String),

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from the relational source.
    #[error("Source error: {0}")]
    SourceError(#[from] SourceError),

    /// Error from the search engine.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    /// Error from the cursor store.
    #[error("State error: {0}")]
    StateError(#[from] StateError),
}

impl PipelineError {
    /// Create an extractor error.
    pub fn extractor(msg: impl Into<String>) -> Self {
        Self::ExtractorError(msg.into())
    }

    /// Create a transformer error.
    pub fn transformer(msg: impl Into<String>) -> Self {
        Self::TransformerError(msg.into())
    }

    /// Create a loader error.
    pub fn loader(msg: impl Into<String>) -> Self {
        Self::LoaderError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
