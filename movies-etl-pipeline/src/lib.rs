//! # Movies ETL Pipeline
//!
//! This crate provides the pipeline components that keep the search index
//! in sync with the movies catalog.
//!
//! ## Architecture
//!
//! The pipeline follows the Extractor-Transformer-Loader pattern:
//!
//! 1. **Extractor**: Pages through rows changed since the watermark
//! 2. **Transformer**: Maps rows into search documents
//! 3. **Loader**: Upserts documents into the search index
//! 4. **Orchestrator**: Runs refresh cycles and advances the watermark
//!
//! Progress is persisted in the cursor [`state::State`], and every call to
//! an external system is retried with [`backoff::Backoff`].

pub mod backoff;
pub mod errors;
pub mod extractor;
pub mod loader;
pub mod orchestrator;
pub mod state;
pub mod transformer;

pub use backoff::{Backoff, RetryPolicy, Sleeper, TokioSleeper};
pub use errors::PipelineError;
pub use extractor::{Extractor, QueryErrorPolicy};
pub use loader::SearchLoader;
pub use orchestrator::{Clock, CycleReport, FamilyReport, Orchestrator, OrchestratorConfig, SystemClock};
pub use state::State;
