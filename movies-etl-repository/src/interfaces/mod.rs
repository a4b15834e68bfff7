//! Interface definitions for the external systems the pipeline talks to.
//!
//! The traits allow dependency injection: the pipeline owns connections
//! through these interfaces and tests swap in in-memory doubles.

mod relational_source;
mod search_engine_client;
mod state_storage;

pub use relational_source::{SourceConnection, SourceConnector};
pub use search_engine_client::{SearchConnector, SearchEngineClient};
pub use state_storage::StateStorage;
