//! PostgreSQL implementation of the relational source.

mod rows;
mod source;

pub use rows::json_id_map;
pub use source::{PostgresConnection, PostgresConnector};
