//! # Movies ETL Shared
//!
//! Types shared between the repository and pipeline crates:
//!
//! - **Records**: typed rows read from the relational store, one kind per
//!   entity family
//! - **Documents**: routed search documents ready for a bulk upsert
//! - **Watermark**: the "modified since" boundary persisted between cycles

pub mod document;
pub mod family;
pub mod record;
pub mod watermark;

pub use document::SearchDocument;
pub use family::FamilyKind;
pub use record::{GenreRecord, MovieRecord, PersonRecord, PersonRole, RawRecord, RecordKindError};
pub use watermark::{Watermark, WatermarkParseError};
