//! Transformer module for the movies ETL pipeline.
//!
//! Turns typed records into search documents by applying an ordered list
//! of named field mappers.

mod mappers;

pub use mappers::{genre_mappers, movie_mappers, person_mappers};

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::errors::PipelineError;
use movies_etl_shared::{FamilyKind, GenreRecord, MovieRecord, PersonRecord, RawRecord, SearchDocument};

/// Routing key holding the document id.
pub const ID_FIELD: &str = "_id";

/// Routing key holding the target index.
pub const INDEX_FIELD: &str = "_index";

/// Partial document produced by one mapper.
pub type Fragment = Map<String, Value>;

/// A named, pure mapping step from a record to a document fragment.
pub struct FieldMapper<R> {
    pub name: &'static str,
    pub apply: fn(&R) -> Fragment,
}

impl<R> FieldMapper<R> {
    pub fn new(name: &'static str, apply: fn(&R) -> Fragment) -> Self {
        Self { name, apply }
    }
}

impl<R> Clone for FieldMapper<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for FieldMapper<R> {}

/// Build one document per record.
///
/// Fragments are merged in mapper order; a later fragment overwrites keys
/// set by an earlier one. The routing keys are then moved out of the body.
///
/// # Returns
///
/// * `Ok(documents)` - One document per record, in record order
/// * `Err(PipelineError)` - A record produced no usable routing keys
pub fn transform<R>(
    records: &[R],
    mappers: &[FieldMapper<R>],
    kind: FamilyKind,
) -> Result<Vec<SearchDocument>, PipelineError> {
    let documents = records
        .iter()
        .map(|record| {
            let mut body = Fragment::new();
            for mapper in mappers {
                body.extend((mapper.apply)(record));
            }
            into_document(body, kind)
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(family = %kind, documents = documents.len(), "Transformed batch");
    Ok(documents)
}

fn into_document(mut body: Fragment, kind: FamilyKind) -> Result<SearchDocument, PipelineError> {
    let id = take_routing(&mut body, ID_FIELD, kind)?;
    let index = take_routing(&mut body, INDEX_FIELD, kind)?;
    Ok(SearchDocument::new(index, id, body))
}

fn take_routing(body: &mut Fragment, key: &str, kind: FamilyKind) -> Result<String, PipelineError> {
    match body.remove(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value),
        other => Err(PipelineError::transformer(format!(
            "{} document has no usable {} (got {:?})",
            kind, key, other
        ))),
    }
}

/// Transform a batch returned by the extractor with the family's mappers.
#[instrument(skip(records), fields(rows = records.len()))]
pub fn transform_batch(
    kind: FamilyKind,
    records: Vec<RawRecord>,
) -> Result<Vec<SearchDocument>, PipelineError> {
    match kind {
        FamilyKind::Movies => transform(&typed::<MovieRecord>(records)?, &movie_mappers(), kind),
        FamilyKind::Persons => transform(&typed::<PersonRecord>(records)?, &person_mappers(), kind),
        FamilyKind::Genres => transform(&typed::<GenreRecord>(records)?, &genre_mappers(), kind),
    }
}

fn typed<R>(records: Vec<RawRecord>) -> Result<Vec<R>, PipelineError>
where
    R: TryFrom<RawRecord>,
    R::Error: std::fmt::Display,
{
    records
        .into_iter()
        .map(|record| R::try_from(record).map_err(|e| PipelineError::transformer(e.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Pair {
        key: &'static str,
        value: i64,
    }

    fn routing(pair: &Pair) -> Fragment {
        let mut fragment = Fragment::new();
        fragment.insert(ID_FIELD.to_string(), json!(pair.key));
        fragment.insert(INDEX_FIELD.to_string(), json!("pairs"));
        fragment
    }

    fn value(pair: &Pair) -> Fragment {
        let mut fragment = Fragment::new();
        fragment.insert("value".to_string(), json!(pair.value));
        fragment
    }

    fn doubled(pair: &Pair) -> Fragment {
        let mut fragment = Fragment::new();
        fragment.insert("value".to_string(), json!(pair.value * 2));
        fragment
    }

    #[test]
    fn test_later_fragments_win() {
        let records = [Pair { key: "a", value: 2 }];
        let mappers = [
            FieldMapper::new("routing", routing),
            FieldMapper::new("value", value),
            FieldMapper::new("doubled", doubled),
        ];

        let docs = transform(&records, &mappers, FamilyKind::Genres).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "a");
        assert_eq!(docs[0].index, "pairs");
        assert_eq!(docs[0].field("value"), Some(&json!(4)));
        assert!(docs[0].field(ID_FIELD).is_none());
    }

    #[test]
    fn test_missing_routing_is_rejected() {
        let records = [Pair { key: "a", value: 1 }];
        let mappers = [FieldMapper::new("value", value)];

        let err = transform(&records, &mappers, FamilyKind::Genres).unwrap_err();
        assert!(matches!(err, PipelineError::TransformerError(_)));
    }

    #[test]
    fn test_wrong_record_kind_is_rejected() {
        let genre = RawRecord::Genre(GenreRecord {
            id: uuid::Uuid::new_v4(),
            name: None,
            description: None,
            modified: chrono::Utc::now(),
        });

        let err = transform_batch(FamilyKind::Persons, vec![genre]).unwrap_err();
        assert!(matches!(err, PipelineError::TransformerError(_)));
    }
}
