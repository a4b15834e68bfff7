//! Row decoding per entity family.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::errors::SourceError;
use movies_etl_shared::{FamilyKind, GenreRecord, MovieRecord, PersonRecord, RawRecord};

/// Decode a row returned by the query of `kind`.
pub(crate) fn decode(kind: FamilyKind, row: &Row) -> Result<RawRecord, SourceError> {
    match kind {
        FamilyKind::Movies => decode_movie(row).map(RawRecord::Movie),
        FamilyKind::Persons => decode_person(row).map(RawRecord::Person),
        FamilyKind::Genres => decode_genre(row).map(RawRecord::Genre),
    }
}

fn decode_movie(row: &Row) -> Result<MovieRecord, SourceError> {
    Ok(MovieRecord {
        id: get::<Uuid>(row, "fw_id")?,
        title: get::<Option<String>>(row, "title")?,
        description: get::<Option<String>>(row, "description")?,
        rating: get::<Option<f64>>(row, "rating")?,
        film_type: get::<Option<String>>(row, "type")?,
        modified: get::<DateTime<Utc>>(row, "modified")?,
        persons: json_id_map(&get::<Value>(row, "person")?)?,
        person_roles: json_role_map(&get::<Value>(row, "pers_role")?)?,
        genres: json_id_map(&get::<Value>(row, "genres")?)?,
    })
}

fn decode_person(row: &Row) -> Result<PersonRecord, SourceError> {
    Ok(PersonRecord {
        id: get::<Uuid>(row, "id")?,
        full_name: get::<Option<String>>(row, "full_name")?,
        birth_date: get::<Option<NaiveDate>>(row, "birth_date")?,
        modified: get::<DateTime<Utc>>(row, "modified")?,
    })
}

fn decode_genre(row: &Row) -> Result<GenreRecord, SourceError> {
    Ok(GenreRecord {
        id: get::<Uuid>(row, "id")?,
        name: get::<Option<String>>(row, "name")?,
        description: get::<Option<String>>(row, "description")?,
        modified: get::<DateTime<Utc>>(row, "modified")?,
    })
}

fn get<'a, T>(row: &'a Row, column: &str) -> Result<T, SourceError>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(column)
        .map_err(|e| SourceError::decode(format!("column {}: {}", column, e)))
}

/// Convert a JSON object aggregate (`JSON_OBJECT_AGG(id, value)`) into a map
/// keyed by id.
///
/// `null` aggregates (a film without relations) decode to an empty map.
pub fn json_id_map(value: &Value) -> Result<BTreeMap<Uuid, String>, SourceError> {
    let Some(object) = json_object(value)? else {
        return Ok(BTreeMap::new());
    };

    object
        .iter()
        .map(|(key, value)| Ok((parse_id(key)?, text(value))))
        .collect()
}

/// Convert the role aggregate, keyed by `person_id:role`, into the set of
/// roles of every person.
///
/// A person credited in several roles on one film keeps all of them.
pub fn json_role_map(value: &Value) -> Result<BTreeMap<Uuid, BTreeSet<String>>, SourceError> {
    let mut roles: BTreeMap<Uuid, BTreeSet<String>> = BTreeMap::new();
    let Some(object) = json_object(value)? else {
        return Ok(roles);
    };

    for (key, value) in object {
        let (id, _) = key
            .split_once(':')
            .ok_or_else(|| SourceError::decode(format!("invalid role key {}", key)))?;
        roles.entry(parse_id(id)?).or_default().insert(text(value));
    }
    Ok(roles)
}

fn json_object(value: &Value) -> Result<Option<&serde_json::Map<String, Value>>, SourceError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(object) => Ok(Some(object)),
        other => Err(SourceError::decode(format!(
            "expected a JSON object aggregate, got {}",
            other
        ))),
    }
}

fn parse_id(key: &str) -> Result<Uuid, SourceError> {
    Uuid::parse_str(key).map_err(|e| SourceError::decode(format!("invalid id {}: {}", key, e)))
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
