//! OpenSearch index configuration and mappings.
//!
//! This module defines the settings and mappings of the `movies`, `persons`
//! and `genres` indices.

use serde_json::{json, Value};

use movies_etl_shared::FamilyKind;

/// Shared analysis settings.
///
/// Text fields are analyzed with a lowercase, stop-word and stemming chain
/// for both English and Russian content.
fn analysis() -> Value {
    json!({
        "refresh_interval": "1s",
        "analysis": {
            "filter": {
                "english_stop": {"type": "stop", "stopwords": "_english_"},
                "english_stemmer": {"type": "stemmer", "language": "english"},
                "english_possessive_stemmer": {"type": "stemmer", "language": "possessive_english"},
                "russian_stop": {"type": "stop", "stopwords": "_russian_"},
                "russian_stemmer": {"type": "stemmer", "language": "russian"}
            },
            "analyzer": {
                "ru_en": {
                    "tokenizer": "standard",
                    "filter": [
                        "lowercase",
                        "english_stop",
                        "english_stemmer",
                        "english_possessive_stemmer",
                        "russian_stop",
                        "russian_stemmer"
                    ]
                }
            }
        }
    })
}

fn person_refs() -> Value {
    json!({
        "type": "nested",
        "dynamic": "strict",
        "properties": {
            "uuid": {"type": "keyword"},
            "full_name": {"type": "text", "analyzer": "ru_en"}
        }
    })
}

/// Settings and mappings for the `movies` index.
pub fn movies_index_settings() -> Value {
    json!({
        "settings": analysis(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "uuid": {"type": "keyword"},
                "imdb_rating": {"type": "float"},
                "title": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "description": {"type": "text", "analyzer": "ru_en"},
                "genres": {
                    "type": "nested",
                    "dynamic": "strict",
                    "properties": {
                        "uuid": {"type": "keyword"},
                        "name": {"type": "keyword"}
                    }
                },
                "actors": person_refs(),
                "writers": person_refs(),
                "directors": person_refs()
            }
        }
    })
}

/// Settings and mappings for the `persons` index.
pub fn persons_index_settings() -> Value {
    json!({
        "settings": analysis(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "uuid": {"type": "keyword"},
                "full_name": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "birth_date": {"type": "date"}
            }
        }
    })
}

/// Settings and mappings for the `genres` index.
pub fn genres_index_settings() -> Value {
    json!({
        "settings": analysis(),
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "uuid": {"type": "keyword"},
                "name": {
                    "type": "text",
                    "analyzer": "ru_en",
                    "fields": {"raw": {"type": "keyword"}}
                },
                "description": {"type": "text", "analyzer": "ru_en"}
            }
        }
    })
}

/// Settings and mappings of the index a family is written to.
pub fn index_settings(kind: FamilyKind) -> Value {
    match kind {
        FamilyKind::Movies => movies_index_settings(),
        FamilyKind::Persons => persons_index_settings(),
        FamilyKind::Genres => genres_index_settings(),
    }
}
