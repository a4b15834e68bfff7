//! Raw records read from the relational store.
//!
//! One record type exists per entity family. Records live only between an
//! extraction call and the transformation of its batch.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::family::FamilyKind;

/// Role a person plays in a film work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonRole {
    Actor,
    Writer,
    Director,
}

impl PersonRole {
    /// Every role, in the order documents list them.
    pub const ALL: [PersonRole; 3] = [PersonRole::Actor, PersonRole::Writer, PersonRole::Director];

    /// Tag stored in `person_film_work.role`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonRole::Actor => "actor",
            PersonRole::Writer => "writer",
            PersonRole::Director => "director",
        }
    }
}

/// A film work row with its related persons and genres aggregated per film.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    pub film_type: Option<String>,
    pub modified: DateTime<Utc>,
    /// Person id to full name.
    pub persons: BTreeMap<Uuid, String>,
    /// Person id to every role tag the person holds in this film.
    pub person_roles: BTreeMap<Uuid, BTreeSet<String>>,
    /// Genre id to genre name.
    pub genres: BTreeMap<Uuid, String>,
}

impl MovieRecord {
    /// Create a film work record without relations.
    pub fn new(id: Uuid, title: impl Into<String>, modified: DateTime<Utc>) -> Self {
        Self {
            id,
            title: Some(title.into()),
            description: None,
            rating: None,
            film_type: None,
            modified,
            persons: BTreeMap::new(),
            person_roles: BTreeMap::new(),
            genres: BTreeMap::new(),
        }
    }

    /// Attach a person in the given role.
    pub fn with_person(mut self, id: Uuid, full_name: impl Into<String>, role: PersonRole) -> Self {
        self.persons.insert(id, full_name.into());
        self.person_roles
            .entry(id)
            .or_default()
            .insert(role.as_str().to_string());
        self
    }

    /// Attach a genre.
    pub fn with_genre(mut self, id: Uuid, name: impl Into<String>) -> Self {
        self.genres.insert(id, name.into());
        self
    }

    /// Ids of the persons tagged with `role`, in id order.
    pub fn person_ids_with_role(&self, role: PersonRole) -> impl Iterator<Item = &Uuid> {
        self.person_roles
            .iter()
            .filter(move |(_, tags)| tags.contains(role.as_str()))
            .map(|(id, _)| id)
    }
}

/// A person row.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonRecord {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub modified: DateTime<Utc>,
}

/// A genre row.
#[derive(Debug, Clone, PartialEq)]
pub struct GenreRecord {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    pub modified: DateTime<Utc>,
}

/// A row produced by an extraction query of any family.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Movie(MovieRecord),
    Person(PersonRecord),
    Genre(GenreRecord),
}

impl RawRecord {
    /// Family the record belongs to.
    pub fn kind(&self) -> FamilyKind {
        match self {
            RawRecord::Movie(_) => FamilyKind::Movies,
            RawRecord::Person(_) => FamilyKind::Persons,
            RawRecord::Genre(_) => FamilyKind::Genres,
        }
    }

    /// Identifier of the underlying row.
    pub fn id(&self) -> Uuid {
        match self {
            RawRecord::Movie(m) => m.id,
            RawRecord::Person(p) => p.id,
            RawRecord::Genre(g) => g.id,
        }
    }

    /// Modification time the row was ordered by.
    pub fn modified(&self) -> DateTime<Utc> {
        match self {
            RawRecord::Movie(m) => m.modified,
            RawRecord::Person(p) => p.modified,
            RawRecord::Genre(g) => g.modified,
        }
    }
}

/// A record was handed to a family expecting a different kind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Expected a {expected} record, got {actual}")]
pub struct RecordKindError {
    pub expected: FamilyKind,
    pub actual: FamilyKind,
}

macro_rules! record_conversion {
    ($record:ty, $variant:ident, $kind:expr) => {
        impl From<$record> for RawRecord {
            fn from(record: $record) -> Self {
                RawRecord::$variant(record)
            }
        }

        impl TryFrom<RawRecord> for $record {
            type Error = RecordKindError;

            fn try_from(raw: RawRecord) -> Result<Self, Self::Error> {
                match raw {
                    RawRecord::$variant(record) => Ok(record),
                    other => Err(RecordKindError {
                        expected: $kind,
                        actual: other.kind(),
                    }),
                }
            }
        }
    };
}

record_conversion!(MovieRecord, Movie, FamilyKind::Movies);
record_conversion!(PersonRecord, Person, FamilyKind::Persons);
record_conversion!(GenreRecord, Genre, FamilyKind::Genres);
