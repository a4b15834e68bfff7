//! Field mappers of each family.
//!
//! Mappers are pure and null-safe: a missing column becomes `null`, never
//! an error.

use serde_json::{json, Value};
use uuid::Uuid;

use super::{FieldMapper, Fragment, ID_FIELD, INDEX_FIELD};
use movies_etl_shared::{FamilyKind, GenreRecord, MovieRecord, PersonRecord, PersonRole};

fn fragment<const N: usize>(fields: [(&str, Value); N]) -> Fragment {
    fields
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn routing(id: &Uuid, kind: FamilyKind) -> Fragment {
    fragment([
        (ID_FIELD, json!(id.to_string())),
        (INDEX_FIELD, json!(kind.index_name())),
    ])
}

/// Mappers producing `movies` documents.
pub fn movie_mappers() -> Vec<FieldMapper<MovieRecord>> {
    vec![
        FieldMapper::new("routing", |m: &MovieRecord| routing(&m.id, FamilyKind::Movies)),
        FieldMapper::new("uuid", |m: &MovieRecord| fragment([("uuid", json!(m.id.to_string()))])),
        FieldMapper::new("title", |m: &MovieRecord| fragment([("title", json!(m.title))])),
        FieldMapper::new("description", |m: &MovieRecord| {
            fragment([("description", json!(m.description))])
        }),
        FieldMapper::new("imdb_rating", |m: &MovieRecord| fragment([("imdb_rating", json!(m.rating))])),
        FieldMapper::new("actors", |m: &MovieRecord| {
            fragment([("actors", persons_in_role(m, PersonRole::Actor))])
        }),
        FieldMapper::new("writers", |m: &MovieRecord| {
            fragment([("writers", persons_in_role(m, PersonRole::Writer))])
        }),
        FieldMapper::new("directors", |m: &MovieRecord| {
            fragment([("directors", persons_in_role(m, PersonRole::Director))])
        }),
        FieldMapper::new("genres", |m: &MovieRecord| {
            let genres: Vec<Value> = m
                .genres
                .iter()
                .map(|(id, name)| json!({"uuid": id.to_string(), "name": name}))
                .collect();
            fragment([("genres", Value::Array(genres))])
        }),
    ]
}

fn persons_in_role(movie: &MovieRecord, role: PersonRole) -> Value {
    let persons = movie
        .person_ids_with_role(role)
        .map(|id| {
            json!({
                "uuid": id.to_string(),
                "full_name": movie.persons.get(id),
            })
        })
        .collect();
    Value::Array(persons)
}

/// Mappers producing `persons` documents.
pub fn person_mappers() -> Vec<FieldMapper<PersonRecord>> {
    vec![
        FieldMapper::new("routing", |p: &PersonRecord| routing(&p.id, FamilyKind::Persons)),
        FieldMapper::new("uuid", |p: &PersonRecord| fragment([("uuid", json!(p.id.to_string()))])),
        FieldMapper::new("full_name", |p: &PersonRecord| fragment([("full_name", json!(p.full_name))])),
        FieldMapper::new("birth_date", |p: &PersonRecord| {
            let birth_date = p.birth_date.map(|d| d.format("%Y-%m-%d").to_string());
            fragment([("birth_date", json!(birth_date))])
        }),
    ]
}

/// Mappers producing `genres` documents.
pub fn genre_mappers() -> Vec<FieldMapper<GenreRecord>> {
    vec![
        FieldMapper::new("routing", |g: &GenreRecord| routing(&g.id, FamilyKind::Genres)),
        FieldMapper::new("uuid", |g: &GenreRecord| fragment([("uuid", json!(g.id.to_string()))])),
        FieldMapper::new("name", |g: &GenreRecord| fragment([("name", json!(g.name))])),
        FieldMapper::new("description", |g: &GenreRecord| {
            fragment([("description", json!(g.description))])
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::super::transform;
    use super::*;
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_roles_do_not_leak_into_each_other() {
        let actor = Uuid::new_v4();
        let writer = Uuid::new_v4();
        let director = Uuid::new_v4();
        let movie = MovieRecord::new(Uuid::new_v4(), "Stalker", Utc::now())
            .with_person(actor, "Alisa Freindlich", PersonRole::Actor)
            .with_person(writer, "Arkady Strugatsky", PersonRole::Writer)
            .with_person(director, "Andrei Tarkovsky", PersonRole::Director);

        let docs = transform(&[movie], &movie_mappers(), FamilyKind::Movies).unwrap();
        let doc = &docs[0];

        assert_eq!(
            doc.field("actors"),
            Some(&json!([{"uuid": actor.to_string(), "full_name": "Alisa Freindlich"}]))
        );
        assert_eq!(
            doc.field("writers"),
            Some(&json!([{"uuid": writer.to_string(), "full_name": "Arkady Strugatsky"}]))
        );
        assert_eq!(
            doc.field("directors"),
            Some(&json!([{"uuid": director.to_string(), "full_name": "Andrei Tarkovsky"}]))
        );
    }

    #[test]
    fn test_person_listed_under_each_of_their_roles() {
        let author = Uuid::new_v4();
        let movie = MovieRecord::new(Uuid::new_v4(), "Mirror", Utc::now())
            .with_person(author, "Andrei Tarkovsky", PersonRole::Writer)
            .with_person(author, "Andrei Tarkovsky", PersonRole::Director);

        let docs = transform(&[movie], &movie_mappers(), FamilyKind::Movies).unwrap();
        let expected = json!([{"uuid": author.to_string(), "full_name": "Andrei Tarkovsky"}]);

        assert_eq!(docs[0].field("writers"), Some(&expected));
        assert_eq!(docs[0].field("directors"), Some(&expected));
        assert_eq!(docs[0].field("actors"), Some(&json!([])));
    }

    #[test]
    fn test_movie_document_shape() {
        let id = Uuid::new_v4();
        let genre = Uuid::new_v4();
        let mut movie = MovieRecord::new(id, "Solaris", Utc::now()).with_genre(genre, "Sci-Fi");
        movie.rating = Some(8.1);
        movie.film_type = Some("movie".to_string());

        let docs = transform(&[movie], &movie_mappers(), FamilyKind::Movies).unwrap();
        let doc = &docs[0];

        assert_eq!(doc.index, "movies");
        assert_eq!(doc.id, id.to_string());
        assert_eq!(doc.field("uuid"), Some(&json!(id.to_string())));
        assert_eq!(doc.field("title"), Some(&json!("Solaris")));
        assert_eq!(doc.field("description"), Some(&Value::Null));
        assert_eq!(doc.field("imdb_rating"), Some(&json!(8.1)));
        assert_eq!(doc.field("actors"), Some(&json!([])));
        assert_eq!(
            doc.field("genres"),
            Some(&json!([{"uuid": genre.to_string(), "name": "Sci-Fi"}]))
        );
        assert!(doc.field("film_type").is_none());
        assert_eq!(doc.source.len(), 8);
    }

    #[test]
    fn test_person_and_genre_documents() {
        let person = PersonRecord {
            id: Uuid::new_v4(),
            full_name: Some("Natalya Bondarchuk".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1950, 5, 10),
            modified: Utc::now(),
        };
        let genre = GenreRecord {
            id: Uuid::new_v4(),
            name: Some("Drama".to_string()),
            description: None,
            modified: Utc::now(),
        };

        let persons = transform(&[person], &person_mappers(), FamilyKind::Persons).unwrap();
        assert_eq!(persons[0].index, "persons");
        assert_eq!(persons[0].field("birth_date"), Some(&json!("1950-05-10")));

        let genres = transform(&[genre], &genre_mappers(), FamilyKind::Genres).unwrap();
        assert_eq!(genres[0].index, "genres");
        assert_eq!(genres[0].field("name"), Some(&json!("Drama")));
        assert_eq!(genres[0].field("description"), Some(&Value::Null));
    }
}
