//! Extraction query templates.
//!
//! Every template binds `$1` (watermark), `$2` (page size) and `$3`
//! (offset), and returns rows ordered by modification time, then id, so
//! that consecutive pages neither overlap nor leave gaps.

use movies_etl_repository::BatchQuery;
use movies_etl_shared::{FamilyKind, Watermark};

/// Film works changed directly, through a person, or through a genre.
///
/// A film's change time is the latest of the matching changes. Persons and
/// genres are aggregated per film into `id -> value` JSON objects.
pub const MODIFIED_MOVIES_SQL: &str = r#"
WITH changed AS (
    SELECT fw.id, fw.modified
    FROM content.film_work fw
    WHERE fw.modified >= $1::timestamptz
    UNION ALL
    SELECT pfw.film_work_id, p.modified
    FROM content.person p
    INNER JOIN content.person_film_work pfw ON pfw.person_id = p.id
    WHERE p.modified >= $1::timestamptz
    UNION ALL
    SELECT gfw.film_work_id, g.modified
    FROM content.genre g
    INNER JOIN content.genre_film_work gfw ON gfw.genre_id = g.id
    WHERE g.modified >= $1::timestamptz
), page AS (
    SELECT id, MAX(modified) AS modified
    FROM changed
    GROUP BY id
    ORDER BY MAX(modified), id
    LIMIT $2 OFFSET $3
)
SELECT
    fw.id AS fw_id,
    fw.title,
    fw.description,
    fw.rating,
    fw.type,
    page.modified,
    COALESCE(
        JSON_OBJECT_AGG(p.id, p.full_name) FILTER (WHERE p.id IS NOT NULL),
        '{}'
    ) AS person,
    COALESCE(
        JSON_OBJECT_AGG(p.id::text || ':' || pfw.role, pfw.role) FILTER (WHERE p.id IS NOT NULL),
        '{}'
    ) AS pers_role,
    COALESCE(
        JSON_OBJECT_AGG(g.id, g.name) FILTER (WHERE g.id IS NOT NULL),
        '{}'
    ) AS genres
FROM page
INNER JOIN content.film_work fw ON fw.id = page.id
LEFT JOIN content.person_film_work pfw ON pfw.film_work_id = fw.id
LEFT JOIN content.person p ON p.id = pfw.person_id
LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id
LEFT JOIN content.genre g ON g.id = gfw.genre_id
GROUP BY fw.id, page.modified
ORDER BY page.modified, fw.id
"#;

/// Persons changed since the watermark.
pub const MODIFIED_PERSONS_SQL: &str = r#"
SELECT id, full_name, birth_date, modified
FROM content.person
WHERE modified >= $1::timestamptz
ORDER BY modified, id
LIMIT $2 OFFSET $3
"#;

/// Genres changed since the watermark.
pub const MODIFIED_GENRES_SQL: &str = r#"
SELECT id, name, description, modified
FROM content.genre
WHERE modified >= $1::timestamptz
ORDER BY modified, id
LIMIT $2 OFFSET $3
"#;

/// Template of a family.
pub fn template(kind: FamilyKind) -> &'static str {
    match kind {
        FamilyKind::Movies => MODIFIED_MOVIES_SQL,
        FamilyKind::Persons => MODIFIED_PERSONS_SQL,
        FamilyKind::Genres => MODIFIED_GENRES_SQL,
    }
}

/// Bind a family's template to concrete parameters.
pub fn batch_query(kind: FamilyKind, watermark: Watermark, limit: i64, offset: i64) -> BatchQuery {
    BatchQuery {
        kind,
        sql: template(kind),
        watermark,
        limit,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_bind_three_parameters() {
        for kind in FamilyKind::ALL {
            let sql = template(kind);
            assert!(sql.contains("$1::timestamptz"), "{}", kind);
            assert!(sql.contains("LIMIT $2 OFFSET $3"), "{}", kind);
            assert!(!sql.contains("$4"), "{}", kind);
        }
    }

    #[test]
    fn test_movies_template_follows_related_changes() {
        assert!(MODIFIED_MOVIES_SQL.contains("content.person p"));
        assert!(MODIFIED_MOVIES_SQL.contains("content.genre g"));
        assert!(MODIFIED_MOVIES_SQL.contains("AS pers_role"));
    }

    #[test]
    fn test_batch_query_uses_family_template() {
        let query = batch_query(FamilyKind::Genres, Watermark::min(), 100, 200);
        assert_eq!(query.sql, MODIFIED_GENRES_SQL);
        assert_eq!(query.next_offset(), 300);
    }
}
