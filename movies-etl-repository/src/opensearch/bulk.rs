//! Bulk request bodies and bulk response parsing.

use opensearch::http::request::JsonBody;
use serde_json::{json, Value};

use crate::types::{BulkItemError, BulkSummary};
use movies_etl_shared::SearchDocument;

/// Build the NDJSON body of a bulk upsert.
///
/// Every document becomes an `index` action routed by its own index and id,
/// which replaces any existing document with the same key.
pub fn build_body(documents: &[SearchDocument]) -> Vec<JsonBody<Value>> {
    let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);

    for doc in documents {
        body.push(json!({"index": {"_index": doc.index, "_id": doc.id}}).into());
        body.push(Value::Object(doc.source.clone()).into());
    }

    body
}

/// Count acknowledged documents in a bulk response.
///
/// An item counts as acknowledged when it carries a 2xx status and no
/// `error`. Items missing from the response count as failures.
pub fn parse_response(response: &Value, submitted: usize) -> BulkSummary {
    let empty = Vec::new();
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    let mut succeeded = 0;
    let mut errors = Vec::new();

    for item in items {
        // Each item is keyed by its action name.
        let Some(result) = item.as_object().and_then(|o| o.values().next()) else {
            continue;
        };

        let status = result.get("status").and_then(Value::as_u64).unwrap_or(0);
        match result.get("error") {
            None if (200..300).contains(&status) => succeeded += 1,
            error => errors.push(BulkItemError {
                index: string_field(result, "_index"),
                id: string_field(result, "_id"),
                reason: error
                    .map(error_reason)
                    .unwrap_or_else(|| format!("status {}", status)),
            }),
        }
    }

    BulkSummary {
        total: submitted,
        succeeded: succeeded.min(submitted),
        errors,
    }
}

fn string_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn error_reason(error: &Value) -> String {
    match error.get("reason").and_then(Value::as_str) {
        Some(reason) => {
            let kind = error.get("type").and_then(Value::as_str).unwrap_or("error");
            format!("{}: {}", kind, reason)
        }
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn doc(index: &str, id: &str) -> SearchDocument {
        let mut source = Map::new();
        source.insert("uuid".to_string(), json!(id));
        SearchDocument::new(index, id, source)
    }

    #[test]
    fn test_build_body_pairs_action_and_source() {
        let body = build_body(&[doc("movies", "a"), doc("genres", "b")]);
        assert_eq!(body.len(), 4);
    }

    #[test]
    fn test_parse_response_all_acknowledged() {
        let response = json!({
            "took": 3,
            "errors": false,
            "items": [
                {"index": {"_index": "movies", "_id": "a", "status": 201}},
                {"index": {"_index": "movies", "_id": "b", "status": 200}}
            ]
        });

        let summary = parse_response(&response, 2);
        assert!(summary.is_complete());
        assert!(summary.errors.is_empty());
    }

    #[test]
    fn test_parse_response_partial_failure() {
        let response = json!({
            "errors": true,
            "items": [
                {"index": {"_index": "movies", "_id": "a", "status": 201}},
                {"index": {
                    "_index": "movies",
                    "_id": "b",
                    "status": 400,
                    "error": {"type": "mapper_parsing_exception", "reason": "failed to parse field [imdb_rating]"}
                }}
            ]
        });

        let summary = parse_response(&response, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].id, "b");
        assert_eq!(
            summary.errors[0].reason,
            "mapper_parsing_exception: failed to parse field [imdb_rating]"
        );
    }

    #[test]
    fn test_parse_response_without_items_acknowledges_nothing() {
        let summary = parse_response(&json!({"errors": true}), 5);
        assert_eq!(summary.succeeded, 0);
        assert!(!summary.is_complete());
    }
}
