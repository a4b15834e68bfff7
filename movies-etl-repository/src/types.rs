//! Request and response types shared by the backends.

use movies_etl_shared::{FamilyKind, Watermark};

/// A concrete extraction query: a family's template plus the three
/// positional parameters it is executed with.
///
/// Parameters bind in order as `$1` (watermark), `$2` (page size) and
/// `$3` (offset).
#[derive(Debug, Clone, PartialEq)]
pub struct BatchQuery {
    /// Family whose rows the query returns.
    pub kind: FamilyKind,
    /// Parametrized SQL text.
    pub sql: &'static str,
    /// Inclusive "modified since" boundary.
    pub watermark: Watermark,
    /// Page size.
    pub limit: i64,
    /// Rows to skip.
    pub offset: i64,
}

impl BatchQuery {
    /// Position of the first row after this page.
    pub fn next_offset(&self) -> i64 {
        self.offset + self.limit
    }
}

/// Failure reported for a single document of a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemError {
    /// Target index of the rejected document.
    pub index: String,
    /// Identifier of the rejected document.
    pub id: String,
    /// Reason reported by the search engine.
    pub reason: String,
}

/// Summary of a bulk upsert.
///
/// A bulk write succeeded only when `succeeded == total`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkSummary {
    /// Number of documents submitted.
    pub total: usize,
    /// Number of documents the search engine acknowledged.
    pub succeeded: usize,
    /// Per-document failures.
    pub errors: Vec<BulkItemError>,
}

impl BulkSummary {
    /// Summary of a fully acknowledged request.
    pub fn complete(total: usize) -> Self {
        Self {
            total,
            succeeded: total,
            errors: Vec::new(),
        }
    }

    /// Whether every submitted document was acknowledged.
    pub fn is_complete(&self) -> bool {
        self.succeeded == self.total
    }

    /// Number of documents not acknowledged.
    pub fn failed(&self) -> usize {
        self.total.saturating_sub(self.succeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_summary_is_incomplete() {
        let summary = BulkSummary {
            total: 3,
            succeeded: 2,
            errors: vec![BulkItemError {
                index: "movies".to_string(),
                id: "x".to_string(),
                reason: "mapper_parsing_exception".to_string(),
            }],
        };

        assert!(!summary.is_complete());
        assert_eq!(summary.failed(), 1);
        assert!(BulkSummary::complete(3).is_complete());
    }
}
