//! Extractor module for the movies ETL pipeline.
//!
//! Pages through the rows of a family changed since a watermark.

pub mod queries;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::backoff::RetryPolicy;
use crate::errors::PipelineError;
use movies_etl_repository::{SourceConnection, SourceConnector};
use movies_etl_shared::{FamilyKind, RawRecord, Watermark};

/// What to do when a query fails inside an open connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryErrorPolicy {
    /// Log the failure and report an empty page, ending the family's pass.
    #[default]
    Skip,
    /// Abort the run with an extractor error.
    Fail,
}

impl FromStr for QueryErrorPolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(PipelineError::config(format!(
                "Unknown query error policy '{}', expected 'skip' or 'fail'",
                other
            ))),
        }
    }
}

impl fmt::Display for QueryErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Fail => f.write_str("fail"),
        }
    }
}

/// Extractor that reads changed rows from the relational store.
///
/// The extractor owns at most one connection. It is opened lazily, reopened
/// with backoff whenever it is lost, and closed once a family is drained.
pub struct Extractor {
    connector: Arc<dyn SourceConnector>,
    connection: Option<Box<dyn SourceConnection>>,
    retry: RetryPolicy,
    policy: QueryErrorPolicy,
}

impl Extractor {
    /// Create a new extractor with the default query error policy.
    pub fn new(connector: Arc<dyn SourceConnector>, retry: RetryPolicy) -> Self {
        Self::with_policy(connector, retry, QueryErrorPolicy::default())
    }

    /// Create a new extractor with an explicit query error policy.
    pub fn with_policy(
        connector: Arc<dyn SourceConnector>,
        retry: RetryPolicy,
        policy: QueryErrorPolicy,
    ) -> Self {
        Self {
            connector,
            connection: None,
            retry,
            policy,
        }
    }

    /// Whether a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Fetch the page of `kind` rows changed since `watermark` starting at
    /// `offset`.
    ///
    /// A lost connection is reopened and the same page is requested again.
    /// An empty page means the family is drained; the connection is closed
    /// before returning it.
    ///
    /// # Returns
    ///
    /// * `Ok(records)` - Up to `batch_size` records ordered by change time
    /// * `Err(PipelineError)` - A query failed under [`QueryErrorPolicy::Fail`]
    #[instrument(skip(self), fields(family = %kind))]
    pub async fn next_batch(
        &mut self,
        kind: FamilyKind,
        watermark: Watermark,
        batch_size: i64,
        offset: i64,
    ) -> Result<Vec<RawRecord>, PipelineError> {
        let query = queries::batch_query(kind, watermark, batch_size, offset);
        let mut attempts = self.retry.attempts("relational query", kind);

        loop {
            if self.connection.is_none() {
                let connector = &self.connector;
                let connection = self
                    .retry
                    .retry("relational connect", kind, move || connector.connect())
                    .await;
                info!(family = %kind, "Postgres connection opened");
                self.connection = Some(connection);
            }

            let Some(connection) = self.connection.as_mut() else {
                continue;
            };

            match connection.fetch(&query).await {
                Ok(records) => {
                    debug!(
                        family = %kind,
                        watermark = %watermark,
                        batch_size,
                        offset,
                        rows = records.len(),
                        "Fetched batch"
                    );
                    if records.is_empty() {
                        info!(family = %kind, watermark = %watermark, "No more changed rows");
                        self.close(kind);
                    }
                    return Ok(records);
                }
                Err(e) if e.is_connection() => {
                    warn!(family = %kind, offset, error = %e, "Postgres connection lost");
                    self.connection = None;
                    attempts.failed(&e).await;
                }
                Err(e) => {
                    error!(family = %kind, offset, policy = %self.policy, error = %e, "Extraction query failed");
                    self.close(kind);
                    return match self.policy {
                        QueryErrorPolicy::Skip => Ok(Vec::new()),
                        QueryErrorPolicy::Fail => Err(PipelineError::extractor(format!(
                            "{} query at offset {} failed: {}",
                            kind, offset, e
                        ))),
                    };
                }
            }
        }
    }

    /// Close the connection, if one is open.
    pub fn close(&mut self, kind: FamilyKind) {
        if self.connection.take().is_some() {
            info!(family = %kind, "Postgres connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::testing::recording_policy;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use movies_etl_repository::{BatchQuery, SourceError};
    use movies_etl_shared::GenreRecord;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Scripted source: each fetch pops the next outcome.
    struct ScriptedConnector {
        refusals: AtomicUsize,
        connects: AtomicUsize,
        outcomes: Arc<Mutex<VecDeque<Result<Vec<RawRecord>, SourceError>>>>,
        queries: Arc<Mutex<Vec<BatchQuery>>>,
    }

    impl ScriptedConnector {
        fn new(refusals: usize, outcomes: Vec<Result<Vec<RawRecord>, SourceError>>) -> Self {
            Self {
                refusals: AtomicUsize::new(refusals),
                connects: AtomicUsize::new(0),
                outcomes: Arc::new(Mutex::new(outcomes.into())),
                queries: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    struct ScriptedConnection {
        outcomes: Arc<Mutex<VecDeque<Result<Vec<RawRecord>, SourceError>>>>,
        queries: Arc<Mutex<Vec<BatchQuery>>>,
    }

    #[async_trait]
    impl SourceConnector for ScriptedConnector {
        async fn connect(&self) -> Result<Box<dyn SourceConnection>, SourceError> {
            let refused = self
                .refusals
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                return Err(SourceError::connection("connection refused"));
            }
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedConnection {
                outcomes: self.outcomes.clone(),
                queries: self.queries.clone(),
            }))
        }
    }

    #[async_trait]
    impl SourceConnection for ScriptedConnection {
        async fn fetch(&mut self, query: &BatchQuery) -> Result<Vec<RawRecord>, SourceError> {
            self.queries.lock().unwrap().push(query.clone());
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn genre(name: &str) -> RawRecord {
        RawRecord::Genre(GenreRecord {
            id: Uuid::new_v4(),
            name: Some(name.to_string()),
            description: None,
            modified: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        })
    }

    #[tokio::test]
    async fn test_reconnects_with_backoff_until_source_accepts() {
        let connector = Arc::new(ScriptedConnector::new(3, vec![Ok(vec![genre("Drama")])]));
        let (policy, sleeper) = recording_policy();
        let mut extractor = Extractor::new(connector.clone(), policy);

        let batch = extractor
            .next_batch(FamilyKind::Genres, Watermark::min(), 10, 0)
            .await
            .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(sleeper.secs().len(), 3);
        assert!(extractor.is_connected());
    }

    #[tokio::test]
    async fn test_lost_connection_reissues_same_page() {
        let connector = Arc::new(ScriptedConnector::new(
            0,
            vec![
                Err(SourceError::connection("server closed the connection")),
                Ok(vec![genre("Comedy"), genre("Horror")]),
            ],
        ));
        let (policy, _sleeper) = recording_policy();
        let mut extractor = Extractor::new(connector.clone(), policy);

        let batch = extractor
            .next_batch(FamilyKind::Genres, Watermark::min(), 2, 40)
            .await
            .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 2);
        let queries = connector.queries.lock().unwrap();
        assert_eq!(queries.len(), 2);
        assert!(queries.iter().all(|q| q.offset == 40 && q.limit == 2));
    }

    #[tokio::test]
    async fn test_empty_page_closes_connection() {
        let connector = Arc::new(ScriptedConnector::new(0, vec![Ok(Vec::new())]));
        let (policy, _sleeper) = recording_policy();
        let mut extractor = Extractor::new(connector, policy);

        let batch = extractor
            .next_batch(FamilyKind::Persons, Watermark::min(), 10, 0)
            .await
            .unwrap();

        assert!(batch.is_empty());
        assert!(!extractor.is_connected());
    }

    #[tokio::test]
    async fn test_query_failure_is_skipped_by_default() {
        let connector = Arc::new(ScriptedConnector::new(
            0,
            vec![Err(SourceError::query("relation \"content.genre\" does not exist"))],
        ));
        let (policy, sleeper) = recording_policy();
        let mut extractor = Extractor::new(connector, policy);

        let batch = extractor
            .next_batch(FamilyKind::Genres, Watermark::min(), 10, 0)
            .await
            .unwrap();

        assert!(batch.is_empty());
        assert!(sleeper.secs().is_empty());
    }

    #[tokio::test]
    async fn test_query_failure_aborts_under_fail_policy() {
        let connector = Arc::new(ScriptedConnector::new(
            0,
            vec![Err(SourceError::decode("column rating: unexpected type"))],
        ));
        let (policy, _sleeper) = recording_policy();
        let mut extractor = Extractor::with_policy(connector, policy, QueryErrorPolicy::Fail);

        let err = extractor
            .next_batch(FamilyKind::Movies, Watermark::min(), 10, 0)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::ExtractorError(_)));
    }

    #[test]
    fn test_policy_parses_case_insensitively() {
        assert_eq!("Skip".parse::<QueryErrorPolicy>().unwrap(), QueryErrorPolicy::Skip);
        assert_eq!(" FAIL ".parse::<QueryErrorPolicy>().unwrap(), QueryErrorPolicy::Fail);
        assert!("ignore".parse::<QueryErrorPolicy>().is_err());
    }
}
