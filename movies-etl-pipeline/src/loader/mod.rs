//! Loader module for the movies ETL pipeline.
//!
//! Writes transformed documents into the search index.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::backoff::{Attempts, RetryPolicy};
use crate::errors::PipelineError;
use movies_etl_repository::opensearch::index_settings;
use movies_etl_repository::{BulkSummary, SearchConnector, SearchEngineClient, SearchError};
use movies_etl_shared::{FamilyKind, SearchDocument};

/// Loader that upserts documents into the search engine.
///
/// The loader is responsible for:
/// - Opening a client and probing it before use
/// - Resubmitting a whole batch after a partial or failed write
/// - Closing the client once a batch is fully acknowledged
pub struct SearchLoader {
    connector: Arc<dyn SearchConnector>,
    client: Option<Box<dyn SearchEngineClient>>,
    retry: RetryPolicy,
}

impl SearchLoader {
    /// Create a new search loader.
    pub fn new(connector: Arc<dyn SearchConnector>, retry: RetryPolicy) -> Self {
        Self {
            connector,
            client: None,
            retry,
        }
    }

    /// Whether a client is currently open.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Open and probe a client unless one is already open.
    ///
    /// A client is kept only if it answers the liveness probe.
    async fn ensure_connected(&mut self, kind: FamilyKind, attempts: &mut Attempts) {
        while self.client.is_none() {
            let client = match self.connector.connect().await {
                Ok(client) => client,
                Err(e) => {
                    attempts.failed(&e).await;
                    continue;
                }
            };

            match client.ping().await {
                Ok(true) => {
                    info!(family = %kind, "Search connection opened");
                    self.client = Some(client);
                }
                Ok(false) => {
                    attempts
                        .failed(&SearchError::connection("liveness probe failed"))
                        .await
                }
                Err(e) => attempts.failed(&e).await,
            }
        }
    }

    /// Upsert a batch of documents.
    ///
    /// The batch counts as written only when every document is
    /// acknowledged. Otherwise the client is dropped and the entire batch
    /// is resubmitted on a fresh one, with backoff, until it is.
    #[instrument(skip(self, documents), fields(family = %kind, count = documents.len()))]
    pub async fn load_batch(
        &mut self,
        kind: FamilyKind,
        documents: &[SearchDocument],
    ) -> Result<BulkSummary, PipelineError> {
        if documents.is_empty() {
            return Ok(BulkSummary::complete(0));
        }

        let mut attempts = self.retry.attempts("bulk upsert", kind);

        loop {
            self.ensure_connected(kind, &mut attempts).await;
            let Some(client) = self.client.as_ref() else {
                continue;
            };

            match client.bulk_upsert(documents).await {
                Ok(summary) if summary.succeeded == documents.len() => {
                    debug!(family = %kind, count = documents.len(), "Bulk upsert acknowledged");
                    self.close(kind);
                    return Ok(summary);
                }
                Ok(summary) => {
                    let first = summary
                        .errors
                        .first()
                        .map(|e| format!("{} ({}/{})", e.reason, e.index, e.id))
                        .unwrap_or_default();
                    warn!(
                        family = %kind,
                        submitted = documents.len(),
                        succeeded = summary.succeeded,
                        first_error = %first,
                        "Partial bulk failure, resubmitting batch"
                    );
                    self.client = None;
                    attempts
                        .failed(&PipelineError::loader(format!(
                            "{} of {} documents acknowledged",
                            summary.succeeded,
                            documents.len()
                        )))
                        .await;
                }
                Err(e) => {
                    error!(family = %kind, error = %e, "Bulk upsert failed");
                    self.client = None;
                    attempts.failed(&e).await;
                }
            }
        }
    }

    /// Ensure the index of every family exists.
    ///
    /// Connectivity failures, including a cluster that answers but is not
    /// ready yet, are retried. A rejected index creation is returned as an
    /// error.
    pub async fn ensure_indices(&mut self, families: &[FamilyKind]) -> Result<(), PipelineError> {
        for &kind in families {
            let mut attempts = self.retry.attempts("ensure index", kind);
            loop {
                self.ensure_connected(kind, &mut attempts).await;
                let Some(client) = self.client.as_ref() else {
                    continue;
                };

                match client
                    .ensure_index_exists(kind.index_name(), &index_settings(kind))
                    .await
                {
                    Ok(()) => break,
                    Err(SearchError::ConnectionError(msg)) => {
                        self.client = None;
                        attempts.failed(&msg).await;
                    }
                    Err(e) => {
                        self.close(kind);
                        return Err(e.into());
                    }
                }
            }
        }

        if let Some(&kind) = families.last() {
            self.close(kind);
        }
        info!(indices = families.len(), "Search indices ready");
        Ok(())
    }

    /// Close the client, if one is open.
    pub fn close(&mut self, kind: FamilyKind) {
        if self.client.take().is_some() {
            info!(family = %kind, "Search connection closed");
        }
    }
}
