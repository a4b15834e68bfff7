//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    http::{
        transport::{SingleNodeConnectionPool, TransportBuilder},
        StatusCode,
    },
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::{SearchConnector, SearchEngineClient};
use crate::opensearch::bulk;
use crate::types::BulkSummary;
use movies_etl_shared::SearchDocument;

/// Builds OpenSearch clients for a single node.
///
/// # Example
///
/// ```ignore
/// let connector = OpenSearchConnector::new("http://localhost:9200")?;
/// let client = connector.connect().await?;
/// if client.ping().await? {
///     client.bulk_upsert(&documents).await?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct OpenSearchConnector {
    url: Url,
}

impl OpenSearchConnector {
    /// Create a connector for the node at `url`.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchConnector)` - If the URL is valid
    /// * `Err(SearchError)` - If the URL cannot be parsed
    pub fn new(url: &str) -> Result<Self, SearchError> {
        let url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;
        Ok(Self { url })
    }

    /// Node URL the connector targets.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SearchConnector for OpenSearchConnector {
    async fn connect(&self) -> Result<Box<dyn SearchEngineClient>, SearchError> {
        let client = OpenSearchClient::new(self.url.clone())?;
        Ok(Box::new(client))
    }
}

/// OpenSearch client implementation.
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client for the node at `url`.
    pub fn new(url: Url) -> Result<Self, SearchError> {
        let conn_pool = SingleNodeConnectionPool::new(url.clone());
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        debug!(url = %url, "Created OpenSearch client");

        Ok(Self { client })
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    async fn ping(&self) -> Result<bool, SearchError> {
        let response = self.client.ping().send().await?;
        Ok(response.status_code().is_success())
    }

    #[instrument(skip(self, documents), fields(count = documents.len()))]
    async fn bulk_upsert(&self, documents: &[SearchDocument]) -> Result<BulkSummary, SearchError> {
        if documents.is_empty() {
            return Ok(BulkSummary::complete(0));
        }

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(bulk::build_body(documents))
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchError::bulk_index(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        Ok(bulk::parse_response(&body, documents.len()))
    }

    async fn ensure_index_exists(&self, index: &str, settings: &Value) -> Result<(), SearchError> {
        let exists = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await?;

        let status = exists.status_code();
        if status.is_success() {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }
        if status != StatusCode::NOT_FOUND {
            return Err(index_status_error(
                status,
                format!("Checking index {} failed with status {}", index, status),
            ));
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(settings.clone())
            .send()
            .await?;

        let status = response.status_code();
        if status.is_success() {
            info!(index = %index, "Created search index");
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();

        // Another writer created it between the two requests.
        if error_body.contains("resource_already_exists_exception") {
            return Ok(());
        }

        error!(index = %index, status = %status, body = %error_body, "Index creation failed");
        Err(index_status_error(
            status,
            format!(
                "Creating index {} failed with status {}: {}",
                index, status, error_body
            ),
        ))
    }
}

/// Classify a failed index API answer.
///
/// Server errors mean the cluster is not ready yet and are reported as
/// connectivity failures. Anything else is a rejection.
fn index_status_error(status: StatusCode, msg: String) -> SearchError {
    if status.is_server_error() {
        SearchError::connection(msg)
    } else {
        SearchError::index_creation(msg)
    }
}
