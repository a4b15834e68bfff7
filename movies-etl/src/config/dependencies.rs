//! Dependency initialization and wiring for the movies ETL.

use std::sync::Arc;
use tracing::info;

use crate::config::{EtlConfig, StateBackend};
use crate::EtlError;
use movies_etl_pipeline::{
    extractor::Extractor, loader::SearchLoader, orchestrator::Orchestrator, OrchestratorConfig,
    RetryPolicy, State, SystemClock, TokioSleeper,
};
use movies_etl_repository::{
    JsonFileStorage, OpenSearchConnector, PostgresConnector, RedisStorage, StateStorage,
};
use movies_etl_shared::FamilyKind;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from the given settings.
    ///
    /// Only the cursor store is contacted here; an unreachable store is
    /// fatal. PostgreSQL and the search engine are connected lazily, with
    /// backoff, by the pipeline.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(EtlError)` - If initialization fails
    pub async fn new(config: &EtlConfig) -> Result<Self, EtlError> {
        info!(
            state_backend = ?config.state_backend,
            db_host = %config.postgres.host,
            db_name = %config.postgres.dbname,
            elasticsearch_address = %config.elasticsearch_address,
            batch_size = config.batch_size,
            query_error_policy = %config.query_error_policy,
            "Initializing dependencies"
        );

        let storage: Arc<dyn StateStorage> = match config.state_backend {
            StateBackend::Redis => {
                Arc::new(RedisStorage::connect(&config.redis, config.state_base_key.clone()).await?)
            }
            StateBackend::File => {
                info!(path = %config.state_file.display(), "Using file state storage");
                Arc::new(JsonFileStorage::new(config.state_file.clone()))
            }
        };

        let state = State::open(storage, config.batch_size).await?;

        let retry = RetryPolicy::new(config.backoff, Arc::new(TokioSleeper));

        let source = Arc::new(PostgresConnector::new(config.postgres.clone()));
        let extractor = Extractor::with_policy(source, retry.clone(), config.query_error_policy);

        let search = Arc::new(OpenSearchConnector::new(&config.elasticsearch_address)?);
        let loader = SearchLoader::new(search, retry);

        let orchestrator = Orchestrator::new(
            extractor,
            loader,
            state,
            Arc::new(SystemClock),
            Arc::new(TokioSleeper),
            OrchestratorConfig {
                interval: config.interval,
                families: FamilyKind::ALL.to_vec(),
            },
        );

        Ok(Self { orchestrator })
    }
}
