//! PostgreSQL connector and connection.

use async_trait::async_trait;
use tokio_postgres::{types::ToSql, Client, Config as PgConfig, NoTls};
use tracing::{debug, error};

use crate::config::PostgresConfig;
use crate::errors::SourceError;
use crate::interfaces::{SourceConnection, SourceConnector};
use crate::postgres::rows;
use crate::types::BatchQuery;
use movies_etl_shared::RawRecord;

/// Opens PostgreSQL connections from static settings.
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    config: PostgresConfig,
}

impl PostgresConnector {
    /// Create a connector for the given settings.
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    fn pg_config(&self) -> PgConfig {
        let mut pg = PgConfig::new();
        pg.host(&self.config.host);
        pg.port(self.config.port);
        pg.user(&self.config.user);
        if !self.config.password.is_empty() {
            pg.password(&self.config.password);
        }
        pg.dbname(&self.config.dbname);
        pg.application_name("movies-etl");
        pg
    }
}

#[async_trait]
impl SourceConnector for PostgresConnector {
    async fn connect(&self) -> Result<Box<dyn SourceConnection>, SourceError> {
        let (client, connection) = self
            .pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| SourceError::connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        debug!(
            host = %self.config.host,
            port = self.config.port,
            dbname = %self.config.dbname,
            "Connected to PostgreSQL"
        );

        Ok(Box::new(PostgresConnection { client }))
    }
}

/// An open PostgreSQL connection. Dropping it closes the session.
pub struct PostgresConnection {
    client: Client,
}

#[async_trait]
impl SourceConnection for PostgresConnection {
    async fn fetch(&mut self, query: &BatchQuery) -> Result<Vec<RawRecord>, SourceError> {
        let watermark = query.watermark.to_utc();
        let params: [&(dyn ToSql + Sync); 3] = [&watermark, &query.limit, &query.offset];

        let fetched = self
            .client
            .query(query.sql, &params)
            .await
            .map_err(|e| {
                if e.is_closed() || self.client.is_closed() {
                    SourceError::connection(e.to_string())
                } else {
                    SourceError::query(e.to_string())
                }
            })?;

        fetched
            .iter()
            .map(|row| rows::decode(query.kind, row))
            .collect()
    }
}
