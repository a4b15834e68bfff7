//! Environment settings.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::EtlError;
use movies_etl_pipeline::{Backoff, QueryErrorPolicy};
use movies_etl_repository::{PostgresConfig, RedisConfig};

/// Default extraction page size.
const DEFAULT_BATCH_SIZE: i64 = 100;

/// Default key of the cursor record.
const DEFAULT_STATE_BASE_KEY: &str = "state";

/// Default path of the file cursor store.
const DEFAULT_STATE_FILE: &str = "etl_state.json";

/// Default search node.
const DEFAULT_ELASTICSEARCH_ADDRESS: &str = "http://localhost:9200";

/// Default PostgreSQL host.
const DEFAULT_DB_HOST: &str = "localhost";

/// Default PostgreSQL port.
const DEFAULT_DB_PORT: u16 = 5432;

/// Default Redis host.
const DEFAULT_REDIS_HOST: &str = "localhost";

/// Default Redis port.
const DEFAULT_REDIS_PORT: u16 = 6379;

/// Where the cursor record is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateBackend {
    #[default]
    Redis,
    File,
}

impl FromStr for StateBackend {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "file" => Ok(Self::File),
            other => Err(EtlError::config(format!(
                "Unknown state backend '{}', expected 'redis' or 'file'",
                other
            ))),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(EtlError::config(format!(
                "Unknown log format '{}', expected 'text' or 'json'",
                other
            ))),
        }
    }
}

/// Settings of a run.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    /// Pause between two cycles.
    pub interval: Duration,
    pub batch_size: i64,
    pub state_base_key: String,
    pub state_backend: StateBackend,
    pub state_file: PathBuf,
    pub query_error_policy: QueryErrorPolicy,
    pub backoff: Backoff,
    pub postgres: PostgresConfig,
    pub elasticsearch_address: String,
    pub redis: RedisConfig,
    pub log_format: LogFormat,
}

impl EtlConfig {
    /// Read settings from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `ETL_UPDATES_CHECK_INTERVAL`: seconds between cycles (required)
    /// - `ETL_BATCH_SIZE`: extraction page size (default: 100)
    /// - `ETL_STATE_BACKEND`: `redis` or `file` (default: redis)
    /// - `ETL_STATE_BASE_KEY`, `ETL_STATE_FILE`: cursor record location
    /// - `ETL_QUERY_ERROR_POLICY`: `skip` or `fail` (default: skip)
    /// - `ETL_BACKOFF_START`, `ETL_BACKOFF_FACTOR`, `ETL_BACKOFF_BORDER`: retry delays
    /// - `DB_NAME`, `DB_USER` (required), `DB_PASSWORD`, `DB_HOST`, `DB_PORT`
    /// - `ELASTICSEARCH_ADDRESS`: search node URL (default: http://localhost:9200)
    /// - `REDIS_HOST`, `REDIS_PORT`, `REDIS_DB`, `REDIS_PASSWORD`
    /// - `LOG_FORMAT`: `text` or `json` (default: text)
    pub fn from_env() -> Result<Self, EtlError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EtlError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let interval = vars.required::<u64>("ETL_UPDATES_CHECK_INTERVAL")?;
        let batch_size = vars.parsed("ETL_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;
        if batch_size <= 0 {
            return Err(EtlError::config("ETL_BATCH_SIZE must be positive"));
        }

        let backoff = Backoff::new(
            vars.parsed("ETL_BACKOFF_START", Backoff::default().start)?,
            vars.parsed("ETL_BACKOFF_FACTOR", Backoff::default().factor)?,
            vars.parsed("ETL_BACKOFF_BORDER", Backoff::default().border)?,
        );
        if !(backoff.start > 0.0 && backoff.factor >= 1.0 && backoff.border >= backoff.start) {
            return Err(EtlError::config(format!(
                "Invalid backoff: start={} factor={} border={}",
                backoff.start, backoff.factor, backoff.border
            )));
        }

        let query_error_policy = match vars.get("ETL_QUERY_ERROR_POLICY") {
            Some(value) => value
                .parse::<QueryErrorPolicy>()
                .map_err(|e| EtlError::config(e.to_string()))?,
            None => QueryErrorPolicy::default(),
        };

        let postgres = PostgresConfig {
            host: vars.string("DB_HOST", DEFAULT_DB_HOST),
            port: vars.parsed("DB_PORT", DEFAULT_DB_PORT)?,
            user: vars.required::<String>("DB_USER")?,
            password: vars.string("DB_PASSWORD", ""),
            dbname: vars.required::<String>("DB_NAME")?,
        };

        let redis = RedisConfig {
            host: vars.string("REDIS_HOST", DEFAULT_REDIS_HOST),
            port: vars.parsed("REDIS_PORT", DEFAULT_REDIS_PORT)?,
            db: vars.parsed("REDIS_DB", 0)?,
            password: vars.get("REDIS_PASSWORD"),
        };

        Ok(Self {
            interval: Duration::from_secs(interval),
            batch_size,
            state_base_key: vars.string("ETL_STATE_BASE_KEY", DEFAULT_STATE_BASE_KEY),
            state_backend: vars.parsed("ETL_STATE_BACKEND", StateBackend::default())?,
            state_file: PathBuf::from(vars.string("ETL_STATE_FILE", DEFAULT_STATE_FILE)),
            query_error_policy,
            backoff,
            postgres,
            elasticsearch_address: first_address(
                &vars.string("ELASTICSEARCH_ADDRESS", DEFAULT_ELASTICSEARCH_ADDRESS),
            )?,
            redis,
            log_format: vars.parsed("LOG_FORMAT", LogFormat::default())?,
        })
    }
}

/// First node of an address list.
///
/// Accepts a bare URL, a comma separated list, or a bracketed list of
/// quoted URLs such as `["http://es:9200"]`.
fn first_address(value: &str) -> Result<String, EtlError> {
    value
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|item| item.trim().trim_matches(|c: char| c == '"' || c == '\''))
        .find(|item| !item.is_empty())
        .map(str::to_string)
        .ok_or_else(|| EtlError::config("ELASTICSEARCH_ADDRESS is empty"))
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Non-empty value of `key`.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, value: &str) -> Result<T, EtlError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        value
            .trim()
            .parse::<T>()
            .map_err(|e| EtlError::config(format!("Invalid {}='{}': {}", key, value, e)))
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, EtlError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(value) => self.parse(key, &value),
            None => Ok(default),
        }
    }

    fn required<T>(&self, key: &str) -> Result<T, EtlError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self
            .get(key)
            .ok_or_else(|| EtlError::config(format!("{} is not set", key)))?;
        self.parse(key, &value)
    }
}
