//! Connection settings for the backends.

use url::Url;

use crate::errors::StateError;

/// Connection parameters of the relational store.
#[derive(Debug, Clone, PartialEq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "movies_database".to_string(),
        }
    }
}

/// Connection parameters of the Redis cursor store.
#[derive(Debug, Clone, PartialEq)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    pub password: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
        }
    }
}

impl RedisConfig {
    /// Build the `redis://` URL, percent-encoding the password.
    pub fn url(&self) -> Result<Url, StateError> {
        let mut url = Url::parse(&format!("redis://{}:{}/{}", self.host, self.port, self.db))
            .map_err(|e| StateError::connection(format!("Invalid Redis address: {}", e)))?;

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|_| StateError::connection("Redis URL cannot carry a password"))?;
        }

        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_url_without_password() {
        let config = RedisConfig {
            host: "cache".to_string(),
            port: 6380,
            db: 2,
            password: None,
        };

        assert_eq!(config.url().unwrap().as_str(), "redis://cache:6380/2");
    }

    #[test]
    fn test_redis_url_encodes_password() {
        let config = RedisConfig {
            password: Some("p@ss/word".to_string()),
            ..RedisConfig::default()
        };

        let url = config.url().unwrap();
        assert_eq!(url.password(), Some("p%40ss%2Fword"));
        assert_eq!(url.host_str(), Some("localhost"));
    }
}
