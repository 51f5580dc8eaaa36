//! PostgreSQL session management and validation.
//!
//! # Session Settings
//! - One pooled connection, never recycled, so the advisory lock holds
//! - `statement_timeout` from configuration, `lock_timeout` bounded
//! - `application_name` identifies the scrubber in `pg_stat_activity`

use super::{ConnectionConfig, PostgresAdapter};
use crate::Result;
use sqlx::PgPool;
use std::time::Duration;
use url::Url;

impl PostgresAdapter {
    /// Creates a new PostgreSQL adapter.
    ///
    /// # Arguments
    /// * `connection_string` - PostgreSQL connection URL (credentials sanitized in errors)
    ///
    /// # Errors
    /// Returns error if:
    /// - Connection string format is invalid
    /// - Pool configuration is invalid
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = Self::parse_connection_config(connection_string)?;
        let pool = Self::create_connection_pool(connection_string, &config)?;

        Ok(Self { pool, config })
    }

    /// Creates a new PostgreSQL adapter with custom configuration.
    pub async fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Self::validate_connection_string(connection_string)?;
        let pool = Self::create_connection_pool(connection_string, &config)?;

        Ok(Self { pool, config })
    }

    /// Validates connection string format.
    ///
    /// # Errors
    /// Returns error if connection string is invalid
    pub fn validate_connection_string(connection_string: &str) -> Result<()> {
        let url = Url::parse(connection_string).map_err(|e| {
            crate::error::ScrubError::configuration(format!(
                "Invalid PostgreSQL connection string format: {}",
                e
            ))
        })?;

        if url.scheme() != "postgres" && url.scheme() != "postgresql" {
            return Err(crate::error::ScrubError::configuration(
                "Connection string must use postgres:// or postgresql:// scheme",
            ));
        }

        if url.host_str().is_none() {
            return Err(crate::error::ScrubError::configuration(
                "Connection string must specify a host",
            ));
        }

        Ok(())
    }

    /// Parses and validates connection configuration from a connection string.
    ///
    /// Recognized query parameters: `connect_timeout` and `statement_timeout`
    /// (seconds), `lock_name`.
    pub fn parse_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
        Self::validate_connection_string(connection_string)?;

        let url = Url::parse(connection_string).map_err(|e| {
            crate::error::ScrubError::configuration(format!(
                "Invalid PostgreSQL connection string format: {}",
                e
            ))
        })?;

        let mut config = ConnectionConfig::new(url.host_str().unwrap_or("localhost").to_string());

        if let Some(port) = url.port() {
            if port == 0 {
                return Err(crate::error::ScrubError::configuration(
                    "Invalid port number: must be greater than 0",
                ));
            }
            config = config.with_port(port);
        } else {
            config = config.with_port(5432);
        }

        let database = url.path().trim_start_matches('/');
        if !database.is_empty() {
            if database.len() > 63 {
                return Err(crate::error::ScrubError::configuration(
                    "Database name too long: maximum 63 characters",
                ));
            }
            config = config.with_database(database.to_string());
        }

        let username = url.username();
        if !username.is_empty() {
            if username.len() > 63 {
                return Err(crate::error::ScrubError::configuration(
                    "Username too long: maximum 63 characters",
                ));
            }
            config = config.with_username(username.to_string());
        }

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "connect_timeout" => {
                    if let Ok(timeout_secs) = value.parse::<u64>()
                        && timeout_secs > 0
                        && timeout_secs <= 300
                    {
                        config.connect_timeout = Duration::from_secs(timeout_secs);
                    }
                }
                "statement_timeout" => {
                    if let Ok(timeout_secs) = value.parse::<u64>()
                        && timeout_secs > 0
                    {
                        config.statement_timeout = Some(Duration::from_secs(timeout_secs));
                    }
                }
                "lock_name" => config.lock_name = value.into_owned(),
                _ => {}
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Creates the single-connection pool with session settings applied on
    /// connect.
    pub(crate) fn create_connection_pool(
        connection_string: &str,
        config: &ConnectionConfig,
    ) -> Result<PgPool> {
        use sqlx::Executor;

        Self::validate_connection_string(connection_string)?;

        let statement_timeout_ms = config.statement_timeout.map(|t| t.as_millis());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .min_connections(0)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    if let Some(timeout_ms) = statement_timeout_ms {
                        conn.execute(format!("SET statement_timeout = {}", timeout_ms).as_str())
                            .await?;
                    }

                    conn.execute("SET lock_timeout = '30s'").await?;
                    conn.execute("SET application_name = 'dbscrubber'").await?;
                    conn.execute("SET timezone = 'UTC'").await?;

                    Ok(())
                })
            })
            .connect_lazy(connection_string)
            .map_err(|e| crate::error::ScrubError::Connection {
                context: format!(
                    "Failed to create PostgreSQL session for {}",
                    crate::adapters::redact_database_url(connection_string)
                ),
                source: Box::new(e),
            })?;

        Ok(pool)
    }

    /// Checks the health of the session.
    pub async fn is_healthy(&self) -> bool {
        match sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
        {
            Ok(result) => result == 1,
            Err(_) => false,
        }
    }
}
