//! MySQL session management and validation.
//!
//! # Session Settings
//! - One pooled connection, never recycled, so `GET_LOCK` holds for the run
//! - `max_execution_time` from the configured statement timeout
//! - UTC session time zone

use super::{ConnectionConfig, MySqlAdapter};
use crate::Result;
use sqlx::MySqlPool;
use std::time::Duration;
use url::Url;

impl MySqlAdapter {
    /// Creates a new MySQL adapter.
    ///
    /// # Arguments
    /// * `connection_string` - MySQL connection URL (credentials sanitized in errors)
    ///
    /// # Errors
    /// Returns error if:
    /// - Connection string format is invalid
    /// - Pool configuration is invalid
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = parse_mysql_connection_config(connection_string)?;
        let pool = create_mysql_connection_pool(connection_string, &config)?;

        Ok(Self { pool, config })
    }

    /// Creates a new MySQL adapter with custom configuration.
    pub async fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        validate_mysql_connection_string(connection_string)?;
        let pool = create_mysql_connection_pool(connection_string, &config)?;

        Ok(Self { pool, config })
    }

    /// Checks the health of the session.
    pub async fn is_healthy(&self) -> bool {
        match sqlx::query_scalar::<_, i64>("SELECT CAST(1 AS SIGNED)")
            .fetch_one(&self.pool)
            .await
        {
            Ok(result) => result == 1,
            Err(_) => false,
        }
    }
}

/// Parses MySQL connection string to extract configuration parameters.
///
/// Recognized query parameters: `connect_timeout` and `statement_timeout`
/// (seconds), `lock_name`.
pub fn parse_mysql_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
    validate_mysql_connection_string(connection_string)?;

    let url = Url::parse(connection_string).map_err(|e| {
        crate::error::ScrubError::configuration(format!(
            "Invalid MySQL connection string format: {}",
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
        config = config.with_port(3306);
    }

    let database = url.path().trim_start_matches('/');
    if !database.is_empty() {
        if database.len() > 64 {
            return Err(crate::error::ScrubError::configuration(
                "Database name too long: maximum 64 characters",
            ));
        }
        config = config.with_database(database.to_string());
    }

    let username = url.username();
    if !username.is_empty() {
        if username.len() > 32 {
            return Err(crate::error::ScrubError::configuration(
                "Username too long: maximum 32 characters for MySQL",
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

/// Validates MySQL connection string format.
///
/// # Errors
/// Returns error if connection string is invalid
pub fn validate_mysql_connection_string(connection_string: &str) -> Result<()> {
    let url = Url::parse(connection_string).map_err(|e| {
        crate::error::ScrubError::configuration(format!(
            "Invalid MySQL connection string format: {}",
            e
        ))
    })?;

    if url.scheme() != "mysql" {
        return Err(crate::error::ScrubError::configuration(
            "Connection string must use mysql:// scheme",
        ));
    }

    if url.host_str().is_none() {
        return Err(crate::error::ScrubError::configuration(
            "Connection string must specify a host",
        ));
    }

    Ok(())
}

/// Creates the single-connection MySQL pool.
///
/// The pool is lazy: nothing is dialed until the first statement.
fn create_mysql_connection_pool(
    connection_string: &str,
    config: &ConnectionConfig,
) -> Result<MySqlPool> {
    use sqlx::Executor;

    let statement_timeout_ms = config.statement_timeout.map(|t| t.as_millis());

    let pool = sqlx::mysql::MySqlPoolOptions::new()
        .max_connections(1)
        .min_connections(0)
        .acquire_timeout(config.connect_timeout)
        .idle_timeout(None)
        .max_lifetime(None)
        .test_before_acquire(true)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                if let Some(timeout_ms) = statement_timeout_ms {
                    conn.execute(format!("SET SESSION max_execution_time = {}", timeout_ms).as_str())
                        .await?;
                }

                conn.execute("SET time_zone = '+00:00'").await?;

                Ok(())
            })
        })
        .connect_lazy(connection_string)
        .map_err(|e| crate::error::ScrubError::Connection {
            context: format!(
                "Failed to create MySQL session for {}",
                crate::adapters::redact_database_url(connection_string)
            ),
            source: Box::new(e),
        })?;

    Ok(pool)
}
