//! Database connection configuration.
//!
//! This module provides the `ConnectionConfig` struct for configuring the
//! single database session a scrub run uses.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name of the advisory lock taken for the duration of a run.
pub const DEFAULT_LOCK_NAME: &str = "dbscrubber";

/// Configuration for the scrub session.
///
/// # Security
/// This struct intentionally does NOT store passwords or credentials.
/// Credentials stay inside the connection URL, which is only ever logged in
/// redacted form.
///
/// # Example
/// ```rust
/// use dbscrubber_core::adapters::ConnectionConfig;
///
/// let config = ConnectionConfig::new("localhost".to_string())
///     .with_port(3306)
///     .with_database("wordpress".to_string())
///     .with_username("admin".to_string());
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host address
    pub host: String,
    /// Optional port number
    pub port: Option<u16>,
    /// Optional database name
    pub database: Option<String>,
    /// Optional username (password handled separately)
    pub username: Option<String>,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Per-statement timeout; `None` leaves the server default in place
    pub statement_timeout: Option<Duration>,
    /// Advisory lock name guarding against concurrent runs
    pub lock_name: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: None,
            database: None,
            username: None,
            connect_timeout: Duration::from_secs(30),
            statement_timeout: None,
            lock_name: DEFAULT_LOCK_NAME.to_string(),
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConnectionConfig({}{}{})",
            self.host,
            self.port.map_or_else(String::new, |p| format!(":{}", p)),
            self.database
                .as_ref()
                .map_or_else(String::new, |db| format!("/{}", db))
        )
        // Intentionally omit username and never include credentials
    }
}

impl ConnectionConfig {
    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(crate::error::ScrubError::configuration(
                "host cannot be empty",
            ));
        }

        if let Some(port) = self.port
            && port == 0
        {
            return Err(crate::error::ScrubError::configuration(
                "port must be greater than 0",
            ));
        }

        if self.connect_timeout.as_secs() == 0 {
            return Err(crate::error::ScrubError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if let Some(timeout) = self.statement_timeout
            && timeout.is_zero()
        {
            return Err(crate::error::ScrubError::configuration(
                "statement_timeout must be greater than 0 when set",
            ));
        }

        if self.lock_name.is_empty() || self.lock_name.len() > 64 {
            return Err(crate::error::ScrubError::configuration(
                "lock_name must be 1-64 characters",
            ));
        }

        Ok(())
    }

    /// Creates a new connection config with safe defaults.
    pub fn new(host: String) -> Self {
        Self {
            host,
            ..Default::default()
        }
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Builder method to set database.
    pub fn with_database(mut self, database: String) -> Self {
        self.database = Some(database);
        self
    }

    /// Builder method to set username.
    pub fn with_username(mut self, username: String) -> Self {
        self.username = Some(username);
        self
    }

    /// Builder method to set the statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }
}
