//! Scrub run configuration.
//!
//! This module provides the `ScrubConfig` struct controlling batching,
//! pacing, guard thresholds, allow-lists and the table layout of a run.

use super::tables::TableLayout;
use crate::models::EnvironmentType;
use crate::security::SecretParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default database size limit in megabytes.
pub const DEFAULT_SIZE_LIMIT_MB: u64 = 2000;

/// Default number of account rows per page.
pub const DEFAULT_BATCH_SIZE: u32 = 1000;

/// Default pause between pages once the walk is past its first page.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_micros(100);

/// Largest accepted page size.
const MAX_BATCH_SIZE: u32 = 100_000;

/// Configuration for a scrub run.
///
/// # Example
/// ```rust
/// use dbscrubber_core::adapters::ScrubConfig;
/// use dbscrubber_core::models::EnvironmentType;
///
/// let config = ScrubConfig::new()
///     .with_environment(EnvironmentType::Staging)
///     .with_allowed_emails(vec!["admin@example.com".to_string()]);
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrubConfig {
    /// Account rows fetched per page
    pub batch_size: u32,
    /// Pause between pages (and every `batch_size` attribute updates)
    pub pacing_delay: Duration,
    /// Default size limit, before the `size_limit_mb` hook
    pub size_limit_mb: u64,
    /// Skip the size guard entirely
    pub ignore_size_limit: bool,
    /// Environment classification of the target
    pub environment: EnvironmentType,
    /// Prefix of the target tables
    pub table_prefix: String,
    /// Caller-supplied exempted domains (built-ins are always added)
    pub allowed_domains: Vec<String>,
    /// Caller-supplied exempted addresses
    pub allowed_emails: Vec<String>,
    /// Only rewrite name attributes of accounts that were scrubbed
    pub preserve_exempt_attributes: bool,
    /// Cost parameters for replacement password hashes
    pub secret: SecretParams,
}

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            pacing_delay: DEFAULT_PACING_DELAY,
            size_limit_mb: DEFAULT_SIZE_LIMIT_MB,
            ignore_size_limit: false,
            environment: EnvironmentType::default(),
            table_prefix: "wp_".to_string(),
            allowed_domains: Vec::new(),
            allowed_emails: Vec::new(),
            preserve_exempt_attributes: false,
            secret: SecretParams::default(),
        }
    }
}

impl ScrubConfig {
    /// Creates a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the scrub configuration.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_size == 0 {
            return Err(crate::error::ScrubError::configuration(
                "batch_size must be greater than 0",
            ));
        }

        if self.batch_size > MAX_BATCH_SIZE {
            return Err(crate::error::ScrubError::configuration(format!(
                "batch_size should not exceed {}",
                MAX_BATCH_SIZE
            )));
        }

        if self.pacing_delay > Duration::from_secs(10) {
            return Err(crate::error::ScrubError::configuration(
                "pacing_delay should not exceed 10 seconds",
            ));
        }

        self.secret.validate()?;

        self.layout()?;

        Ok(())
    }

    /// Table layout derived from `table_prefix`.
    pub fn layout(&self) -> crate::Result<TableLayout> {
        TableLayout::new(self.table_prefix.clone())
    }

    /// Builder method to set the page size.
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Builder method to set the pacing delay.
    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    /// Builder method to set the default size limit.
    pub fn with_size_limit_mb(mut self, limit: u64) -> Self {
        self.size_limit_mb = limit;
        self
    }

    /// Builder method to bypass the size guard.
    pub fn with_ignore_size_limit(mut self, ignore: bool) -> Self {
        self.ignore_size_limit = ignore;
        self
    }

    /// Builder method to set the environment classification.
    pub fn with_environment(mut self, environment: EnvironmentType) -> Self {
        self.environment = environment;
        self
    }

    /// Builder method to set the table prefix.
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Builder method to set exempted domains.
    pub fn with_allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.allowed_domains = domains;
        self
    }

    /// Builder method to set exempted addresses.
    pub fn with_allowed_emails(mut self, emails: Vec<String>) -> Self {
        self.allowed_emails = emails;
        self
    }

    /// Builder method to keep exempt accounts' name attributes.
    pub fn with_preserve_exempt_attributes(mut self, preserve: bool) -> Self {
        self.preserve_exempt_attributes = preserve;
        self
    }

    /// Builder method to set password hashing parameters.
    pub fn with_secret_params(mut self, secret: SecretParams) -> Self {
        self.secret = secret;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_config_defaults() {
        let config = ScrubConfig::default();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.pacing_delay, Duration::from_micros(100));
        assert_eq!(config.size_limit_mb, 2000);
        assert!(!config.ignore_size_limit);
        assert_eq!(config.environment, EnvironmentType::Production);
        assert_eq!(config.table_prefix, "wp_");
        assert!(!config.preserve_exempt_attributes);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scrub_config_validation() {
        assert!(ScrubConfig::new().with_batch_size(0).validate().is_err());
        assert!(ScrubConfig::new().with_batch_size(200_000).validate().is_err());
        assert!(
            ScrubConfig::new()
                .with_pacing_delay(Duration::from_secs(60))
                .validate()
                .is_err()
        );
        assert!(
            ScrubConfig::new()
                .with_table_prefix("wp'; --")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_scrub_config_layout() {
        let layout = ScrubConfig::new().with_table_prefix("blog_").layout().unwrap();
        assert_eq!(layout.accounts(), "blog_users");
    }
}
