//! Database adapter trait and factory for scrub runs.
//!
//! The engine never issues SQL itself. Everything it needs from a database
//! (size reporting, working-copy DDL, paged reads, batched updates,
//! promotion, session locks) goes through [`ScrubAdapter`], and each backend
//! implements it in its own dialect.
//!
//! # Module Structure
//! - `config`: Configuration types (ConnectionConfig, ScrubConfig, TableLayout)
//! - Database-specific modules (mysql, postgres, sqlite)
//!
//! # Promotion strategies
//! - MySQL has no transactional DDL but renames several tables atomically,
//!   so promotion is one multi-table `RENAME TABLE` followed by dropping the
//!   parked originals.
//! - PostgreSQL and SQLite promote inside a single transaction that replaces
//!   the original rows with the scrubbed ones and drops the working copy.

use crate::Result;
use crate::models::{AccountRow, DatabaseType};
use async_trait::async_trait;

// Configuration module
pub mod config;

// Re-export configuration types for convenience
pub use config::{
    BLANKED_ATTRIBUTE_KEYS, ConnectionConfig, DEFAULT_BATCH_SIZE, DEFAULT_LOCK_NAME,
    DEFAULT_PACING_DELAY, DEFAULT_SIZE_LIMIT_MB, PROMOTION_MARKER_TABLE, RETIRED_SUFFIX,
    SHADOW_SUFFIX, ScrubConfig, TableLayout, validate_identifier,
};

/// Backend capabilities the engine consults during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterFeature {
    /// Working copies are promoted inside one transaction; without it the
    /// swap is a single atomic rename
    TransactionalDdl,
    /// Session-level advisory locks that keep concurrent runs out
    AdvisoryLock,
}

/// Replacement values for one scrubbed account row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub id: i64,
    pub password_hash: String,
    pub email: String,
    pub login: String,
    pub nicename: String,
    pub display_name: String,
}

/// Replacement values for the name attributes of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAttributes {
    pub account_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
}

/// Database operations required by the scrub engine.
///
/// Table names passed to these methods have already been validated with
/// [`validate_identifier`]; implementations quote them but do not re-check.
///
/// # Session
/// Implementations run every statement on one database session, so that
/// advisory locks taken by [`acquire_lock`](Self::acquire_lock) hold for the
/// whole run.
///
/// # Object Safety
/// This trait is object-safe, allowing for dynamic dispatch through
/// `Box<dyn ScrubAdapter>`.
#[async_trait]
pub trait ScrubAdapter: Send + Sync {
    /// Tests the database connection.
    async fn test_connection(&self) -> Result<()>;

    /// Returns the database type this adapter handles.
    fn database_type(&self) -> DatabaseType;

    /// Checks if the adapter supports a specific feature.
    fn supports_feature(&self, feature: AdapterFeature) -> bool;

    /// Gets the connection configuration (credentials sanitized).
    fn connection_config(&self) -> ConnectionConfig;

    /// Total data + index bytes of the current database. Read-only.
    async fn database_size_bytes(&self) -> Result<u64>;

    /// Takes the run lock without waiting. Returns false if it is held
    /// elsewhere.
    async fn acquire_lock(&self) -> Result<bool>;

    /// Releases the run lock.
    async fn release_lock(&self) -> Result<()>;

    /// Whether `table` exists in the current database/schema.
    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// Number of rows in `table`.
    async fn count_rows(&self, table: &str) -> Result<u64>;

    /// Drops `table` if it exists.
    async fn drop_table_if_exists(&self, table: &str) -> Result<()>;

    /// Renames `from` to `to`.
    async fn rename_table(&self, from: &str, to: &str) -> Result<()>;

    /// Creates `target` with the schema of `source` and copies every row.
    /// Returns the number of copied rows.
    async fn duplicate_table(&self, source: &str, target: &str) -> Result<u64>;

    /// Removes every row of `table`.
    async fn truncate_table(&self, table: &str) -> Result<()>;

    /// Replaces each table in `tables` with its working copy, as one unit
    /// as far as the backend allows. Working copies are gone afterwards.
    async fn promote_tables(&self, tables: &[String]) -> Result<()>;

    /// Creates the promotion marker table if missing.
    async fn ensure_marker_table(&self) -> Result<()>;

    /// Records that promotion of `tables` has started.
    async fn mark_promotions(&self, tables: &[String]) -> Result<()>;

    /// Tables with a recorded, unfinished promotion.
    async fn pending_promotions(&self) -> Result<Vec<String>>;

    /// Removes the markers for `tables`.
    async fn clear_promotions(&self, tables: &[String]) -> Result<()>;

    /// One page of accounts ordered by id.
    async fn fetch_accounts(&self, table: &str, limit: u32, offset: u64)
    -> Result<Vec<AccountRow>>;

    /// Applies account replacements in one transaction. Returns affected rows.
    async fn update_accounts(&self, table: &str, updates: &[AccountUpdate]) -> Result<u64>;

    /// Sets `meta_value` to `''` for every attribute whose key is in `keys`.
    async fn blank_attributes(&self, table: &str, keys: &[&str]) -> Result<u64>;

    /// Sets `first_name`, `last_name` and `nickname` attributes in one
    /// transaction. Accounts without those rows are skipped.
    async fn update_name_attributes(&self, table: &str, updates: &[NameAttributes])
    -> Result<u64>;

    /// Closes the session.
    async fn close(&self);
}

/// Factory function to create a scrub adapter from a connection string.
///
/// # Arguments
/// * `connection_string` - Database connection URL (redacted in errors)
///
/// # Errors
/// Returns error if:
/// - Connection string format is invalid
/// - Database type is not supported
/// - Required features are not compiled in
pub async fn create_adapter(connection_string: &str) -> Result<Box<dyn ScrubAdapter>> {
    let database_type = detect_database_type(connection_string)?;

    match database_type {
        #[cfg(feature = "postgresql")]
        DatabaseType::PostgreSQL => {
            let adapter = postgres::PostgresAdapter::new(connection_string).await?;
            Ok(Box::new(adapter))
        }
        #[cfg(not(feature = "postgresql"))]
        DatabaseType::PostgreSQL => Err(crate::error::ScrubError::unsupported_feature(
            "PostgreSQL adapter",
            "Compile with --features postgresql to enable PostgreSQL support",
        )),
        #[cfg(feature = "mysql")]
        DatabaseType::MySQL => {
            let adapter = mysql::MySqlAdapter::new(connection_string).await?;
            Ok(Box::new(adapter))
        }
        #[cfg(not(feature = "mysql"))]
        DatabaseType::MySQL => Err(crate::error::ScrubError::unsupported_feature(
            "MySQL adapter",
            "Compile with --features mysql to enable MySQL support",
        )),
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => {
            let adapter = sqlite::SqliteAdapter::new(connection_string).await?;
            Ok(Box::new(adapter))
        }
        #[cfg(not(feature = "sqlite"))]
        DatabaseType::SQLite => Err(crate::error::ScrubError::unsupported_feature(
            "SQLite adapter",
            "Compile with --features sqlite to enable SQLite support",
        )),
    }
}

/// Safely redacts credentials from database connection URLs.
///
/// Delegates to [`crate::error::redact_database_url`].
#[inline]
pub fn redact_database_url(url: &str) -> String {
    crate::error::redact_database_url(url)
}

/// Detects database type from connection string.
///
/// # Errors
/// Returns error if connection string format is unrecognized
pub fn detect_database_type(connection_string: &str) -> Result<DatabaseType> {
    if connection_string.starts_with("postgres://")
        || connection_string.starts_with("postgresql://")
    {
        Ok(DatabaseType::PostgreSQL)
    } else if connection_string.starts_with("mysql://") {
        Ok(DatabaseType::MySQL)
    } else if connection_string.starts_with("sqlite:")
        || connection_string == ":memory:"
        || connection_string.ends_with(".db")
        || connection_string.ends_with(".sqlite")
        || connection_string.ends_with(".sqlite3")
    {
        Ok(DatabaseType::SQLite)
    } else {
        Err(crate::error::ScrubError::configuration(
            "Unrecognized database connection string format",
        ))
    }
}

/// Builds a `?, ?, ?` placeholder list.
#[cfg(any(feature = "mysql", feature = "sqlite"))]
pub(crate) fn question_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

// Database-specific adapter modules
#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "sqlite")]
pub mod sqlite;
