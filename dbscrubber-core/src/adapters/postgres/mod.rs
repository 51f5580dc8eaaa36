//! PostgreSQL scrub adapter.
//!
//! # Module Structure
//! - `connection`: Session management and validation
//! - `tables`: Working-copy DDL, transactional promotion, locks and markers
//! - `accounts`: Paged account reads and batched updates
//!
//! WordPress-style schemas created without quoting fold to lower case, so
//! column names are left unquoted and resolve either way.

mod accounts;
mod connection;
mod tables;

#[cfg(test)]
mod tests;

use super::{AccountUpdate, AdapterFeature, ConnectionConfig, NameAttributes, ScrubAdapter};
use crate::Result;
use crate::models::{AccountRow, DatabaseType};
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL scrub adapter on a single session
pub struct PostgresAdapter {
    pub pool: PgPool,
    pub config: ConnectionConfig,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

#[async_trait]
impl ScrubAdapter for PostgresAdapter {
    async fn test_connection(&self) -> Result<()> {
        let connectivity_result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(crate::error::ScrubError::connection_failed)?;

        if connectivity_result != 1 {
            return Err(crate::error::ScrubError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        Ok(())
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    fn supports_feature(&self, feature: AdapterFeature) -> bool {
        matches!(
            feature,
            AdapterFeature::TransactionalDdl | AdapterFeature::AdvisoryLock
        )
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }

    async fn database_size_bytes(&self) -> Result<u64> {
        tables::database_size_bytes(self).await
    }

    async fn acquire_lock(&self) -> Result<bool> {
        tables::acquire_lock(self).await
    }

    async fn release_lock(&self) -> Result<()> {
        tables::release_lock(self).await
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        tables::table_exists(self, table).await
    }

    async fn count_rows(&self, table: &str) -> Result<u64> {
        tables::count_rows(self, table).await
    }

    async fn drop_table_if_exists(&self, table: &str) -> Result<()> {
        tables::drop_table_if_exists(self, table).await
    }

    async fn rename_table(&self, from: &str, to: &str) -> Result<()> {
        tables::rename_table(self, from, to).await
    }

    async fn duplicate_table(&self, source: &str, target: &str) -> Result<u64> {
        tables::duplicate_table(self, source, target).await
    }

    async fn truncate_table(&self, table: &str) -> Result<()> {
        tables::truncate_table(self, table).await
    }

    async fn promote_tables(&self, tables: &[String]) -> Result<()> {
        tables::promote_tables(self, tables).await
    }

    async fn ensure_marker_table(&self) -> Result<()> {
        tables::ensure_marker_table(self).await
    }

    async fn mark_promotions(&self, tables: &[String]) -> Result<()> {
        tables::mark_promotions(self, tables).await
    }

    async fn pending_promotions(&self) -> Result<Vec<String>> {
        tables::pending_promotions(self).await
    }

    async fn clear_promotions(&self, tables: &[String]) -> Result<()> {
        tables::clear_promotions(self, tables).await
    }

    async fn fetch_accounts(
        &self,
        table: &str,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<AccountRow>> {
        accounts::fetch_accounts(self, table, limit, offset).await
    }

    async fn update_accounts(&self, table: &str, updates: &[AccountUpdate]) -> Result<u64> {
        accounts::update_accounts(self, table, updates).await
    }

    async fn blank_attributes(&self, table: &str, keys: &[&str]) -> Result<u64> {
        accounts::blank_attributes(self, table, keys).await
    }

    async fn update_name_attributes(
        &self,
        table: &str,
        updates: &[NameAttributes],
    ) -> Result<u64> {
        accounts::update_name_attributes(self, table, updates).await
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
