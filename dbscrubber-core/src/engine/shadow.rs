//! Working copies and their promotion over the originals.
//!
//! Promotion is bracketed by rows in the marker table: markers are written
//! before the swap and cleared after it, so a run that dies mid-swap leaves
//! enough behind for [`ShadowTableManager::recover_pending`] to finish the
//! job on the next start.

use crate::Result;
use crate::adapters::{
    AdapterFeature, PROMOTION_MARKER_TABLE, ScrubAdapter, TableLayout, validate_identifier,
};
use tracing::{info, warn};

/// Creates, promotes and recovers `T_temp` working copies.
pub struct ShadowTableManager<'a> {
    adapter: &'a dyn ScrubAdapter,
}

impl<'a> ShadowTableManager<'a> {
    pub fn new(adapter: &'a dyn ScrubAdapter) -> Self {
        Self { adapter }
    }

    /// Drops any stale working copy of `table`, then creates a fresh one
    /// holding every row. Returns the working copy's name.
    pub async fn duplicate(&self, table: &str) -> Result<String> {
        let shadow = TableLayout::shadow(table);
        validate_identifier(&shadow)?;

        self.adapter.drop_table_if_exists(&shadow).await?;
        let copied = self.adapter.duplicate_table(table, &shadow).await?;

        info!("Duplicated {} into {} ({} rows)", table, shadow, copied);
        Ok(shadow)
    }

    /// Replaces every table in `tables` with its working copy.
    pub async fn promote(&self, tables: &[String]) -> Result<()> {
        self.adapter.ensure_marker_table().await?;
        self.adapter.mark_promotions(tables).await?;

        self.adapter.promote_tables(tables).await?;

        self.adapter.clear_promotions(tables).await?;
        self.drop_marker_table_if_idle().await?;

        let strategy = if self.adapter.supports_feature(AdapterFeature::TransactionalDdl) {
            "in one transaction"
        } else {
            "by atomic rename"
        };
        info!("Promoted {} {}", tables.join(", "), strategy);
        Ok(())
    }

    /// Finishes promotions left behind by an interrupted run.
    ///
    /// For each marked table:
    /// - missing original with a working copy: the copy becomes the original
    /// - missing original with a parked `_old` copy: the parked copy is restored
    /// - original present: leftover working and parked copies are dropped
    ///
    /// Returns the tables whose original was reinstated.
    pub async fn recover_pending(&self) -> Result<Vec<String>> {
        let pending = self.adapter.pending_promotions().await?;
        let mut recovered = Vec::new();

        for table in &pending {
            validate_identifier(table)?;
            let shadow = TableLayout::shadow(table);
            let retired = TableLayout::retired(table);

            if !self.adapter.table_exists(table).await? {
                if self.adapter.table_exists(&shadow).await? {
                    warn!("Completing interrupted promotion: {} -> {}", shadow, table);
                    self.adapter.rename_table(&shadow, table).await?;
                    recovered.push(table.clone());
                } else if self.adapter.table_exists(&retired).await? {
                    warn!("Restoring {} from {}", table, retired);
                    self.adapter.rename_table(&retired, table).await?;
                    recovered.push(table.clone());
                } else {
                    warn!("{} is missing and no copy is left to recover it from", table);
                }
            } else if self.adapter.table_exists(&shadow).await? {
                warn!("Dropping working copy {} left by an interrupted run", shadow);
                self.adapter.drop_table_if_exists(&shadow).await?;
            }

            if self.adapter.table_exists(&retired).await? {
                warn!("Dropping leftover {}", retired);
                self.adapter.drop_table_if_exists(&retired).await?;
            }

            self.adapter
                .clear_promotions(std::slice::from_ref(table))
                .await?;
        }

        if !pending.is_empty() {
            self.drop_marker_table_if_idle().await?;
        }

        Ok(recovered)
    }

    async fn drop_marker_table_if_idle(&self) -> Result<()> {
        if self.adapter.pending_promotions().await?.is_empty() {
            self.adapter
                .drop_table_if_exists(PROMOTION_MARKER_TABLE)
                .await?;
        }
        Ok(())
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteAdapter;

    async fn adapter_with_table(name: &str, rows: i64) -> SqliteAdapter {
        let adapter = SqliteAdapter::new("sqlite::memory:").await.unwrap();
        sqlx::query(&format!(
            "CREATE TABLE {} (id INTEGER PRIMARY KEY, body TEXT)",
            name
        ))
        .execute(&adapter.pool)
        .await
        .unwrap();
        for id in 1..=rows {
            sqlx::query(&format!("INSERT INTO {} (id, body) VALUES (?, 'x')", name))
                .bind(id)
                .execute(&adapter.pool)
                .await
                .unwrap();
        }
        adapter
    }

    #[tokio::test]
    async fn test_duplicate_replaces_stale_copy() {
        let adapter = adapter_with_table("wp_comments", 3).await;
        sqlx::query("CREATE TABLE wp_comments_temp (stale INTEGER)")
            .execute(&adapter.pool)
            .await
            .unwrap();

        let manager = ShadowTableManager::new(&adapter);
        let shadow = manager.duplicate("wp_comments").await.unwrap();

        assert_eq!(shadow, "wp_comments_temp");
        assert_eq!(adapter.count_rows("wp_comments_temp").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_promote_clears_markers() {
        let adapter = adapter_with_table("wp_comments", 3).await;
        let manager = ShadowTableManager::new(&adapter);

        manager.duplicate("wp_comments").await.unwrap();
        adapter.truncate_table("wp_comments_temp").await.unwrap();
        manager
            .promote(&["wp_comments".to_string()])
            .await
            .unwrap();

        assert_eq!(adapter.count_rows("wp_comments").await.unwrap(), 0);
        assert!(!adapter.table_exists("wp_comments_temp").await.unwrap());
        assert!(!adapter.table_exists(PROMOTION_MARKER_TABLE).await.unwrap());
    }

    #[tokio::test]
    async fn test_recover_renames_orphaned_copy() {
        let adapter = adapter_with_table("wp_users_temp", 4).await;
        adapter.ensure_marker_table().await.unwrap();
        adapter
            .mark_promotions(&["wp_users".to_string()])
            .await
            .unwrap();

        let manager = ShadowTableManager::new(&adapter);
        let recovered = manager.recover_pending().await.unwrap();

        assert_eq!(recovered, vec!["wp_users".to_string()]);
        assert_eq!(adapter.count_rows("wp_users").await.unwrap(), 4);
        assert!(!adapter.table_exists("wp_users_temp").await.unwrap());
        assert!(adapter.pending_promotions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recover_drops_leftovers_when_original_intact() {
        let adapter = adapter_with_table("wp_users", 2).await;
        for leftover in ["wp_users_temp", "wp_users_old"] {
            sqlx::query(&format!("CREATE TABLE {} (id INTEGER)", leftover))
                .execute(&adapter.pool)
                .await
                .unwrap();
        }
        adapter.ensure_marker_table().await.unwrap();
        adapter
            .mark_promotions(&["wp_users".to_string()])
            .await
            .unwrap();

        let recovered = ShadowTableManager::new(&adapter)
            .recover_pending()
            .await
            .unwrap();

        assert!(recovered.is_empty());
        assert_eq!(adapter.count_rows("wp_users").await.unwrap(), 2);
        assert!(!adapter.table_exists("wp_users_temp").await.unwrap());
        assert!(!adapter.table_exists("wp_users_old").await.unwrap());
        assert!(!adapter.table_exists(PROMOTION_MARKER_TABLE).await.unwrap());
    }

    #[tokio::test]
    async fn test_recover_without_markers_is_noop() {
        let adapter = adapter_with_table("wp_users", 1).await;
        let recovered = ShadowTableManager::new(&adapter)
            .recover_pending()
            .await
            .unwrap();
        assert!(recovered.is_empty());
    }
}
