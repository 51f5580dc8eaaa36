//! MySQL working-copy DDL, promotion and run bookkeeping.
//!
//! DDL commits implicitly in MySQL, so promotion relies on `RENAME TABLE`
//! accepting several renames in one atomic statement.

use super::MySqlAdapter;
use crate::Result;
use crate::adapters::{PROMOTION_MARKER_TABLE, TableLayout};
use crate::error::ScrubError;

/// Backtick-quotes an identifier.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

async fn execute(adapter: &MySqlAdapter, sql: &str, context: impl Into<String>) -> Result<u64> {
    let result = sqlx::query(sql)
        .execute(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed(context, e))?;
    Ok(result.rows_affected())
}

/// Data + index bytes of the connected schema.
pub async fn database_size_bytes(adapter: &MySqlAdapter) -> Result<u64> {
    let size: u64 = sqlx::query_scalar(
        "SELECT CAST(COALESCE(SUM(data_length + index_length), 0) AS UNSIGNED) \
         FROM information_schema.TABLES WHERE table_schema = DATABASE()",
    )
    .fetch_one(&adapter.pool)
    .await
    .map_err(|e| ScrubError::statement_failed("measuring database size", e))?;

    Ok(size)
}

pub async fn acquire_lock(adapter: &MySqlAdapter) -> Result<bool> {
    let acquired: i64 = sqlx::query_scalar("SELECT CAST(COALESCE(GET_LOCK(?, 0), 0) AS SIGNED)")
        .bind(&adapter.config.lock_name)
        .fetch_one(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed("acquiring scrub lock", e))?;

    Ok(acquired == 1)
}

pub async fn release_lock(adapter: &MySqlAdapter) -> Result<()> {
    sqlx::query("SELECT RELEASE_LOCK(?)")
        .bind(&adapter.config.lock_name)
        .execute(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed("releasing scrub lock", e))?;
    Ok(())
}

pub async fn table_exists(adapter: &MySqlAdapter, table: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM information_schema.TABLES \
         WHERE table_schema = DATABASE() AND table_name = ?",
    )
    .bind(table)
    .fetch_one(&adapter.pool)
    .await
    .map_err(|e| ScrubError::statement_failed(format!("looking up {}", table), e))?;

    Ok(count > 0)
}

pub async fn count_rows(adapter: &MySqlAdapter, table: &str) -> Result<u64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_identifier(table)))
        .fetch_one(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed(format!("counting rows of {}", table), e))?;

    Ok(u64::try_from(count).unwrap_or(0))
}

pub async fn drop_table_if_exists(adapter: &MySqlAdapter, table: &str) -> Result<()> {
    execute(
        adapter,
        &format!("DROP TABLE IF EXISTS {}", quote_identifier(table)),
        format!("dropping {}", table),
    )
    .await?;
    Ok(())
}

pub async fn rename_table(adapter: &MySqlAdapter, from: &str, to: &str) -> Result<()> {
    execute(
        adapter,
        &format!(
            "RENAME TABLE {} TO {}",
            quote_identifier(from),
            quote_identifier(to)
        ),
        format!("renaming {} to {}", from, to),
    )
    .await?;
    Ok(())
}

pub async fn duplicate_table(adapter: &MySqlAdapter, source: &str, target: &str) -> Result<u64> {
    execute(
        adapter,
        &format!(
            "CREATE TABLE {} LIKE {}",
            quote_identifier(target),
            quote_identifier(source)
        ),
        format!("creating {} like {}", target, source),
    )
    .await?;

    execute(
        adapter,
        &format!(
            "INSERT INTO {} SELECT * FROM {}",
            quote_identifier(target),
            quote_identifier(source)
        ),
        format!("copying {} into {}", source, target),
    )
    .await
}

pub async fn truncate_table(adapter: &MySqlAdapter, table: &str) -> Result<()> {
    execute(
        adapter,
        &format!("TRUNCATE TABLE {}", quote_identifier(table)),
        format!("truncating {}", table),
    )
    .await?;
    Ok(())
}

/// Swaps every working copy in with one `RENAME TABLE`, then drops the
/// parked originals.
pub async fn promote_tables(adapter: &MySqlAdapter, tables: &[String]) -> Result<()> {
    if tables.is_empty() {
        return Ok(());
    }

    for table in tables {
        drop_table_if_exists(adapter, &TableLayout::retired(table)).await?;
    }

    let renames: Vec<String> = tables
        .iter()
        .flat_map(|table| {
            [
                format!(
                    "{} TO {}",
                    quote_identifier(table),
                    quote_identifier(&TableLayout::retired(table))
                ),
                format!(
                    "{} TO {}",
                    quote_identifier(&TableLayout::shadow(table)),
                    quote_identifier(table)
                ),
            ]
        })
        .collect();

    execute(
        adapter,
        &format!("RENAME TABLE {}", renames.join(", ")),
        format!("promoting {}", tables.join(", ")),
    )
    .await?;

    let retired: Vec<String> = tables
        .iter()
        .map(|table| quote_identifier(&TableLayout::retired(table)))
        .collect();

    execute(
        adapter,
        &format!("DROP TABLE IF EXISTS {}", retired.join(", ")),
        "dropping promoted originals",
    )
    .await?;

    Ok(())
}

pub async fn ensure_marker_table(adapter: &MySqlAdapter) -> Result<()> {
    execute(
        adapter,
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             table_name VARCHAR(64) NOT NULL PRIMARY KEY, \
             started_at VARCHAR(40) NOT NULL)",
            quote_identifier(PROMOTION_MARKER_TABLE)
        ),
        "creating promotion marker table",
    )
    .await?;
    Ok(())
}

pub async fn mark_promotions(adapter: &MySqlAdapter, tables: &[String]) -> Result<()> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let sql = format!(
        "REPLACE INTO {} (table_name, started_at) VALUES (?, ?)",
        quote_identifier(PROMOTION_MARKER_TABLE)
    );

    for table in tables {
        sqlx::query(&sql)
            .bind(table)
            .bind(&started_at)
            .execute(&adapter.pool)
            .await
            .map_err(|e| ScrubError::statement_failed(format!("marking {}", table), e))?;
    }

    Ok(())
}

pub async fn pending_promotions(adapter: &MySqlAdapter) -> Result<Vec<String>> {
    if !table_exists(adapter, PROMOTION_MARKER_TABLE).await? {
        return Ok(Vec::new());
    }

    let tables: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT CAST(table_name AS CHAR) FROM {} ORDER BY table_name",
        quote_identifier(PROMOTION_MARKER_TABLE)
    ))
    .fetch_all(&adapter.pool)
    .await
    .map_err(|e| ScrubError::statement_failed("reading promotion markers", e))?;

    Ok(tables)
}

pub async fn clear_promotions(adapter: &MySqlAdapter, tables: &[String]) -> Result<()> {
    let sql = format!(
        "DELETE FROM {} WHERE table_name = ?",
        quote_identifier(PROMOTION_MARKER_TABLE)
    );

    for table in tables {
        sqlx::query(&sql)
            .bind(table)
            .execute(&adapter.pool)
            .await
            .map_err(|e| ScrubError::statement_failed(format!("clearing marker for {}", table), e))?;
    }

    Ok(())
}
