//! PostgreSQL working-copy DDL, promotion and run bookkeeping.
//!
//! PostgreSQL runs DDL inside transactions, so promotion replaces the
//! original rows and drops the working copy in one transaction. The original
//! table object survives, keeping its sequences, grants and dependent views.

use super::PostgresAdapter;
use crate::Result;
use crate::adapters::{PROMOTION_MARKER_TABLE, TableLayout};
use crate::error::ScrubError;

/// Double-quotes an identifier.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

async fn execute(adapter: &PostgresAdapter, sql: &str, context: impl Into<String>) -> Result<u64> {
    let result = sqlx::query(sql)
        .execute(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed(context, e))?;
    Ok(result.rows_affected())
}

pub async fn database_size_bytes(adapter: &PostgresAdapter) -> Result<u64> {
    let size: i64 = sqlx::query_scalar("SELECT pg_database_size(current_database())")
        .fetch_one(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed("measuring database size", e))?;

    Ok(u64::try_from(size).unwrap_or(0))
}

pub async fn acquire_lock(adapter: &PostgresAdapter) -> Result<bool> {
    let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock(hashtext($1))")
        .bind(&adapter.config.lock_name)
        .fetch_one(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed("acquiring scrub lock", e))?;

    Ok(acquired)
}

pub async fn release_lock(adapter: &PostgresAdapter) -> Result<()> {
    sqlx::query("SELECT pg_advisory_unlock(hashtext($1))")
        .bind(&adapter.config.lock_name)
        .execute(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed("releasing scrub lock", e))?;
    Ok(())
}

pub async fn table_exists(adapter: &PostgresAdapter, table: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = $1)",
    )
    .bind(table)
    .fetch_one(&adapter.pool)
    .await
    .map_err(|e| ScrubError::statement_failed(format!("looking up {}", table), e))?;

    Ok(exists)
}

pub async fn count_rows(adapter: &PostgresAdapter, table: &str) -> Result<u64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_identifier(table)))
        .fetch_one(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed(format!("counting rows of {}", table), e))?;

    Ok(u64::try_from(count).unwrap_or(0))
}

pub async fn drop_table_if_exists(adapter: &PostgresAdapter, table: &str) -> Result<()> {
    execute(
        adapter,
        &format!("DROP TABLE IF EXISTS {}", quote_identifier(table)),
        format!("dropping {}", table),
    )
    .await?;
    Ok(())
}

pub async fn rename_table(adapter: &PostgresAdapter, from: &str, to: &str) -> Result<()> {
    execute(
        adapter,
        &format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_identifier(from),
            quote_identifier(to)
        ),
        format!("renaming {} to {}", from, to),
    )
    .await?;
    Ok(())
}

pub async fn duplicate_table(
    adapter: &PostgresAdapter,
    source: &str,
    target: &str,
) -> Result<u64> {
    execute(
        adapter,
        &format!(
            "CREATE TABLE {} (LIKE {} INCLUDING ALL)",
            quote_identifier(target),
            quote_identifier(source)
        ),
        format!("creating {} like {}", target, source),
    )
    .await?;

    execute(
        adapter,
        &format!(
            "INSERT INTO {} OVERRIDING SYSTEM VALUE SELECT * FROM {}",
            quote_identifier(target),
            quote_identifier(source)
        ),
        format!("copying {} into {}", source, target),
    )
    .await
}

pub async fn truncate_table(adapter: &PostgresAdapter, table: &str) -> Result<()> {
    execute(
        adapter,
        &format!("TRUNCATE TABLE {}", quote_identifier(table)),
        format!("truncating {}", table),
    )
    .await?;
    Ok(())
}

pub async fn promote_tables(adapter: &PostgresAdapter, tables: &[String]) -> Result<()> {
    if tables.is_empty() {
        return Ok(());
    }

    let context = format!("promoting {}", tables.join(", "));
    let mut tx = adapter
        .pool
        .begin()
        .await
        .map_err(|e| ScrubError::statement_failed(context.clone(), e))?;

    // One TRUNCATE for the group so foreign keys between its tables hold
    let truncate = format!(
        "TRUNCATE {}",
        tables
            .iter()
            .map(|table| quote_identifier(table))
            .collect::<Vec<_>>()
            .join(", ")
    );
    sqlx::query(&truncate)
        .execute(&mut *tx)
        .await
        .map_err(|e| ScrubError::statement_failed(context.clone(), e))?;

    for table in tables {
        let shadow = TableLayout::shadow(table);
        let statements = [
            format!(
                "INSERT INTO {} OVERRIDING SYSTEM VALUE SELECT * FROM {}",
                quote_identifier(table),
                quote_identifier(&shadow)
            ),
            format!("DROP TABLE {}", quote_identifier(&shadow)),
        ];

        for sql in &statements {
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| ScrubError::statement_failed(format!("promoting {}", table), e))?;
        }
    }

    tx.commit()
        .await
        .map_err(|e| ScrubError::statement_failed(context, e))?;

    Ok(())
}

pub async fn ensure_marker_table(adapter: &PostgresAdapter) -> Result<()> {
    execute(
        adapter,
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             table_name VARCHAR(64) PRIMARY KEY, \
             started_at VARCHAR(40) NOT NULL)",
            quote_identifier(PROMOTION_MARKER_TABLE)
        ),
        "creating promotion marker table",
    )
    .await?;
    Ok(())
}

pub async fn mark_promotions(adapter: &PostgresAdapter, tables: &[String]) -> Result<()> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let sql = format!(
        "INSERT INTO {} (table_name, started_at) VALUES ($1, $2) \
         ON CONFLICT (table_name) DO UPDATE SET started_at = EXCLUDED.started_at",
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

pub async fn pending_promotions(adapter: &PostgresAdapter) -> Result<Vec<String>> {
    if !table_exists(adapter, PROMOTION_MARKER_TABLE).await? {
        return Ok(Vec::new());
    }

    let tables: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT table_name::TEXT FROM {} ORDER BY table_name",
        quote_identifier(PROMOTION_MARKER_TABLE)
    ))
    .fetch_all(&adapter.pool)
    .await
    .map_err(|e| ScrubError::statement_failed("reading promotion markers", e))?;

    Ok(tables)
}

pub async fn clear_promotions(adapter: &PostgresAdapter, tables: &[String]) -> Result<()> {
    let sql = format!(
        "DELETE FROM {} WHERE table_name = $1",
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
