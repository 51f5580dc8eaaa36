//! SQLite working-copy DDL, promotion and run bookkeeping.
//!
//! SQLite has no `CREATE TABLE ... LIKE`; working copies are created from
//! the original's stored `CREATE TABLE` statement with the name replaced.
//! Promotion is transactional, as in PostgreSQL, and runs with foreign key
//! enforcement switched off for the connection.

use super::SqliteAdapter;
use crate::Result;
use crate::adapters::{PROMOTION_MARKER_TABLE, TableLayout};
use crate::error::ScrubError;
use sqlx::{Connection, SqliteConnection};
use tracing::warn;

/// Double-quotes an identifier.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Rewrites a stored `CREATE TABLE` statement to create `target` instead.
///
/// Everything from the opening parenthesis of the column list onwards is
/// kept verbatim. Returns `None` when the statement has no column list.
pub(crate) fn rewrite_create_statement(create_sql: &str, target: &str) -> Option<String> {
    let columns_start = create_sql.find('(')?;
    Some(format!(
        "CREATE TABLE {} {}",
        quote_identifier(target),
        &create_sql[columns_start..]
    ))
}

async fn execute(adapter: &SqliteAdapter, sql: &str, context: impl Into<String>) -> Result<u64> {
    let result = sqlx::query(sql)
        .execute(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed(context, e))?;
    Ok(result.rows_affected())
}

pub async fn database_size_bytes(adapter: &SqliteAdapter) -> Result<u64> {
    let size: i64 = sqlx::query_scalar(
        "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
    )
    .fetch_one(&adapter.pool)
    .await
    .map_err(|e| ScrubError::statement_failed("measuring database size", e))?;

    Ok(u64::try_from(size).unwrap_or(0))
}

pub async fn table_exists(adapter: &SqliteAdapter, table: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_one(&adapter.pool)
            .await
            .map_err(|e| ScrubError::statement_failed(format!("looking up {}", table), e))?;

    Ok(count > 0)
}

pub async fn count_rows(adapter: &SqliteAdapter, table: &str) -> Result<u64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_identifier(table)))
        .fetch_one(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed(format!("counting rows of {}", table), e))?;

    Ok(u64::try_from(count).unwrap_or(0))
}

pub async fn drop_table_if_exists(adapter: &SqliteAdapter, table: &str) -> Result<()> {
    execute(
        adapter,
        &format!("DROP TABLE IF EXISTS {}", quote_identifier(table)),
        format!("dropping {}", table),
    )
    .await?;
    Ok(())
}

pub async fn rename_table(adapter: &SqliteAdapter, from: &str, to: &str) -> Result<()> {
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

pub async fn duplicate_table(adapter: &SqliteAdapter, source: &str, target: &str) -> Result<u64> {
    let create_sql: String =
        sqlx::query_scalar("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(source)
            .fetch_one(&adapter.pool)
            .await
            .map_err(|e| ScrubError::statement_failed(format!("reading schema of {}", source), e))?;

    let target_sql = rewrite_create_statement(&create_sql, target).ok_or_else(|| {
        ScrubError::unsupported_feature(
            format!("copying the schema of {}", source),
            "SQLite tables without a column list",
        )
    })?;

    execute(
        adapter,
        &target_sql,
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

pub async fn truncate_table(adapter: &SqliteAdapter, table: &str) -> Result<()> {
    execute(
        adapter,
        &format!("DELETE FROM {}", quote_identifier(table)),
        format!("truncating {}", table),
    )
    .await?;
    Ok(())
}

pub async fn promote_tables(adapter: &SqliteAdapter, tables: &[String]) -> Result<()> {
    if tables.is_empty() {
        return Ok(());
    }

    let context = format!("promoting {}", tables.join(", "));
    let mut conn = adapter
        .pool
        .acquire()
        .await
        .map_err(|e| ScrubError::statement_failed(context.clone(), e))?;

    // Clearing the originals must neither cascade into nor be blocked by
    // tables that reference them. The pragma is ignored inside a
    // transaction, so it is toggled around it.
    let foreign_keys: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| ScrubError::statement_failed("reading foreign key enforcement", e))?;
    if foreign_keys != 0 {
        set_foreign_keys(&mut conn, false).await?;
    }

    let outcome = copy_back(&mut conn, tables, &context).await;

    if foreign_keys != 0 {
        set_foreign_keys(&mut conn, true).await?;
    }
    outcome
}

async fn set_foreign_keys(conn: &mut SqliteConnection, enabled: bool) -> Result<()> {
    let sql = if enabled {
        "PRAGMA foreign_keys = ON"
    } else {
        "PRAGMA foreign_keys = OFF"
    };
    sqlx::query(sql)
        .execute(&mut *conn)
        .await
        .map_err(|e| ScrubError::statement_failed("switching foreign key enforcement", e))?;
    Ok(())
}

/// Replaces each original's rows with its working copy's and drops the
/// copy, all in one transaction.
async fn copy_back(conn: &mut SqliteConnection, tables: &[String], context: &str) -> Result<()> {
    let mut tx = conn
        .begin()
        .await
        .map_err(|e| ScrubError::statement_failed(context, e))?;

    for table in tables {
        let shadow = TableLayout::shadow(table);
        let statements = [
            format!("DELETE FROM {}", quote_identifier(table)),
            format!(
                "INSERT INTO {} SELECT * FROM {}",
                quote_identifier(table),
                quote_identifier(&shadow)
            ),
            format!("DROP TABLE {}", quote_identifier(&shadow)),
        ];

        for sql in &statements {
            if let Err(e) = sqlx::query(sql).execute(&mut *tx).await {
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback of {} failed: {}", context, rollback);
                }
                return Err(ScrubError::statement_failed(format!("promoting {}", table), e));
            }
        }
    }

    tx.commit()
        .await
        .map_err(|e| ScrubError::statement_failed(context, e))?;

    Ok(())
}

pub async fn ensure_marker_table(adapter: &SqliteAdapter) -> Result<()> {
    execute(
        adapter,
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             table_name TEXT PRIMARY KEY, \
             started_at TEXT NOT NULL)",
            quote_identifier(PROMOTION_MARKER_TABLE)
        ),
        "creating promotion marker table",
    )
    .await?;
    Ok(())
}

pub async fn mark_promotions(adapter: &SqliteAdapter, tables: &[String]) -> Result<()> {
    let started_at = chrono::Utc::now().to_rfc3339();
    let sql = format!(
        "INSERT OR REPLACE INTO {} (table_name, started_at) VALUES (?, ?)",
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

pub async fn pending_promotions(adapter: &SqliteAdapter) -> Result<Vec<String>> {
    if !table_exists(adapter, PROMOTION_MARKER_TABLE).await? {
        return Ok(Vec::new());
    }

    let tables: Vec<String> = sqlx::query_scalar(&format!(
        "SELECT table_name FROM {} ORDER BY table_name",
        quote_identifier(PROMOTION_MARKER_TABLE)
    ))
    .fetch_all(&adapter.pool)
    .await
    .map_err(|e| ScrubError::statement_failed("reading promotion markers", e))?;

    Ok(tables)
}

pub async fn clear_promotions(adapter: &SqliteAdapter, tables: &[String]) -> Result<()> {
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
