//! SQLite account and attribute statements.

use super::SqliteAdapter;
use super::tables::quote_identifier;
use crate::Result;
use crate::adapters::{AccountUpdate, NameAttributes, question_placeholders};
use crate::error::ScrubError;
use crate::models::AccountRow;

pub async fn fetch_accounts(
    adapter: &SqliteAdapter,
    table: &str,
    limit: u32,
    offset: u64,
) -> Result<Vec<AccountRow>> {
    let sql = format!(
        "SELECT ID, user_login, user_email FROM {} ORDER BY ID LIMIT ? OFFSET ?",
        quote_identifier(table)
    );

    let offset_param = i64::try_from(offset).map_err(|_| {
        ScrubError::configuration(format!("offset {} exceeds the supported range", offset))
    })?;

    let rows: Vec<(i64, Option<String>, Option<String>)> = sqlx::query_as(&sql)
        .bind(i64::from(limit))
        .bind(offset_param)
        .fetch_all(&adapter.pool)
        .await
        .map_err(|e| {
            ScrubError::statement_failed(format!("reading {} at offset {}", table, offset), e)
        })?;

    Ok(rows
        .into_iter()
        .map(|(id, login, email)| AccountRow {
            id,
            user_login: login.unwrap_or_default(),
            user_email: email.unwrap_or_default(),
        })
        .collect())
}

pub async fn update_accounts(
    adapter: &SqliteAdapter,
    table: &str,
    updates: &[AccountUpdate],
) -> Result<u64> {
    if updates.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "UPDATE {} SET user_pass = ?, user_email = ?, user_url = '', \
         user_activation_key = '', user_login = ?, user_nicename = ?, display_name = ? \
         WHERE ID = ?",
        quote_identifier(table)
    );

    let context = format!("updating accounts in {}", table);
    let mut tx = adapter
        .pool
        .begin()
        .await
        .map_err(|e| ScrubError::statement_failed(context.clone(), e))?;

    let mut affected = 0;
    for update in updates {
        let result = sqlx::query(&sql)
            .bind(&update.password_hash)
            .bind(&update.email)
            .bind(&update.login)
            .bind(&update.nicename)
            .bind(&update.display_name)
            .bind(update.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| ScrubError::statement_failed(format!("updating account {}", update.id), e))?;
        affected += result.rows_affected();
    }

    tx.commit()
        .await
        .map_err(|e| ScrubError::statement_failed(context, e))?;

    Ok(affected)
}

pub async fn blank_attributes(adapter: &SqliteAdapter, table: &str, keys: &[&str]) -> Result<u64> {
    if keys.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "UPDATE {} SET meta_value = '' WHERE meta_key IN ({})",
        quote_identifier(table),
        question_placeholders(keys.len())
    );

    let mut query = sqlx::query(&sql);
    for key in keys {
        query = query.bind(*key);
    }

    let result = query
        .execute(&adapter.pool)
        .await
        .map_err(|e| ScrubError::statement_failed(format!("blanking attributes in {}", table), e))?;

    Ok(result.rows_affected())
}

pub async fn update_name_attributes(
    adapter: &SqliteAdapter,
    table: &str,
    updates: &[NameAttributes],
) -> Result<u64> {
    if updates.is_empty() {
        return Ok(0);
    }

    let sql = format!(
        "UPDATE {} SET meta_value = CASE meta_key \
         WHEN 'first_name' THEN ? WHEN 'last_name' THEN ? ELSE ? END \
         WHERE user_id = ? AND meta_key IN ('first_name', 'last_name', 'nickname')",
        quote_identifier(table)
    );

    let context = format!("updating name attributes in {}", table);
    let mut tx = adapter
        .pool
        .begin()
        .await
        .map_err(|e| ScrubError::statement_failed(context.clone(), e))?;

    let mut affected = 0;
    for update in updates {
        let result = sqlx::query(&sql)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(&update.nickname)
            .bind(update.account_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                ScrubError::statement_failed(
                    format!("updating attributes of account {}", update.account_id),
                    e,
                )
            })?;
        affected += result.rows_affected();
    }

    tx.commit()
        .await
        .map_err(|e| ScrubError::statement_failed(context, e))?;

    Ok(affected)
}
