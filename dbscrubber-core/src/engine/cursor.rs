//! Offset pagination over the account working copy.

use crate::Result;
use crate::adapters::ScrubAdapter;
use crate::models::AccountRow;
use std::time::Duration;
use tracing::debug;

/// Sleeps for `delay` unless it is zero.
pub(crate) async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Walks a table in pages ordered by id, remembering every id it saw.
///
/// Pages are fetched with `LIMIT batch_size OFFSET n`; the walk ends on the
/// first empty page. Every page after the first is preceded by the pacing
/// delay.
pub struct BatchCursor<'a> {
    adapter: &'a dyn ScrubAdapter,
    table: String,
    batch_size: u32,
    pacing_delay: Duration,
    offset: u64,
    pages_read: u64,
    visited: Vec<i64>,
}

impl<'a> BatchCursor<'a> {
    pub fn new(
        adapter: &'a dyn ScrubAdapter,
        table: impl Into<String>,
        batch_size: u32,
        pacing_delay: Duration,
    ) -> Self {
        Self {
            adapter,
            table: table.into(),
            batch_size: batch_size.max(1),
            pacing_delay,
            offset: 0,
            pages_read: 0,
            visited: Vec::new(),
        }
    }

    /// Fetches the next page, or `None` once the table is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<AccountRow>>> {
        if self.pages_read > 0 {
            pace(self.pacing_delay).await;
        }

        let rows = self
            .adapter
            .fetch_accounts(&self.table, self.batch_size, self.offset)
            .await?;

        if rows.is_empty() {
            debug!("{} exhausted after {} pages", self.table, self.pages_read);
            return Ok(None);
        }

        self.offset += rows.len() as u64;
        self.pages_read += 1;
        self.visited.extend(rows.iter().map(|row| row.id));
        debug!(
            "Read page {} of {} ({} rows, offset now {})",
            self.pages_read,
            self.table,
            rows.len(),
            self.offset
        );

        Ok(Some(rows))
    }

    /// Pages read so far.
    pub fn pages_read(&self) -> u64 {
        self.pages_read
    }

    /// Consumes the cursor, returning every id it saw.
    pub fn into_visited(self) -> Vec<i64> {
        self.visited
    }
}
