//! Account, attribute and comment passes.

use super::cursor::{BatchCursor, pace};
use super::shadow::ShadowTableManager;
use super::{PhaseTracker, Scrubber};
use crate::Result;
use crate::adapters::{AccountUpdate, BLANKED_ATTRIBUTE_KEYS, NameAttributes};
use crate::allowlist::AllowList;
use crate::models::{AccountRow, ScrubPhase, ScrubReport};
use tracing::{debug, info};

impl Scrubber<'_> {
    /// Scrubs the account table and its attribute table, then promotes both.
    pub(super) async fn scrub_accounts(
        &self,
        shadows: &ShadowTableManager<'_>,
        allow_list: &AllowList,
        tracker: &mut PhaseTracker,
        report: &mut ScrubReport,
    ) -> Result<()> {
        let accounts = self.layout.accounts();
        let attributes = self.layout.account_attributes();

        tracker.advance(ScrubPhase::DuplicatingAccounts)?;
        info!("Duplicating {}...", accounts);
        let accounts_shadow = shadows.duplicate(&accounts).await?;

        tracker.advance(ScrubPhase::WalkingAccounts)?;
        info!("Scrubbing {}...", accounts);
        let (visited, scrubbed) = self
            .walk_accounts(&accounts_shadow, allow_list, report)
            .await?;

        tracker.advance(ScrubPhase::DuplicatingAttributes)?;
        info!("Duplicating {}...", attributes);
        let attributes_shadow = shadows.duplicate(&attributes).await?;

        tracker.advance(ScrubPhase::MutatingAttributes)?;
        info!("Scrubbing {}...", attributes);
        let name_targets = if self.config.preserve_exempt_attributes {
            &scrubbed
        } else {
            &visited
        };
        self.mutate_attributes(&attributes_shadow, name_targets, report)
            .await?;

        tracker.advance(ScrubPhase::PromotingAccounts)?;
        info!("Replacing {} and {}...", accounts, attributes);
        shadows.promote(&[accounts, attributes]).await?;

        info!(
            "✓ Accounts scrubbed: {} scrubbed, {} exempt",
            report.accounts_scrubbed, report.accounts_exempted
        );
        Ok(())
    }

    /// Walks the account working copy, rewriting every account that is not
    /// exempt. Returns the visited ids and the scrubbed ids.
    async fn walk_accounts(
        &self,
        table: &str,
        allow_list: &AllowList,
        report: &mut ScrubReport,
    ) -> Result<(Vec<i64>, Vec<i64>)> {
        let mut cursor = BatchCursor::new(
            self.adapter,
            table,
            self.config.batch_size,
            self.config.pacing_delay,
        );
        let mut scrubbed = Vec::new();

        while let Some(page) = cursor.next_page().await? {
            let mut updates = Vec::with_capacity(page.len());

            for account in &page {
                report.accounts_visited += 1;

                if allow_list.should_scrub(account, self.hooks) {
                    updates.push(self.account_update(account)?);
                    scrubbed.push(account.id);
                } else {
                    debug!("Account {} is exempt", account.id);
                    report.accounts_exempted += 1;
                }
            }

            self.adapter.update_accounts(table, &updates).await?;
            report.accounts_scrubbed += updates.len() as u64;
        }

        Ok((cursor.into_visited(), scrubbed))
    }

    /// Replacement values for `account` from its mapped identity.
    fn account_update(&self, account: &AccountRow) -> Result<AccountUpdate> {
        let identity = self.identities.identity_for(account.id);

        Ok(AccountUpdate {
            id: account.id,
            password_hash: self.secrets.replacement_hash(self.hooks)?,
            email: identity.email.clone(),
            login: identity.username.clone(),
            nicename: identity.username.clone(),
            display_name: identity.display_name(),
        })
    }

    /// Blanks free-text attributes for everyone, then rewrites name
    /// attributes for `account_ids` in paced chunks.
    async fn mutate_attributes(
        &self,
        table: &str,
        account_ids: &[i64],
        report: &mut ScrubReport,
    ) -> Result<()> {
        let blanked = self
            .adapter
            .blank_attributes(table, &BLANKED_ATTRIBUTE_KEYS)
            .await?;
        debug!("Blanked {} attribute rows", blanked);
        report.attribute_rows_updated += blanked;

        let chunk_size = self.config.batch_size as usize;
        for (chunk_index, chunk) in account_ids.chunks(chunk_size).enumerate() {
            if chunk_index > 0 {
                pace(self.config.pacing_delay).await;
            }

            let updates: Vec<NameAttributes> = chunk
                .iter()
                .map(|&account_id| {
                    let identity = self.identities.identity_for(account_id);
                    NameAttributes {
                        account_id,
                        first_name: identity.first_name.clone(),
                        last_name: identity.last_name.clone(),
                        nickname: identity.first_name.clone(),
                    }
                })
                .collect();

            report.attribute_rows_updated +=
                self.adapter.update_name_attributes(table, &updates).await?;
        }

        Ok(())
    }

    /// Empties the comment table and its attribute table via working copies.
    pub(super) async fn scrub_comments(
        &self,
        shadows: &ShadowTableManager<'_>,
        tracker: &mut PhaseTracker,
        report: &mut ScrubReport,
    ) -> Result<()> {
        let tables = [self.layout.comments(), self.layout.comment_attributes()];

        tracker.advance(ScrubPhase::DuplicatingComments)?;
        let mut working = Vec::with_capacity(tables.len());
        for table in &tables {
            info!("Duplicating {}...", table);
            working.push(shadows.duplicate(table).await?);
        }

        tracker.advance(ScrubPhase::TruncatingComments)?;
        for table in &working {
            info!("Truncating {}...", table);
            self.adapter.truncate_table(table).await?;
        }

        tracker.advance(ScrubPhase::PromotingComments)?;
        shadows.promote(&tables).await?;
        report.comment_tables_emptied += tables.len() as u32;

        info!("✓ Comments removed");
        Ok(())
    }
}
