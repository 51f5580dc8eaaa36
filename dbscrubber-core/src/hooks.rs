//! Extension points consumed by the scrub engine.
//!
//! Integrators customise a run by implementing [`ScrubHooks`] and passing it
//! to [`crate::engine::Scrubber::with_hooks`]. Every method has a no-op
//! default, so an implementation only overrides what it needs. Return values
//! are used verbatim: the engine does not re-normalize or re-validate them.
//!
//! Call order during a run:
//! 1. `before_scrub`
//! 2. `allow_on_production` (only for production environments)
//! 3. `size_limit_mb`
//! 4. `allowed_domains`, `allowed_emails` (once per run)
//! 5. `should_scrub_account`, `scrubbed_password` (once per account)
//! 6. `after_scrub` (successful runs only)

use crate::models::{AccountRow, ScrubReport, ScrubRequest};

/// Extension points for a scrub run.
pub trait ScrubHooks: Send + Sync {
    /// Called before any guard runs.
    fn before_scrub(&self, _request: &ScrubRequest) {}

    /// Called after every requested table has been promoted.
    fn after_scrub(&self, _request: &ScrubRequest, _report: &ScrubReport) {}

    /// Allows a run against a production-classified environment.
    fn allow_on_production(&self) -> bool {
        false
    }

    /// Effective database size limit in megabytes.
    fn size_limit_mb(&self, default: u64) -> u64 {
        default
    }

    /// Effective list of exempted email domains.
    fn allowed_domains(&self, domains: Vec<String>) -> Vec<String> {
        domains
    }

    /// Effective list of exempted email addresses.
    fn allowed_emails(&self, emails: Vec<String>) -> Vec<String> {
        emails
    }

    /// Final say on whether `account` is scrubbed; `decision` is the
    /// allow-list verdict (true means scrub).
    fn should_scrub_account(&self, decision: bool, _account: &AccountRow) -> bool {
        decision
    }

    /// A ready-to-store password hash for scrubbed accounts. `None` falls
    /// back to a random Argon2id hash per account.
    fn scrubbed_password(&self) -> Option<String> {
        None
    }
}

/// Hooks that change nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl ScrubHooks for DefaultHooks {}
