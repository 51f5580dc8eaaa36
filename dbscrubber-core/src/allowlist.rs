//! Allow-list filter deciding which accounts keep their real data.
//!
//! An account is exempt when its email contains `"@" + domain` for any
//! allowed domain, or equals an allowed address exactly. Both checks are
//! case-sensitive. The `should_scrub_account` hook sees the verdict and has
//! the final say.

use crate::hooks::ScrubHooks;
use crate::models::AccountRow;

/// Domains that are always exempt, whatever the caller passes.
pub const BUILTIN_ALLOWED_DOMAINS: [&str; 2] = ["get10up.com", "10up.com"];

/// Splits a comma-separated CLI value into trimmed, non-empty entries.
pub fn parse_comma_list(value: &str) -> Vec<String> {
    normalize(value.split(',').map(str::to_string))
}

/// Trims entries, drops empty ones and removes duplicates, keeping order.
fn normalize(entries: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for entry in entries {
        let trimmed = entry.trim();
        if !trimmed.is_empty() && !normalized.iter().any(|e| e == trimmed) {
            normalized.push(trimmed.to_string());
        }
    }
    normalized
}

/// Effective allow-lists for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    domains: Vec<String>,
    emails: Vec<String>,
}

impl AllowList {
    /// Builds the allow-list from caller input, merging in the built-in
    /// domains.
    pub fn new(domains: Vec<String>, emails: Vec<String>) -> Self {
        let merged = domains
            .into_iter()
            .chain(BUILTIN_ALLOWED_DOMAINS.iter().map(|d| (*d).to_string()));

        Self {
            domains: normalize(merged),
            emails: normalize(emails),
        }
    }

    /// Builds the allow-list and passes both lists through the filter hooks.
    ///
    /// Whatever the hooks return is kept as-is, so a hook can also remove
    /// the built-in domains.
    pub fn with_hooks(domains: Vec<String>, emails: Vec<String>, hooks: &dyn ScrubHooks) -> Self {
        let base = Self::new(domains, emails);
        Self {
            domains: hooks.allowed_domains(base.domains),
            emails: hooks.allowed_emails(base.emails),
        }
    }

    /// Effective exempted domains.
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Effective exempted addresses.
    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    /// Whether `email` matches an allowed domain or address.
    pub fn is_exempt(&self, email: &str) -> bool {
        let domain_match = self
            .domains
            .iter()
            .any(|domain| email.contains(&format!("@{}", domain)));

        domain_match || self.emails.iter().any(|allowed| allowed == email)
    }

    /// Scrub decision for `account`, after the hook override.
    pub fn should_scrub(&self, account: &AccountRow, hooks: &dyn ScrubHooks) -> bool {
        let decision = !self.is_exempt(&account.user_email);
        hooks.should_scrub_account(decision, account)
    }
}
