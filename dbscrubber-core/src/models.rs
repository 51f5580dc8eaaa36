//! Core data models for scrub runs.
//!
//! These types describe what a run was asked to do ([`ScrubRequest`]), the
//! rows it walks ([`AccountRow`]), where it is in its lifecycle
//! ([`ScrubPhase`]) and what it did ([`ScrubReport`]). None of them ever hold
//! replaced values, so a report can be printed or stored safely.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported database types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
    MySQL,
    SQLite,
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseType::PostgreSQL => write!(f, "PostgreSQL"),
            DatabaseType::MySQL => write!(f, "MySQL"),
            DatabaseType::SQLite => write!(f, "SQLite"),
        }
    }
}

/// Classification of the environment a database copy lives in.
///
/// Unlabelled hosts are treated as production.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    Local,
    Development,
    Staging,
    #[default]
    Production,
}

impl EnvironmentType {
    /// Production environments require an explicit override to be scrubbed.
    pub fn is_protected(self) -> bool {
        matches!(self, EnvironmentType::Production)
    }
}

impl std::fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvironmentType::Local => write!(f, "local"),
            EnvironmentType::Development => write!(f, "development"),
            EnvironmentType::Staging => write!(f, "staging"),
            EnvironmentType::Production => write!(f, "production"),
        }
    }
}

impl FromStr for EnvironmentType {
    type Err = crate::error::ScrubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(EnvironmentType::Local),
            "development" | "dev" => Ok(EnvironmentType::Development),
            "staging" | "stage" => Ok(EnvironmentType::Staging),
            "production" | "prod" => Ok(EnvironmentType::Production),
            other => Err(crate::error::ScrubError::configuration(format!(
                "Unknown environment type '{}': expected local, development, staging or production",
                other
            ))),
        }
    }
}

/// Which record kinds a run scrubs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrubMode {
    All,
    Users,
    Comments,
}

impl ScrubMode {
    /// Whether the account and account attribute tables are scrubbed.
    pub fn includes_users(self) -> bool {
        matches!(self, ScrubMode::All | ScrubMode::Users)
    }

    /// Whether the comment tables are emptied.
    pub fn includes_comments(self) -> bool {
        matches!(self, ScrubMode::All | ScrubMode::Comments)
    }
}

impl std::fmt::Display for ScrubMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrubMode::All => write!(f, "all"),
            ScrubMode::Users => write!(f, "users"),
            ScrubMode::Comments => write!(f, "comments"),
        }
    }
}

/// The invocation arguments of a run, as handed to lifecycle hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrubRequest {
    pub mode: ScrubMode,
    pub allowed_domains: Vec<String>,
    pub allowed_emails: Vec<String>,
    pub ignore_size_limit: bool,
}

impl ScrubRequest {
    /// Creates a request for the given mode with empty allow-lists.
    pub fn new(mode: ScrubMode) -> Self {
        Self {
            mode,
            allowed_domains: Vec::new(),
            allowed_emails: Vec::new(),
            ignore_size_limit: false,
        }
    }
}

/// The subset of an account row the engine reads while walking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: i64,
    pub user_login: String,
    pub user_email: String,
}

/// Lifecycle phases of a scrub run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScrubPhase {
    Guarding,
    DuplicatingAccounts,
    WalkingAccounts,
    DuplicatingAttributes,
    MutatingAttributes,
    PromotingAccounts,
    DuplicatingComments,
    TruncatingComments,
    PromotingComments,
    Done,
    Aborted,
}

impl ScrubPhase {
    /// Returns true when the engine may move from `self` to `next`.
    ///
    /// Users-only runs go from `PromotingAccounts` straight to `Done`;
    /// comments-only runs go from `Guarding` straight to
    /// `DuplicatingComments`.
    pub fn can_transition_to(self, next: ScrubPhase) -> bool {
        use ScrubPhase::*;

        matches!(
            (self, next),
            (Guarding, DuplicatingAccounts)
                | (Guarding, DuplicatingComments)
                | (Guarding, Aborted)
                | (DuplicatingAccounts, WalkingAccounts)
                | (WalkingAccounts, DuplicatingAttributes)
                | (DuplicatingAttributes, MutatingAttributes)
                | (MutatingAttributes, PromotingAccounts)
                | (PromotingAccounts, DuplicatingComments)
                | (PromotingAccounts, Done)
                | (DuplicatingComments, TruncatingComments)
                | (TruncatingComments, PromotingComments)
                | (PromotingComments, Done)
        )
    }

    /// Terminal phases accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ScrubPhase::Done | ScrubPhase::Aborted)
    }
}

impl std::fmt::Display for ScrubPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ScrubPhase::Guarding => "guarding",
            ScrubPhase::DuplicatingAccounts => "duplicating(accounts)",
            ScrubPhase::WalkingAccounts => "walking(accounts)",
            ScrubPhase::DuplicatingAttributes => "duplicating(attributes)",
            ScrubPhase::MutatingAttributes => "mutating(attributes)",
            ScrubPhase::PromotingAccounts => "promoting(accounts+attributes)",
            ScrubPhase::DuplicatingComments => "duplicating(comments)",
            ScrubPhase::TruncatingComments => "truncating(comments)",
            ScrubPhase::PromotingComments => "promoting(comments)",
            ScrubPhase::Done => "done",
            ScrubPhase::Aborted => "aborted",
        };
        write!(f, "{}", name)
    }
}

/// Summary of a completed scrub run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrubReport {
    pub mode: ScrubMode,
    pub database_type: DatabaseType,
    /// Size observed by the size guard, if it ran
    pub database_size_mb: Option<u64>,
    /// Whether the run held the advisory lock; false on backends without one
    pub run_lock_held: bool,
    pub accounts_visited: u64,
    pub accounts_scrubbed: u64,
    pub accounts_exempted: u64,
    pub attribute_rows_updated: u64,
    pub comment_tables_emptied: u32,
    /// Tables whose interrupted promotion was completed at start-up
    pub recovered_promotions: Vec<String>,
    pub phases: Vec<ScrubPhase>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub duration_ms: u64,
}

impl ScrubReport {
    /// Creates an empty report stamped with the current time.
    pub fn new(mode: ScrubMode, database_type: DatabaseType) -> Self {
        Self {
            mode,
            database_type,
            database_size_mb: None,
            run_lock_held: false,
            accounts_visited: 0,
            accounts_scrubbed: 0,
            accounts_exempted: 0,
            attribute_rows_updated: 0,
            comment_tables_emptied: 0,
            recovered_promotions: Vec::new(),
            phases: Vec::new(),
            started_at: chrono::Utc::now(),
            duration_ms: 0,
        }
    }

    /// The last phase the run reached.
    pub fn final_phase(&self) -> Option<ScrubPhase> {
        self.phases.last().copied()
    }
}

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;
