//! Target table naming.
//!
//! Table names are interpolated into DDL (`CREATE TABLE`, `RENAME`, `DROP`),
//! where bind parameters are not available, so every name is built from a
//! validated prefix plus fixed suffixes.

use serde::{Deserialize, Serialize};

/// Suffix of working copies.
pub const SHADOW_SUFFIX: &str = "_temp";

/// Suffix of originals parked during an atomic rename swap.
pub const RETIRED_SUFFIX: &str = "_old";

/// Table recording promotions that have started but not finished.
pub const PROMOTION_MARKER_TABLE: &str = "dbscrubber_promotions";

/// Attribute keys blanked for every account.
pub const BLANKED_ATTRIBUTE_KEYS: [&str; 2] = ["description", "session_tokens"];

/// Longest identifier accepted by all supported backends.
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Longest base table name ("commentmeta") plus the longest suffix.
const LONGEST_DERIVED_SUFFIX: usize = "commentmeta".len() + SHADOW_SUFFIX.len();

/// Checks that `name` is a plain identifier safe to interpolate into SQL.
pub fn validate_identifier(name: &str) -> crate::Result<()> {
    if name.is_empty() || name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(crate::error::ScrubError::configuration(format!(
            "Identifier '{}' must be 1-{} characters",
            name, MAX_IDENTIFIER_LENGTH
        )));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(crate::error::ScrubError::configuration(format!(
            "Identifier '{}' may only contain ASCII letters, digits and underscores",
            name
        )));
    }

    Ok(())
}

/// Names of the four tables a run touches, derived from a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    prefix: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            prefix: "wp_".to_string(),
        }
    }
}

impl TableLayout {
    /// Creates a layout for `prefix` (may be empty).
    ///
    /// # Errors
    /// Returns `Configuration` when the prefix contains characters other
    /// than ASCII letters, digits and underscores, or is too long for the
    /// derived working-table names.
    pub fn new(prefix: impl Into<String>) -> crate::Result<Self> {
        let prefix = prefix.into();

        if !prefix.is_empty() {
            validate_identifier(&prefix)?;
        }

        if prefix.len().saturating_add(LONGEST_DERIVED_SUFFIX) > MAX_IDENTIFIER_LENGTH {
            return Err(crate::error::ScrubError::configuration(format!(
                "Table prefix '{}' is too long",
                prefix
            )));
        }

        Ok(Self { prefix })
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Account table.
    pub fn accounts(&self) -> String {
        format!("{}users", self.prefix)
    }

    /// Account attribute table.
    pub fn account_attributes(&self) -> String {
        format!("{}usermeta", self.prefix)
    }

    /// Comment table.
    pub fn comments(&self) -> String {
        format!("{}comments", self.prefix)
    }

    /// Comment attribute table.
    pub fn comment_attributes(&self) -> String {
        format!("{}commentmeta", self.prefix)
    }

    /// Working copy name for `table`.
    pub fn shadow(table: &str) -> String {
        format!("{}{}", table, SHADOW_SUFFIX)
    }

    /// Parking name for `table` during a rename swap.
    pub fn retired(table: &str) -> String {
        format!("{}{}", table, RETIRED_SUFFIX)
    }
}
