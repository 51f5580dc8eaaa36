//! Synthetic identity pool and the account-to-identity mapping.
//!
//! The pool is loaded once per run from a headerless four-column CSV
//! (username, first name, last name, email) and is read-only afterwards.
//! A 1000-row pool ships with the crate; callers may supply their own file.
//!
//! Account ids map onto the pool with `account_id mod P`, where `P` is the
//! number of identities actually loaded. The mapping is not injective: two
//! accounts whose ids differ by a multiple of `P` share an identity.

use crate::error::ScrubError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// The embedded default dataset.
const BUILTIN_DATASET: &str = include_str!("../data/users.csv");

/// Number of columns every dataset row must have.
const DATASET_COLUMNS: usize = 4;

/// A pre-generated, non-real identity used to replace account data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticIdentity {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl SyntheticIdentity {
    /// Display name written to the account row: "first last".
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Immutable pool of synthetic identities.
#[derive(Debug, Clone)]
pub struct IdentityPool {
    identities: Vec<SyntheticIdentity>,
}

impl IdentityPool {
    /// Loads the dataset embedded in the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_reader(BUILTIN_DATASET.as_bytes())
    }

    /// Loads a dataset from a CSV file on disk.
    ///
    /// # Errors
    /// Returns `MissingDataset` if the file cannot be opened and
    /// `InvalidDataset` if it is empty or malformed.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| ScrubError::MissingDataset {
            path: path.display().to_string(),
            source: e,
        })?;

        let pool = Self::from_reader(file)?;
        tracing::debug!(
            "Loaded {} synthetic identities from {}",
            pool.len(),
            path.display()
        );
        Ok(pool)
    }

    /// Parses a dataset from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut identities = Vec::new();
        for (line, record) in csv_reader.records().enumerate() {
            let record = record.map_err(|e| {
                ScrubError::invalid_dataset(format!("row {}: {}", line.saturating_add(1), e))
            })?;

            if record.len() != DATASET_COLUMNS {
                return Err(ScrubError::invalid_dataset(format!(
                    "row {} has {} columns, expected {}",
                    line.saturating_add(1),
                    record.len(),
                    DATASET_COLUMNS
                )));
            }

            identities.push(SyntheticIdentity {
                username: record[0].to_string(),
                first_name: record[1].to_string(),
                last_name: record[2].to_string(),
                email: record[3].to_string(),
            });
        }

        Self::from_identities(identities)
    }

    /// Builds a pool from already-parsed identities.
    ///
    /// # Errors
    /// Returns `InvalidDataset` when `identities` is empty.
    pub fn from_identities(identities: Vec<SyntheticIdentity>) -> Result<Self> {
        if identities.is_empty() {
            return Err(ScrubError::invalid_dataset("dataset contains no identities"));
        }
        Ok(Self { identities })
    }

    /// Number of identities in the pool (the mapping modulus).
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Always false for a constructed pool.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Index of the identity assigned to `account_id`.
    pub fn index_for(&self, account_id: i64) -> usize {
        let modulus = i64::try_from(self.identities.len()).unwrap_or(i64::MAX);
        usize::try_from(account_id.rem_euclid(modulus)).unwrap_or(0)
    }

    /// Identity assigned to `account_id`.
    pub fn identity_for(&self, account_id: i64) -> &SyntheticIdentity {
        &self.identities[self.index_for(account_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn identity(n: usize) -> SyntheticIdentity {
        SyntheticIdentity {
            username: format!("user{}", n),
            first_name: format!("First{}", n),
            last_name: format!("Last{}", n),
            email: format!("user{}@example.com", n),
        }
    }

    #[test]
    fn test_builtin_dataset_has_thousand_rows() {
        let pool = IdentityPool::builtin().unwrap();
        assert_eq!(pool.len(), 1000);
        let first = pool.identity_for(0);
        assert!(!first.username.is_empty());
        assert!(first.email.contains('@'));
    }

    #[test]
    fn test_mapping_uses_loaded_pool_size() {
        let pool = IdentityPool::from_identities((0..7).map(identity).collect()).unwrap();
        assert_eq!(pool.index_for(3), 3);
        assert_eq!(pool.index_for(7), 0);
        assert_eq!(pool.index_for(15), 1);
        assert_eq!(pool.identity_for(15).username, "user1");
    }

    #[test]
    fn test_mapping_for_account_42() {
        let pool = IdentityPool::builtin().unwrap();
        assert_eq!(pool.index_for(42), 42);
        assert_eq!(pool.index_for(1042), 42);
        assert_eq!(pool.identity_for(42), &pool.identities[42]);
    }

    #[test]
    fn test_mapping_handles_negative_ids() {
        let pool = IdentityPool::from_identities((0..10).map(identity).collect()).unwrap();
        assert_eq!(pool.index_for(-1), 9);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(identity(3).display_name(), "First3 Last3");
    }

    #[test]
    fn test_from_reader_trims_fields() {
        let data = "jdoe , Jane, Doe ,jdoe@example.com\n";
        let pool = IdentityPool::from_reader(data.as_bytes()).unwrap();
        let entry = &pool.identities[0];
        assert_eq!(entry.username, "jdoe");
        assert_eq!(entry.last_name, "Doe");
    }

    #[test]
    fn test_wrong_column_count_is_rejected() {
        let data = "jdoe,Jane,Doe,jdoe@example.com\nbroken,row\n";
        let err = IdentityPool::from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, ScrubError::InvalidDataset { .. }));
        assert!(err.to_string().contains("row 2"));
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        let err = IdentityPool::from_reader("".as_bytes()).unwrap_err();
        assert!(matches!(err, ScrubError::InvalidDataset { .. }));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = IdentityPool::from_path(Path::new("/nonexistent/users.csv")).unwrap_err();
        assert!(matches!(err, ScrubError::MissingDataset { .. }));
        assert!(err.is_guard_failure());
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,Ann,Lee,a@example.com").unwrap();
        writeln!(file, "b,Bob,Ray,b@example.com").unwrap();

        let pool = IdentityPool::from_path(file.path()).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.identity_for(3).first_name, "Bob");
    }
}
