//! Library module for the dbscrubber binary.
//!
//! Argument parsing and the translation of arguments into engine
//! configuration live here so they can be tested without a database. The
//! binary itself is in main.rs.

use clap::{Args, Parser, Subcommand};
use dbscrubber_core::adapters::{DEFAULT_BATCH_SIZE, DEFAULT_SIZE_LIMIT_MB};
use dbscrubber_core::allowlist::parse_comma_list;
use dbscrubber_core::{
    EnvironmentType, IdentityPool, Result, ScrubConfig, ScrubMode, SecretParams,
};
use std::path::PathBuf;
use std::str::FromStr;

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "dbscrubber")]
#[command(about = "Scrub personal data from a copy of a WordPress database")]
#[command(version)]
#[command(long_about = "
DBScrubber - Replace personal data in staging and developer database copies

Accounts are rewritten with deterministic synthetic identities, free-text
profile attributes are blanked and comments are removed. Every table is
scrubbed in a working copy that replaces the original only once it is done.

SAFETY:
- Refuses to run against production unless told otherwise
- Refuses databases over the size limit (default 2000 MB)
- Nothing is modified when a guard fails

SUPPORTED DATABASES:
- MySQL / MariaDB (mysql://)
- PostgreSQL (postgres://) [if compiled with --features postgresql]
- SQLite (sqlite:// or .db/.sqlite files)

EXAMPLES:
  dbscrubber --environment staging all --database-url mysql://root@localhost/wp_copy
  dbscrubber users --allowed-domains example.com --allowed-emails admin@example.org
  dbscrubber comments --database-url sqlite://copy.db --environment local
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(flatten)]
    pub scrub: ScrubArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Scrub accounts, account attributes and comments
    All,
    /// Scrub accounts and account attributes
    Users,
    /// Remove all comments and comment attributes
    Comments,
    /// Test the database connection without changing anything
    Test,
}

impl Command {
    /// The scrub mode of this command, or `None` for `test`.
    pub fn mode(self) -> Option<ScrubMode> {
        match self {
            Command::All => Some(ScrubMode::All),
            Command::Users => Some(ScrubMode::Users),
            Command::Comments => Some(ScrubMode::Comments),
            Command::Test => None,
        }
    }
}

#[derive(Debug, Args)]
pub struct ScrubArgs {
    /// Database connection URL
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        hide_env_values = true,
        help = "Database connection string (credentials will be sanitized in logs)"
    )]
    pub database_url: Option<String>,

    /// Exempt email domains
    #[arg(
        long,
        global = true,
        value_name = "DOMAINS",
        help = "Comma-separated email domains whose accounts are left untouched"
    )]
    pub allowed_domains: Option<String>,

    /// Exempt email addresses
    #[arg(
        long,
        global = true,
        value_name = "EMAILS",
        help = "Comma-separated email addresses whose accounts are left untouched"
    )]
    pub allowed_emails: Option<String>,

    /// Skip the size guard
    #[arg(long, global = true, help = "Scrub even if the database exceeds the size limit")]
    pub ignore_size_limit: bool,

    /// Size limit in MB
    #[arg(
        long,
        global = true,
        value_name = "MB",
        default_value_t = DEFAULT_SIZE_LIMIT_MB,
        help = "Refuse databases larger than this many megabytes"
    )]
    pub size_limit: u64,

    /// Environment of the target database
    #[arg(
        long,
        global = true,
        env = "DBSCRUBBER_ENVIRONMENT",
        value_parser = parse_environment,
        help = "Environment of the target (local, development, staging, production) [default: production]"
    )]
    pub environment: Option<EnvironmentType>,

    /// Table prefix
    #[arg(long, global = true, default_value = "wp_", help = "Prefix of the target tables")]
    pub table_prefix: String,

    /// Rows per batch
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_BATCH_SIZE,
        help = "Account rows read and written per batch"
    )]
    pub batch_size: u32,

    /// Reference dataset
    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "CSV file of synthetic identities (username,first,last,email) replacing the built-in set"
    )]
    pub dataset: Option<PathBuf>,

    /// Keep name attributes of exempt accounts
    #[arg(
        long,
        global = true,
        help = "Only rewrite first/last name attributes of accounts that were scrubbed"
    )]
    pub preserve_exempt_attributes: bool,

    /// Cheap password hashing
    #[arg(
        long,
        global = true,
        help = "Hash replacement passwords with a single-pass 4 MiB Argon2id preset"
    )]
    pub fast_hash: bool,

    /// Argon2 memory cost
    #[arg(
        long,
        global = true,
        value_name = "KIB",
        help = "Argon2id memory cost in KiB for replacement passwords [default: 19456]"
    )]
    pub hash_memory_kib: Option<u32>,

    /// Argon2 passes
    #[arg(
        long,
        global = true,
        value_name = "PASSES",
        help = "Argon2id time cost for replacement passwords [default: 2]"
    )]
    pub hash_time_cost: Option<u32>,

    /// Print a JSON report
    #[arg(long, global = true, help = "Print the run report as JSON on stdout")]
    pub report: bool,
}

impl ScrubArgs {
    /// Engine configuration for these arguments.
    ///
    /// # Errors
    /// Returns `Configuration` if the resulting configuration does not
    /// validate.
    pub fn scrub_config(&self) -> Result<ScrubConfig> {
        let config = ScrubConfig::new()
            .with_batch_size(self.batch_size)
            .with_size_limit_mb(self.size_limit)
            .with_ignore_size_limit(self.ignore_size_limit)
            .with_environment(self.environment.unwrap_or_default())
            .with_table_prefix(self.table_prefix.clone())
            .with_allowed_domains(
                self.allowed_domains
                    .as_deref()
                    .map(parse_comma_list)
                    .unwrap_or_default(),
            )
            .with_allowed_emails(
                self.allowed_emails
                    .as_deref()
                    .map(parse_comma_list)
                    .unwrap_or_default(),
            )
            .with_preserve_exempt_attributes(self.preserve_exempt_attributes)
            .with_secret_params(self.secret_params());

        config.validate()?;
        Ok(config)
    }

    /// Hash cost: the preset, then any explicit overrides.
    fn secret_params(&self) -> SecretParams {
        let mut params = if self.fast_hash {
            SecretParams::fast()
        } else {
            SecretParams::default()
        };
        if let Some(memory_cost_kib) = self.hash_memory_kib {
            params.memory_cost_kib = memory_cost_kib;
        }
        if let Some(time_cost) = self.hash_time_cost {
            params.time_cost = time_cost;
        }
        params
    }

    /// The identity pool named by `--dataset`, or the built-in one.
    ///
    /// # Errors
    /// Returns `MissingDataset` or `InvalidDataset` if the file cannot be
    /// used.
    pub fn identities(&self) -> Result<IdentityPool> {
        match &self.dataset {
            Some(path) => IdentityPool::from_path(path),
            None => IdentityPool::builtin(),
        }
    }
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

fn parse_environment(value: &str) -> std::result::Result<EnvironmentType, String> {
    EnvironmentType::from_str(value).map_err(|e| e.to_string())
}
