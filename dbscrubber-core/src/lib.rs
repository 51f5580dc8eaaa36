//! Core engine for DBScrubber.
//!
//! This crate replaces personal data in a copy of a WordPress-style database
//! with deterministic synthetic identities. It is shared by the `dbscrubber`
//! binary and anything else that wants to embed a scrub run.
//!
//! # Safety Guarantees
//! - Guards (environment, database size, run lock) pass before any table is
//!   touched
//! - Originals are only ever replaced by fully scrubbed working copies
//! - Interrupted promotions are finished on the next run
//! - Database URLs are redacted in every error and log line
//! - Replacement passwords are random and never logged
//!
//! # Architecture
//! - [`adapters`]: one [`ScrubAdapter`] per backend, created by [`create_adapter`]
//! - [`engine`]: guards, working copies, pagination and the scrub passes
//! - [`dataset`], [`allowlist`], [`security`]: replacement values and exemptions
//! - [`hooks`]: extension points for embedding applications

pub mod adapters;
pub mod allowlist;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod logging;
pub mod models;
pub mod security;

// Re-export commonly used types
pub use adapters::{
    AdapterFeature, ConnectionConfig, ScrubAdapter, ScrubConfig, TableLayout, create_adapter,
};
pub use allowlist::AllowList;
pub use dataset::{IdentityPool, SyntheticIdentity};
pub use engine::Scrubber;
pub use error::{Result, ScrubError};
pub use hooks::{DefaultHooks, ScrubHooks};
pub use logging::init_logging;
pub use models::{
    AccountRow, DatabaseType, EnvironmentType, ScrubMode, ScrubPhase, ScrubReport, ScrubRequest,
};
pub use security::{SecretGenerator, SecretParams};
