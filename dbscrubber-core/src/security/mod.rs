//! Security utilities for scrub runs.
//!
//! # Module Structure
//! - `secret`: random replacement passwords hashed with Argon2id
//!
//! URL redaction for logs and errors lives in [`crate::error::redact_database_url`].

pub mod secret;

pub use secret::{SecretGenerator, SecretParams, generate_password};
