//! Configuration types for scrub runs.
//!
//! This module contains all configuration structures used by the engine and
//! the adapters:
//! - `ConnectionConfig`: Database session settings
//! - `ScrubConfig`: Batching, pacing, guards and allow-lists
//! - `TableLayout`: Target table names derived from a prefix
//!
//! # Security
//! These configuration structs intentionally do NOT store passwords or credentials.

mod connection;
mod scrub;
mod tables;

pub use connection::{ConnectionConfig, DEFAULT_LOCK_NAME};
pub use scrub::{DEFAULT_BATCH_SIZE, DEFAULT_PACING_DELAY, DEFAULT_SIZE_LIMIT_MB, ScrubConfig};
pub use tables::{
    BLANKED_ATTRIBUTE_KEYS, PROMOTION_MARKER_TABLE, RETIRED_SUFFIX, SHADOW_SUFFIX, TableLayout,
    validate_identifier,
};
