//! Pre-flight guards. Both run before the first mutating statement.

use crate::Result;
use crate::adapters::{ScrubAdapter, ScrubConfig};
use crate::error::ScrubError;
use crate::hooks::ScrubHooks;
use crate::models::EnvironmentType;
use tracing::info;

/// Rejects protected environments unless the hook allows them.
pub fn check_environment(environment: EnvironmentType, hooks: &dyn ScrubHooks) -> Result<()> {
    if environment.is_protected() && !hooks.allow_on_production() {
        return Err(ScrubError::EnvironmentRejected {
            environment: environment.to_string(),
        });
    }

    Ok(())
}

/// Whole megabytes in `bytes`, truncated.
pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes / 1024 / 1024
}

/// Fails when `size_mb` is strictly greater than `limit_mb`.
pub fn evaluate_size(size_mb: u64, limit_mb: u64) -> Result<()> {
    if size_mb > limit_mb {
        return Err(ScrubError::SizeLimitExceeded { size_mb, limit_mb });
    }
    Ok(())
}

/// Measures the database and compares it against the effective limit.
///
/// Returns the observed size, or `None` when the guard is bypassed.
pub async fn check_size(
    adapter: &dyn ScrubAdapter,
    config: &ScrubConfig,
    hooks: &dyn ScrubHooks,
) -> Result<Option<u64>> {
    if config.ignore_size_limit {
        info!("Size limit ignored; skipping database size check");
        return Ok(None);
    }

    let size_mb = bytes_to_mb(adapter.database_size_bytes().await?);
    let limit_mb = hooks.size_limit_mb(config.size_limit_mb);
    info!("Database size is {} MB (limit {} MB)", size_mb, limit_mb);

    evaluate_size(size_mb, limit_mb)?;
    Ok(Some(size_mb))
}
