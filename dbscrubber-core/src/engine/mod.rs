//! The scrub engine.
//!
//! A run moves through the phases of [`ScrubPhase`]:
//!
//! ```text
//! Guarding → DuplicatingAccounts → WalkingAccounts → DuplicatingAttributes
//!   → MutatingAttributes → PromotingAccounts → DuplicatingComments
//!   → TruncatingComments → PromotingComments → Done
//! ```
//!
//! `users` runs stop after `PromotingAccounts`, `comments` runs jump from
//! `Guarding` to `DuplicatingComments`. Only `Guarding` can end in `Aborted`;
//! nothing has been modified at that point.
//!
//! # Module Structure
//! - `guard`: Environment and size guards
//! - `shadow`: Working copies, marker-based promotion and recovery
//! - `cursor`: Offset pagination over the account working copy
//! - `scrub`: Account, attribute and comment passes

pub mod cursor;
pub mod guard;
pub mod shadow;
mod scrub;

pub use cursor::BatchCursor;
pub use shadow::ShadowTableManager;

use crate::adapters::{AdapterFeature, ScrubAdapter, ScrubConfig, TableLayout};
use crate::allowlist::AllowList;
use crate::dataset::IdentityPool;
use crate::error::ScrubError;
use crate::hooks::{DefaultHooks, ScrubHooks};
use crate::models::{ScrubMode, ScrubPhase, ScrubReport, ScrubRequest};
use crate::security::SecretGenerator;
use crate::Result;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Tracks and validates phase transitions of one run.
#[derive(Debug, Clone)]
pub(crate) struct PhaseTracker {
    current: ScrubPhase,
    visited: Vec<ScrubPhase>,
}

impl PhaseTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: ScrubPhase::Guarding,
            visited: vec![ScrubPhase::Guarding],
        }
    }

    pub(crate) fn current(&self) -> ScrubPhase {
        self.current
    }

    /// Moves to `next`, rejecting transitions the lifecycle does not allow.
    pub(crate) fn advance(&mut self, next: ScrubPhase) -> Result<()> {
        if !self.current.can_transition_to(next) {
            return Err(ScrubError::InvalidTransition {
                from: self.current.to_string(),
                to: next.to_string(),
            });
        }

        debug!("Phase {} -> {}", self.current, next);
        self.current = next;
        self.visited.push(next);
        Ok(())
    }

    pub(crate) fn phases(&self) -> &[ScrubPhase] {
        &self.visited
    }
}

/// Runs scrubs against one database session.
///
/// # Example
/// ```rust,no_run
/// use dbscrubber_core::adapters::{ScrubConfig, create_adapter};
/// use dbscrubber_core::dataset::IdentityPool;
/// use dbscrubber_core::engine::Scrubber;
/// use dbscrubber_core::models::{EnvironmentType, ScrubMode};
///
/// # async fn example() -> dbscrubber_core::Result<()> {
/// let adapter = create_adapter("mysql://root@localhost/wordpress_copy").await?;
/// let identities = IdentityPool::builtin()?;
/// let config = ScrubConfig::new().with_environment(EnvironmentType::Staging);
///
/// let report = Scrubber::new(adapter.as_ref(), &identities, config)?
///     .run(ScrubMode::All)
///     .await?;
/// println!("scrubbed {} accounts", report.accounts_scrubbed);
/// # Ok(())
/// # }
/// ```
pub struct Scrubber<'a> {
    adapter: &'a dyn ScrubAdapter,
    identities: &'a IdentityPool,
    hooks: &'a dyn ScrubHooks,
    config: ScrubConfig,
    layout: TableLayout,
    secrets: SecretGenerator,
}

impl<'a> Scrubber<'a> {
    /// Creates a scrubber with no-op hooks.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` does not validate.
    pub fn new(
        adapter: &'a dyn ScrubAdapter,
        identities: &'a IdentityPool,
        config: ScrubConfig,
    ) -> Result<Self> {
        config.validate()?;
        let layout = config.layout()?;
        let secrets = SecretGenerator::new(config.secret)?;

        Ok(Self {
            adapter,
            identities,
            hooks: &DefaultHooks,
            config,
            layout,
            secrets,
        })
    }

    /// Replaces the extension hooks.
    pub fn with_hooks(mut self, hooks: &'a dyn ScrubHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// The configuration this scrubber runs with.
    pub fn config(&self) -> &ScrubConfig {
        &self.config
    }

    /// The request handed to lifecycle hooks for `mode`.
    pub fn request(&self, mode: ScrubMode) -> ScrubRequest {
        ScrubRequest {
            mode,
            allowed_domains: self.config.allowed_domains.clone(),
            allowed_emails: self.config.allowed_emails.clone(),
            ignore_size_limit: self.config.ignore_size_limit,
        }
    }

    /// Runs a scrub in `mode`.
    ///
    /// Guards run first; a guard failure returns before any table is touched.
    /// Statement failures after that point are returned as-is and leave the
    /// originals in place, since promotion is the last step of each group.
    pub async fn run(&self, mode: ScrubMode) -> Result<ScrubReport> {
        let started = Instant::now();
        let request = self.request(mode);
        let mut report = ScrubReport::new(mode, self.adapter.database_type());
        let mut tracker = PhaseTracker::new();

        self.hooks.before_scrub(&request);
        info!("Starting {} scrub ({})", mode, self.adapter.database_type());

        if let Err(e) = self.guard(&mut report).await {
            tracker.advance(ScrubPhase::Aborted)?;
            warn!("Scrub aborted before any changes: {}", e);
            return Err(e);
        }

        let outcome = self.execute(mode, &mut tracker, &mut report).await;

        if report.run_lock_held {
            if let Err(e) = self.adapter.release_lock().await {
                warn!("Failed to release scrub lock: {}", e);
            }
        }
        outcome?;

        tracker.advance(ScrubPhase::Done)?;
        debug!("Run reached {}", tracker.current());
        report.phases = tracker.phases().to_vec();
        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!("✓ Scrub complete in {} ms", report.duration_ms);
        self.hooks.after_scrub(&request, &report);

        Ok(report)
    }

    /// Environment guard, size guard and run lock.
    async fn guard(&self, report: &mut ScrubReport) -> Result<()> {
        guard::check_environment(self.config.environment, self.hooks)?;
        report.database_size_mb = guard::check_size(self.adapter, &self.config, self.hooks).await?;

        if !self.adapter.supports_feature(AdapterFeature::AdvisoryLock) {
            warn!(
                "{} has no advisory locks; assuming no other scrub runs against this database",
                self.adapter.database_type()
            );
            return Ok(());
        }

        if !self.adapter.acquire_lock().await? {
            return Err(ScrubError::LockUnavailable {
                name: self.adapter.connection_config().lock_name,
            });
        }
        report.run_lock_held = true;

        Ok(())
    }

    async fn execute(
        &self,
        mode: ScrubMode,
        tracker: &mut PhaseTracker,
        report: &mut ScrubReport,
    ) -> Result<()> {
        let shadows = ShadowTableManager::new(self.adapter);
        report.recovered_promotions = shadows.recover_pending().await?;

        if mode.includes_users() {
            let allow_list = AllowList::with_hooks(
                self.config.allowed_domains.clone(),
                self.config.allowed_emails.clone(),
                self.hooks,
            );
            debug!(
                "Exempt domains: {:?}, exempt addresses: {}",
                allow_list.domains(),
                allow_list.emails().len()
            );
            self.scrub_accounts(&shadows, &allow_list, tracker, report)
                .await?;
        }

        if mode.includes_comments() {
            self.scrub_comments(&shadows, tracker, report).await?;
        }

        Ok(())
    }
}
