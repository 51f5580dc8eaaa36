//! Database scrubbing tool.
//!
//! This binary replaces personal data in a copy of a WordPress database:
//! account credentials and names are swapped for synthetic identities,
//! free-text profile attributes are blanked and comments are removed.
//!
//! # Safety Guarantees
//! - Production targets are refused unless the environment says otherwise
//! - Oversized databases are refused unless the size guard is overridden
//! - Originals are only replaced by fully scrubbed working copies
//! - No credentials are logged

use clap::Parser;
use dbscrubber::{Cli, ScrubArgs};
use dbscrubber_core::{
    Result, ScrubError, ScrubMode, Scrubber, adapters::create_adapter,
    error::redact_database_url, init_logging,
};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.verbose, cli.global.quiet)?;

    let Some(database_url) = cli.scrub.database_url.as_deref() else {
        eprintln!("Error: Database URL is required (--database-url or DATABASE_URL)");
        eprintln!("Use --help for usage information");
        std::process::exit(2);
    };

    match cli.command.mode() {
        Some(mode) => scrub(database_url, mode, &cli.scrub).await,
        None => test_connection(database_url).await,
    }
}

/// Tests database connection without touching any table
async fn test_connection(database_url: &str) -> Result<()> {
    info!("Testing database connection...");

    let adapter = create_adapter(database_url).await.map_err(|e| {
        error!("Failed to create database adapter: {}", e);
        e
    })?;

    adapter.test_connection().await.map_err(|e| {
        error!("Connection test failed: {}", e);
        e
    })?;

    info!("✓ Connection test successful");
    println!(
        "Connection to {} database successful",
        adapter.database_type()
    );

    adapter.close().await;
    Ok(())
}

/// Runs one scrub and reports the outcome
async fn scrub(database_url: &str, mode: ScrubMode, args: &ScrubArgs) -> Result<()> {
    info!("Target: {}", redact_database_url(database_url));

    let config = args.scrub_config().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let identities = args.identities().map_err(|e| {
        error!("Failed to load reference dataset: {}", e);
        e
    })?;
    info!("Loaded {} synthetic identities", identities.len());

    let adapter = create_adapter(database_url).await.map_err(|e| {
        error!("Failed to create database adapter: {}", e);
        e
    })?;

    info!("Created {} adapter", adapter.database_type());

    adapter.test_connection().await.map_err(|e| {
        error!("Connection test failed: {}", e);
        e
    })?;

    let outcome = Scrubber::new(adapter.as_ref(), &identities, config)?
        .run(mode)
        .await;
    adapter.close().await;

    let report = outcome.map_err(|e| {
        if e.is_guard_failure() {
            error!("Refusing to scrub: {}", e);
        } else {
            error!("Scrub failed: {}", e);
        }
        e
    })?;

    if args.report {
        let json = serde_json::to_string_pretty(&report).map_err(|e| {
            ScrubError::configuration(format!("Failed to serialize report: {}", e))
        })?;
        println!("{}", json);
    } else {
        println!("Scrub ({}) completed successfully", mode);
        if mode.includes_users() {
            println!(
                "Accounts: {} scrubbed, {} exempt",
                report.accounts_scrubbed, report.accounts_exempted
            );
            println!("Attribute rows updated: {}", report.attribute_rows_updated);
        }
        if mode.includes_comments() {
            println!("Comment tables emptied: {}", report.comment_tables_emptied);
        }
    }

    Ok(())
}
