//! End-to-end scrub runs against SQLite.
//!
//! This test suite covers:
//! - Account scrubbing and allow-list exemptions
//! - Attribute blanking and name rewrites
//! - Comment removal
//! - Environment and size guards
//! - Recovery of interrupted promotions
//!
//! Note: SQLite tests use in-memory databases, so no testcontainers needed.

#![cfg(feature = "sqlite")]

use dbscrubber_core::{
    IdentityPool, Result, ScrubConfig, ScrubError, ScrubHooks, ScrubMode, ScrubPhase,
    ScrubReport, ScrubRequest, Scrubber,
    adapters::{PROMOTION_MARKER_TABLE, ScrubAdapter, create_adapter, sqlite::SqliteAdapter},
    models::EnvironmentType,
    security::SecretParams,
};
use sqlx::SqlitePool;
use std::sync::Mutex;
use std::time::Duration;

const PASSWORD_HASH: &str = "$argon2id$fixed-test-hash";

/// (ID, login, email)
const ACCOUNTS: [(i64, &str, &str); 6] = [
    (1, "admin", "admin@example.com"),
    (2, "person", "person@10up.com"),
    (3, "other_admin", "admin@example.org"),
    (4, "jane", "jane@customer.test"),
    (42, "bob", "bob@customer.test"),
    (7, "staff", "staff@get10up.com"),
];

/// Skips Argon2 so runs stay fast.
struct FixedPassword;

impl ScrubHooks for FixedPassword {
    fn scrubbed_password(&self) -> Option<String> {
        Some(PASSWORD_HASH.to_string())
    }
}

async fn create_schema(pool: &SqlitePool) {
    for ddl in [
        "CREATE TABLE wp_users (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            user_login TEXT NOT NULL DEFAULT '',
            user_pass TEXT NOT NULL DEFAULT '',
            user_nicename TEXT NOT NULL DEFAULT '',
            user_email TEXT NOT NULL DEFAULT '',
            user_url TEXT NOT NULL DEFAULT '',
            user_activation_key TEXT NOT NULL DEFAULT '',
            display_name TEXT NOT NULL DEFAULT ''
        )",
        "CREATE INDEX user_email ON wp_users (user_email)",
        "CREATE TABLE wp_usermeta (
            umeta_id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL DEFAULT 0,
            meta_key TEXT,
            meta_value TEXT
        )",
        "CREATE TABLE wp_comments (
            comment_ID INTEGER PRIMARY KEY AUTOINCREMENT,
            comment_author TEXT NOT NULL DEFAULT '',
            comment_author_email TEXT NOT NULL DEFAULT '',
            comment_content TEXT NOT NULL DEFAULT ''
        )",
        "CREATE TABLE wp_commentmeta (
            meta_id INTEGER PRIMARY KEY AUTOINCREMENT,
            comment_id INTEGER NOT NULL DEFAULT 0,
            meta_key TEXT,
            meta_value TEXT
        )",
    ] {
        sqlx::query(ddl).execute(pool).await.unwrap();
    }
}

async fn seed(pool: &SqlitePool) {
    for (id, login, email) in ACCOUNTS {
        sqlx::query(
            "INSERT INTO wp_users (ID, user_login, user_pass, user_nicename, user_email, \
             user_url, user_activation_key, display_name) \
             VALUES (?, ?, 'original-hash', ?, ?, 'https://real.example', 'key', ?)",
        )
        .bind(id)
        .bind(login)
        .bind(login)
        .bind(email)
        .bind(format!("Real {}", login))
        .execute(pool)
        .await
        .unwrap();

        for (key, value) in [
            ("first_name", format!("First{}", id)),
            ("last_name", format!("Last{}", id)),
            ("nickname", login.to_string()),
            ("description", format!("Bio of {}", login)),
            ("session_tokens", "a:1:{s:5:\"token\";}".to_string()),
            ("wp_capabilities", "a:1:{s:13:\"administrator\";b:1;}".to_string()),
        ] {
            sqlx::query("INSERT INTO wp_usermeta (user_id, meta_key, meta_value) VALUES (?, ?, ?)")
                .bind(id)
                .bind(key)
                .bind(value)
                .execute(pool)
                .await
                .unwrap();
        }
    }

    for (id, author) in [(1, "Visitor"), (2, "Reader"), (3, "Critic")] {
        sqlx::query(
            "INSERT INTO wp_comments (comment_ID, comment_author, comment_author_email, comment_content) \
             VALUES (?, ?, ?, 'Nice post')",
        )
        .bind(id)
        .bind(author)
        .bind(format!("{}@visitor.test", author.to_lowercase()))
        .execute(pool)
        .await
        .unwrap();

        sqlx::query("INSERT INTO wp_commentmeta (comment_id, meta_key, meta_value) VALUES (?, 'ip', '10.0.0.1')")
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }
}

/// Helper function to create an in-memory WordPress-like database
async fn create_test_adapter() -> SqliteAdapter {
    let adapter = SqliteAdapter::new("sqlite::memory:").await.unwrap();
    create_schema(&adapter.pool).await;
    seed(&adapter.pool).await;
    adapter
}

fn staging_config() -> ScrubConfig {
    ScrubConfig::new()
        .with_environment(EnvironmentType::Staging)
        .with_batch_size(2)
        .with_pacing_delay(Duration::ZERO)
}

async fn run(
    adapter: &SqliteAdapter,
    config: ScrubConfig,
    mode: ScrubMode,
) -> Result<ScrubReport> {
    let identities = IdentityPool::builtin()?;
    Scrubber::new(adapter, &identities, config)?
        .with_hooks(&FixedPassword)
        .run(mode)
        .await
}

async fn account(pool: &SqlitePool, id: i64) -> (String, String, String, String, String) {
    sqlx::query_as(
        "SELECT user_login, user_email, display_name, user_pass, user_url FROM wp_users WHERE ID = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn attribute(pool: &SqlitePool, user_id: i64, key: &str) -> String {
    sqlx::query_scalar("SELECT meta_value FROM wp_usermeta WHERE user_id = ? AND meta_key = ?")
        .bind(user_id)
        .bind(key)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn table_names(pool: &SqlitePool) -> Vec<String> {
    sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .fetch_all(pool)
        .await
        .unwrap()
}

async fn count(adapter: &SqliteAdapter, table: &str) -> u64 {
    adapter.count_rows(table).await.unwrap()
}

// =============================================================================
// Account Pass
// =============================================================================

#[tokio::test]
async fn test_scrub_replaces_non_exempt_accounts() {
    let adapter = create_test_adapter().await;
    let identities = IdentityPool::builtin().unwrap();

    let report = run(&adapter, staging_config(), ScrubMode::Users)
        .await
        .unwrap();

    let (login, email, display_name, pass, url) = account(&adapter.pool, 42).await;
    let expected = identities.identity_for(42);
    assert_eq!(login, expected.username);
    assert_eq!(email, expected.email);
    assert_eq!(display_name, expected.display_name());
    assert_eq!(pass, PASSWORD_HASH);
    assert_eq!(url, "");

    let (login, email, ..) = account(&adapter.pool, 4).await;
    assert_ne!(login, "jane");
    assert_ne!(email, "jane@customer.test");

    assert_eq!(report.accounts_visited, 6);
    assert_eq!(report.accounts_scrubbed, 4);
    assert_eq!(report.accounts_exempted, 2);
}

#[tokio::test]
async fn test_builtin_domains_are_exempt() {
    let adapter = create_test_adapter().await;
    run(&adapter, staging_config(), ScrubMode::Users)
        .await
        .unwrap();

    let (login, email, display_name, pass, url) = account(&adapter.pool, 2).await;
    assert_eq!(login, "person");
    assert_eq!(email, "person@10up.com");
    assert_eq!(display_name, "Real person");
    assert_eq!(pass, "original-hash");
    assert_eq!(url, "https://real.example");

    let (_, email, ..) = account(&adapter.pool, 7).await;
    assert_eq!(email, "staff@get10up.com");
}

#[tokio::test]
async fn test_allowed_email_is_exact_match() {
    let adapter = create_test_adapter().await;
    let config = staging_config().with_allowed_emails(vec!["admin@example.com".to_string()]);

    let report = run(&adapter, config, ScrubMode::Users).await.unwrap();

    let (login, email, ..) = account(&adapter.pool, 1).await;
    assert_eq!(login, "admin");
    assert_eq!(email, "admin@example.com");

    let (_, email, ..) = account(&adapter.pool, 3).await;
    assert_ne!(email, "admin@example.org");

    assert_eq!(report.accounts_exempted, 3);
}

#[tokio::test]
async fn test_allowed_domain() {
    let adapter = create_test_adapter().await;
    let config = staging_config().with_allowed_domains(vec!["customer.test".to_string()]);

    run(&adapter, config, ScrubMode::Users).await.unwrap();

    let (_, email, ..) = account(&adapter.pool, 4).await;
    assert_eq!(email, "jane@customer.test");
    let (_, email, ..) = account(&adapter.pool, 42).await;
    assert_eq!(email, "bob@customer.test");
}

#[tokio::test]
async fn test_second_run_keeps_same_exemptions() {
    let adapter = create_test_adapter().await;
    let config = staging_config().with_allowed_emails(vec!["admin@example.com".to_string()]);

    run(&adapter, config.clone(), ScrubMode::Users)
        .await
        .unwrap();
    let report = run(&adapter, config, ScrubMode::Users).await.unwrap();

    assert_eq!(report.accounts_exempted, 3);
    let (_, email, ..) = account(&adapter.pool, 1).await;
    assert_eq!(email, "admin@example.com");
    let (_, email, ..) = account(&adapter.pool, 2).await;
    assert_eq!(email, "person@10up.com");
}

#[tokio::test]
async fn test_hook_can_override_scrub_decision() {
    struct KeepJane;

    impl ScrubHooks for KeepJane {
        fn should_scrub_account(
            &self,
            decision: bool,
            account: &dbscrubber_core::AccountRow,
        ) -> bool {
            decision && account.user_login != "jane"
        }

        fn scrubbed_password(&self) -> Option<String> {
            Some(PASSWORD_HASH.to_string())
        }
    }

    let adapter = create_test_adapter().await;
    let identities = IdentityPool::builtin().unwrap();
    Scrubber::new(&adapter, &identities, staging_config())
        .unwrap()
        .with_hooks(&KeepJane)
        .run(ScrubMode::Users)
        .await
        .unwrap();

    let (login, ..) = account(&adapter.pool, 4).await;
    assert_eq!(login, "jane");
}

#[tokio::test]
async fn test_generated_password_hash() {
    let adapter = create_test_adapter().await;
    let identities = IdentityPool::builtin().unwrap();
    let config = staging_config().with_secret_params(SecretParams {
        memory_cost_kib: 1024,
        time_cost: 1,
        parallelism: 1,
        ..SecretParams::default()
    });

    Scrubber::new(&adapter, &identities, config)
        .unwrap()
        .run(ScrubMode::Users)
        .await
        .unwrap();

    let (.., pass_4, _) = account(&adapter.pool, 4).await;
    let (.., pass_42, _) = account(&adapter.pool, 42).await;
    assert!(pass_4.starts_with("$argon2id$"));
    assert_ne!(pass_4, pass_42);

    let (.., pass_2, _) = account(&adapter.pool, 2).await;
    assert_eq!(pass_2, "original-hash");
}

// =============================================================================
// Attribute Pass
// =============================================================================

#[tokio::test]
async fn test_attributes_blanked_for_every_account() {
    let adapter = create_test_adapter().await;
    run(&adapter, staging_config(), ScrubMode::Users)
        .await
        .unwrap();

    for (id, ..) in ACCOUNTS {
        assert_eq!(attribute(&adapter.pool, id, "description").await, "");
        assert_eq!(attribute(&adapter.pool, id, "session_tokens").await, "");
        assert!(
            attribute(&adapter.pool, id, "wp_capabilities")
                .await
                .contains("administrator")
        );
    }
}

#[tokio::test]
async fn test_name_attributes_use_mapped_identity() {
    let adapter = create_test_adapter().await;
    let identities = IdentityPool::builtin().unwrap();
    let report = run(&adapter, staging_config(), ScrubMode::Users)
        .await
        .unwrap();

    let expected = identities.identity_for(42);
    assert_eq!(attribute(&adapter.pool, 42, "first_name").await, expected.first_name);
    assert_eq!(attribute(&adapter.pool, 42, "last_name").await, expected.last_name);
    assert_eq!(attribute(&adapter.pool, 42, "nickname").await, expected.first_name);

    // Exempt accounts get new names too unless asked otherwise
    let expected = identities.identity_for(2);
    assert_eq!(attribute(&adapter.pool, 2, "first_name").await, expected.first_name);

    // 6 accounts x (2 blanked + 3 names)
    assert_eq!(report.attribute_rows_updated, 30);
}

#[tokio::test]
async fn test_preserve_exempt_attributes() {
    let adapter = create_test_adapter().await;
    let config = staging_config().with_preserve_exempt_attributes(true);
    let report = run(&adapter, config, ScrubMode::Users).await.unwrap();

    assert_eq!(attribute(&adapter.pool, 2, "first_name").await, "First2");
    assert_eq!(attribute(&adapter.pool, 2, "nickname").await, "person");
    assert_eq!(attribute(&adapter.pool, 2, "description").await, "");
    assert_ne!(attribute(&adapter.pool, 4, "first_name").await, "First4");

    // 6 accounts x 2 blanked + 4 scrubbed accounts x 3 names
    assert_eq!(report.attribute_rows_updated, 24);
}

#[tokio::test]
async fn test_account_without_attributes_is_skipped() {
    let adapter = create_test_adapter().await;
    sqlx::query("INSERT INTO wp_users (ID, user_login, user_email) VALUES (100, 'bare', 'bare@customer.test')")
        .execute(&adapter.pool)
        .await
        .unwrap();

    let report = run(&adapter, staging_config(), ScrubMode::Users)
        .await
        .unwrap();

    assert_eq!(report.accounts_visited, 7);
    assert_eq!(count(&adapter, "wp_usermeta").await, 36);
}

// =============================================================================
// Whole Runs
// =============================================================================

#[tokio::test]
async fn test_full_run_preserves_shape_and_cleans_up() {
    let adapter = create_test_adapter().await;

    let report = run(&adapter, staging_config(), ScrubMode::All)
        .await
        .unwrap();

    assert_eq!(count(&adapter, "wp_users").await, 6);
    assert_eq!(count(&adapter, "wp_usermeta").await, 36);
    assert_eq!(count(&adapter, "wp_comments").await, 0);
    assert_eq!(count(&adapter, "wp_commentmeta").await, 0);

    let tables = table_names(&adapter.pool).await;
    assert!(tables.iter().all(|t| !t.ends_with("_temp")), "{:?}", tables);
    assert!(!tables.contains(&PROMOTION_MARKER_TABLE.to_string()));

    // Indexes of promoted tables survive
    let indexes: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'wp_users'",
    )
    .fetch_all(&adapter.pool)
    .await
    .unwrap();
    assert!(indexes.contains(&"user_email".to_string()));

    assert_eq!(report.comment_tables_emptied, 2);
    assert_eq!(report.final_phase(), Some(ScrubPhase::Done));
    assert_eq!(report.phases.len(), 10);
    // SQLite has no advisory lock to take
    assert!(!report.run_lock_held);
}

#[tokio::test]
async fn test_users_mode_leaves_comments() {
    let adapter = create_test_adapter().await;
    let report = run(&adapter, staging_config(), ScrubMode::Users)
        .await
        .unwrap();

    assert_eq!(count(&adapter, "wp_comments").await, 3);
    assert_eq!(
        report.phases,
        vec![
            ScrubPhase::Guarding,
            ScrubPhase::DuplicatingAccounts,
            ScrubPhase::WalkingAccounts,
            ScrubPhase::DuplicatingAttributes,
            ScrubPhase::MutatingAttributes,
            ScrubPhase::PromotingAccounts,
            ScrubPhase::Done,
        ]
    );
}

#[tokio::test]
async fn test_comments_mode_leaves_accounts() {
    let adapter = create_test_adapter().await;
    let report = run(&adapter, staging_config(), ScrubMode::Comments)
        .await
        .unwrap();

    let (login, ..) = account(&adapter.pool, 4).await;
    assert_eq!(login, "jane");
    assert_eq!(attribute(&adapter.pool, 4, "description").await, "Bio of jane");
    assert_eq!(count(&adapter, "wp_comments").await, 0);
    assert_eq!(count(&adapter, "wp_commentmeta").await, 0);
    assert_eq!(report.accounts_visited, 0);
}

#[tokio::test]
async fn test_table_prefix() {
    let adapter = SqliteAdapter::new("sqlite::memory:").await.unwrap();
    for ddl in [
        "CREATE TABLE blog_comments (comment_ID INTEGER PRIMARY KEY, comment_content TEXT)",
        "CREATE TABLE blog_commentmeta (meta_id INTEGER PRIMARY KEY, comment_id INTEGER)",
        "INSERT INTO blog_comments VALUES (1, 'hello')",
    ] {
        sqlx::query(ddl).execute(&adapter.pool).await.unwrap();
    }

    let config = staging_config().with_table_prefix("blog_");
    run(&adapter, config, ScrubMode::Comments).await.unwrap();

    assert_eq!(count(&adapter, "blog_comments").await, 0);
}

#[tokio::test]
async fn test_lifecycle_hooks_see_request_and_report() {
    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ScrubHooks for Recorder {
        fn before_scrub(&self, request: &ScrubRequest) {
            self.events
                .lock()
                .unwrap()
                .push(format!("before {}", request.mode));
        }

        fn after_scrub(&self, request: &ScrubRequest, report: &ScrubReport) {
            self.events.lock().unwrap().push(format!(
                "after {} {}",
                request.mode, report.comment_tables_emptied
            ));
        }
    }

    let adapter = create_test_adapter().await;
    let identities = IdentityPool::builtin().unwrap();
    let recorder = Recorder::default();

    Scrubber::new(&adapter, &identities, staging_config())
        .unwrap()
        .with_hooks(&recorder)
        .run(ScrubMode::Comments)
        .await
        .unwrap();

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec!["before comments".to_string(), "after comments 2".to_string()]
    );
}

#[tokio::test]
async fn test_missing_table_fails_before_promotion() {
    let adapter = create_test_adapter().await;
    sqlx::query("DROP TABLE wp_commentmeta")
        .execute(&adapter.pool)
        .await
        .unwrap();

    let err = run(&adapter, staging_config(), ScrubMode::Comments)
        .await
        .unwrap_err();

    assert!(matches!(err, ScrubError::Statement { .. }));
    assert!(!err.is_guard_failure());
    // Nothing was promoted, so the original still holds its rows
    assert_eq!(count(&adapter, "wp_comments").await, 3);
}

// =============================================================================
// Guards
// =============================================================================

#[tokio::test]
async fn test_production_is_rejected() {
    let adapter = create_test_adapter().await;
    let config = staging_config().with_environment(EnvironmentType::Production);

    let err = run(&adapter, config, ScrubMode::All).await.unwrap_err();

    assert!(matches!(err, ScrubError::EnvironmentRejected { .. }));
    assert_eq!(count(&adapter, "wp_comments").await, 3);
    let (login, ..) = account(&adapter.pool, 4).await;
    assert_eq!(login, "jane");
}

#[tokio::test]
async fn test_production_allowed_by_hook() {
    struct AllowProduction;

    impl ScrubHooks for AllowProduction {
        fn allow_on_production(&self) -> bool {
            true
        }
    }

    let adapter = create_test_adapter().await;
    let identities = IdentityPool::builtin().unwrap();
    let config = staging_config().with_environment(EnvironmentType::Production);

    let report = Scrubber::new(&adapter, &identities, config)
        .unwrap()
        .with_hooks(&AllowProduction)
        .run(ScrubMode::Comments)
        .await
        .unwrap();

    assert_eq!(report.comment_tables_emptied, 2);
}

#[tokio::test]
async fn test_size_guard_aborts_before_changes() {
    let adapter = create_test_adapter().await;
    // Pad the database past 2 MB
    sqlx::query("CREATE TABLE padding (data BLOB)")
        .execute(&adapter.pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO padding VALUES (zeroblob(2 * 1024 * 1024))")
        .execute(&adapter.pool)
        .await
        .unwrap();

    let config = staging_config().with_size_limit_mb(1);
    let err = run(&adapter, config.clone(), ScrubMode::All)
        .await
        .unwrap_err();

    match err {
        ScrubError::SizeLimitExceeded { size_mb, limit_mb } => {
            assert!(size_mb >= 2);
            assert_eq!(limit_mb, 1);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(count(&adapter, "wp_comments").await, 3);
    let tables = table_names(&adapter.pool).await;
    assert!(tables.iter().all(|t| !t.ends_with("_temp")));

    // The override skips the check entirely
    let report = run(&adapter, config.with_ignore_size_limit(true), ScrubMode::Comments)
        .await
        .unwrap();
    assert_eq!(report.database_size_mb, None);
}

#[tokio::test]
async fn test_size_limit_hook() {
    struct TinyLimit;

    impl ScrubHooks for TinyLimit {
        fn size_limit_mb(&self, _default: u64) -> u64 {
            0
        }
    }

    let adapter = create_test_adapter().await;
    sqlx::query("CREATE TABLE padding (data BLOB)")
        .execute(&adapter.pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO padding VALUES (zeroblob(2 * 1024 * 1024))")
        .execute(&adapter.pool)
        .await
        .unwrap();

    let identities = IdentityPool::builtin().unwrap();
    let err = Scrubber::new(&adapter, &identities, staging_config())
        .unwrap()
        .with_hooks(&TinyLimit)
        .run(ScrubMode::Comments)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScrubError::SizeLimitExceeded { limit_mb: 0, .. }
    ));
}

#[tokio::test]
async fn test_small_database_passes_size_guard() {
    let adapter = create_test_adapter().await;
    let report = run(&adapter, staging_config(), ScrubMode::Comments)
        .await
        .unwrap();
    assert_eq!(report.database_size_mb, Some(0));
}

// =============================================================================
// Recovery
// =============================================================================

#[tokio::test]
async fn test_interrupted_promotion_is_recovered() {
    let adapter = create_test_adapter().await;

    // Simulate a run that died after dropping wp_comments but before the
    // working copy took its place
    sqlx::query("CREATE TABLE wp_comments_temp AS SELECT * FROM wp_comments WHERE 0")
        .execute(&adapter.pool)
        .await
        .unwrap();
    sqlx::query("DROP TABLE wp_comments")
        .execute(&adapter.pool)
        .await
        .unwrap();
    adapter.ensure_marker_table().await.unwrap();
    adapter
        .mark_promotions(&["wp_comments".to_string()])
        .await
        .unwrap();

    let report = run(&adapter, staging_config(), ScrubMode::Comments)
        .await
        .unwrap();

    assert_eq!(report.recovered_promotions, vec!["wp_comments".to_string()]);
    assert!(adapter.table_exists("wp_comments").await.unwrap());
    assert!(!adapter.table_exists("wp_comments_temp").await.unwrap());
    assert!(!adapter.table_exists(PROMOTION_MARKER_TABLE).await.unwrap());
}

#[tokio::test]
async fn test_guard_failure_skips_recovery() {
    let adapter = create_test_adapter().await;
    adapter.ensure_marker_table().await.unwrap();
    adapter
        .mark_promotions(&["wp_comments".to_string()])
        .await
        .unwrap();

    let config = staging_config().with_environment(EnvironmentType::Production);
    assert!(run(&adapter, config, ScrubMode::All).await.is_err());

    assert_eq!(
        adapter.pending_promotions().await.unwrap(),
        vec!["wp_comments".to_string()]
    );
}

// =============================================================================
// Factory and Files
// =============================================================================

#[tokio::test]
async fn test_scrub_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copy.db");
    std::fs::File::create(&path).unwrap();
    let url = path.to_string_lossy().to_string();

    {
        let adapter = SqliteAdapter::new(&url).await.unwrap();
        create_schema(&adapter.pool).await;
        seed(&adapter.pool).await;
        adapter.close().await;
    }

    let adapter = create_adapter(&url).await.unwrap();
    adapter.test_connection().await.unwrap();

    let identities = IdentityPool::builtin().unwrap();
    let report = Scrubber::new(adapter.as_ref(), &identities, staging_config())
        .unwrap()
        .with_hooks(&FixedPassword)
        .run(ScrubMode::All)
        .await
        .unwrap();
    adapter.close().await;

    assert_eq!(report.accounts_scrubbed, 4);

    let reopened = SqliteAdapter::new(&url).await.unwrap();
    assert_eq!(count(&reopened, "wp_comments").await, 0);
    let (login, ..) = account(&reopened.pool, 2).await;
    assert_eq!(login, "person");
}

// =============================================================================
// Referencing Tables
// =============================================================================

#[tokio::test]
async fn test_promotion_leaves_referencing_tables_intact() {
    let adapter = create_test_adapter().await;
    for ddl in [
        "CREATE TABLE wp_orders (
            order_id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES wp_users (ID) ON DELETE CASCADE
        )",
        "CREATE TABLE wp_reviews (
            review_id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES wp_users (ID)
        )",
        "INSERT INTO wp_orders (order_id, user_id) VALUES (1, 42), (2, 2)",
        "INSERT INTO wp_reviews (review_id, user_id) VALUES (1, 4)",
    ] {
        sqlx::query(ddl).execute(&adapter.pool).await.unwrap();
    }

    let report = run(&adapter, staging_config(), ScrubMode::Users)
        .await
        .unwrap();

    assert_eq!(report.accounts_scrubbed, 4);
    assert_eq!(count(&adapter, "wp_users").await, 6);
    assert_eq!(count(&adapter, "wp_orders").await, 2);
    assert_eq!(count(&adapter, "wp_reviews").await, 1);
    assert!(!table_names(&adapter.pool).await.contains(&"wp_users_temp".to_string()));

    // Enforcement is back on and every reference still resolves
    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&adapter.pool)
        .await
        .unwrap();
    assert_eq!(enabled, 1);
    let violations = sqlx::query("PRAGMA foreign_key_check")
        .fetch_all(&adapter.pool)
        .await
        .unwrap();
    assert!(violations.is_empty());
    let orphan = sqlx::query("INSERT INTO wp_orders (order_id, user_id) VALUES (3, 9999)")
        .execute(&adapter.pool)
        .await;
    assert!(orphan.is_err());
}
