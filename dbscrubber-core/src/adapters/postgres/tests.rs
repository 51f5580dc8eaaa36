//! Unit tests for PostgreSQL adapter.

use super::*;
use std::time::Duration;

#[test]
fn test_parse_connection_config() {
    let connection_string = "postgres://testuser@localhost:5432/testdb";
    let config = PostgresAdapter::parse_connection_config(connection_string).unwrap();

    assert_eq!(config.host, "localhost");
    assert_eq!(config.port, Some(5432));
    assert_eq!(config.database, Some("testdb".to_string()));
    assert_eq!(config.username, Some("testuser".to_string()));
    assert_eq!(config.connect_timeout, Duration::from_secs(30));
    assert_eq!(config.statement_timeout, None);
}

#[test]
fn test_parse_connection_config_with_query_params() {
    let connection_string =
        "postgres://user@host/db?connect_timeout=60&statement_timeout=900&lock_name=staging_refresh";
    let config = PostgresAdapter::parse_connection_config(connection_string).unwrap();

    assert_eq!(config.port, Some(5432));
    assert_eq!(config.connect_timeout, Duration::from_secs(60));
    assert_eq!(config.statement_timeout, Some(Duration::from_secs(900)));
    assert_eq!(config.lock_name, "staging_refresh");
}

#[test]
fn test_parse_connection_config_invalid_scheme() {
    assert!(PostgresAdapter::parse_connection_config("mysql://user@host/db").is_err());
}

#[test]
fn test_parse_connection_config_long_database_name() {
    let connection_string = format!("postgres://user@host/{}", "d".repeat(64));
    assert!(PostgresAdapter::parse_connection_config(&connection_string).is_err());
}

#[test]
fn test_validate_connection_string_schemes() {
    assert!(PostgresAdapter::validate_connection_string("postgres://localhost/db").is_ok());
    assert!(PostgresAdapter::validate_connection_string("postgresql://localhost/db").is_ok());
    assert!(PostgresAdapter::validate_connection_string("sqlite::memory:").is_err());
}

#[tokio::test]
async fn test_supports_feature() {
    let adapter = PostgresAdapter::new("postgres://test@localhost/test")
        .await
        .unwrap();

    assert!(adapter.supports_feature(AdapterFeature::TransactionalDdl));
    assert!(adapter.supports_feature(AdapterFeature::AdvisoryLock));
    assert_eq!(adapter.database_type(), DatabaseType::PostgreSQL);
}

#[test]
fn test_quote_identifier() {
    assert_eq!(tables::quote_identifier("wp_users"), "\"wp_users\"");
    assert_eq!(tables::quote_identifier("a\"b"), "\"a\"\"b\"");
}
