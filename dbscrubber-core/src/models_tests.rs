//! Tests for the scrub run models.

use super::*;

#[test]
fn test_environment_type_parsing() {
    assert_eq!(
        "production".parse::<EnvironmentType>().unwrap(),
        EnvironmentType::Production
    );
    assert_eq!(
        " Staging ".parse::<EnvironmentType>().unwrap(),
        EnvironmentType::Staging
    );
    assert_eq!(
        "dev".parse::<EnvironmentType>().unwrap(),
        EnvironmentType::Development
    );
    assert!("qa-cluster".parse::<EnvironmentType>().is_err());
}

#[test]
fn test_environment_default_is_protected() {
    assert_eq!(EnvironmentType::default(), EnvironmentType::Production);
    assert!(EnvironmentType::default().is_protected());
    assert!(!EnvironmentType::Staging.is_protected());
    assert!(!EnvironmentType::Local.is_protected());
}

#[test]
fn test_scrub_mode_coverage() {
    assert!(ScrubMode::All.includes_users());
    assert!(ScrubMode::All.includes_comments());
    assert!(ScrubMode::Users.includes_users());
    assert!(!ScrubMode::Users.includes_comments());
    assert!(!ScrubMode::Comments.includes_users());
    assert!(ScrubMode::Comments.includes_comments());
}

#[test]
fn test_full_run_phase_sequence_is_valid() {
    let sequence = [
        ScrubPhase::Guarding,
        ScrubPhase::DuplicatingAccounts,
        ScrubPhase::WalkingAccounts,
        ScrubPhase::DuplicatingAttributes,
        ScrubPhase::MutatingAttributes,
        ScrubPhase::PromotingAccounts,
        ScrubPhase::DuplicatingComments,
        ScrubPhase::TruncatingComments,
        ScrubPhase::PromotingComments,
        ScrubPhase::Done,
    ];

    for pair in sequence.windows(2) {
        assert!(
            pair[0].can_transition_to(pair[1]),
            "{} -> {} should be allowed",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_aborted_only_reachable_from_guarding() {
    assert!(ScrubPhase::Guarding.can_transition_to(ScrubPhase::Aborted));
    assert!(!ScrubPhase::WalkingAccounts.can_transition_to(ScrubPhase::Aborted));
    assert!(!ScrubPhase::PromotingComments.can_transition_to(ScrubPhase::Aborted));
}

#[test]
fn test_terminal_phases() {
    assert!(ScrubPhase::Done.is_terminal());
    assert!(ScrubPhase::Aborted.is_terminal());
    assert!(!ScrubPhase::Done.can_transition_to(ScrubPhase::Guarding));
    assert!(!ScrubPhase::Guarding.is_terminal());
}

#[test]
fn test_report_serializes_phases() {
    let mut report = ScrubReport::new(ScrubMode::Users, DatabaseType::SQLite);
    report.phases.push(ScrubPhase::Guarding);
    report.phases.push(ScrubPhase::DuplicatingAccounts);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["mode"], "users");
    assert_eq!(json["run_lock_held"], false);
    assert_eq!(json["phases"][1], "DuplicatingAccounts");
    assert_eq!(report.final_phase(), Some(ScrubPhase::DuplicatingAccounts));
}

#[test]
fn test_database_type_display() {
    assert_eq!(DatabaseType::PostgreSQL.to_string(), "PostgreSQL");
    assert_eq!(DatabaseType::MySQL.to_string(), "MySQL");
    assert_eq!(DatabaseType::SQLite.to_string(), "SQLite");
}
