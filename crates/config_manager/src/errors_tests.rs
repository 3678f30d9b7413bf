//! Tests for configuration error types.

use super::*;

#[test]
fn test_validation_error_keeps_field() {
    let error = ConfigurationError::from(ValidationError::empty_field("team.name"));

    assert_eq!(
        error,
        ConfigurationError::InvalidConfiguration {
            field: "team.name".to_string(),
            reason: "Field 'team.name' cannot be empty".to_string(),
        }
    );
}

#[test]
fn test_duplicate_uses_kind_as_field() {
    let error = ConfigurationError::from(ValidationError::duplicate("repository", "svc"));

    assert_eq!(
        error.to_string(),
        "Invalid configuration: repository - Duplicate repository 'svc'"
    );
}

#[test]
fn test_file_errors_display_path() {
    let error = ConfigurationError::FileNotFound {
        path: "team-organizer.toml".to_string(),
    };

    assert_eq!(
        error.to_string(),
        "Configuration file not found: team-organizer.toml"
    );
}
