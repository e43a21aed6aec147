//! Tests for layered settings

use std::fs;

use tempfile::TempDir;

use orgdelta::application::ApplicationError;
use orgdelta::config::Settings;

#[test]
fn given_explicit_config_when_loading_then_overrides_defaults() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("orgdelta.toml");
    fs::write(
        &path,
        r#"
[layout]
horizontal_gap = 16.0

[fields]
employee_id = "Personnel Number"
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(&path)).unwrap();

    // Assert
    assert_eq!(settings.layout.horizontal_gap, 16.0);
    assert_eq!(settings.fields.employee_id, "Personnel Number");
    assert_eq!(settings.fields.manager_id, "Manager ID");
}

#[test]
fn given_missing_explicit_config_when_loading_then_config_error() {
    let temp = TempDir::new().unwrap();

    let result = Settings::load(Some(&temp.path().join("absent.toml")));

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_negative_gap_when_loading_then_config_error() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bad.toml");
    fs::write(&path, "[layout]\nvertical_gap = -1.0\n").unwrap();

    // Act
    let result = Settings::load(Some(&path));

    // Assert
    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}

#[test]
fn given_malformed_toml_when_loading_then_config_error_names_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    fs::write(&path, "[layout\n").unwrap();

    let err = Settings::load(Some(&path)).unwrap_err();

    assert!(err.to_string().contains("broken.toml"));
}
