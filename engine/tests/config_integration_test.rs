//! Integration tests for configuration management
//!
//! These tests verify that configuration files load from disk with
//! defaults filled in, and that broken files surface as configuration
//! errors instead of panics.

use foreman_engine::config::Config;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_full_file() {
    let file = write_config(
        r#"
[reasoning]
model = "gpt-4o-mini"
base_url = "https://proxy.internal/v1"
max_tokens = 2048
timeout_secs = 60

[agent]
max_turns = 12
command_timeout_secs = 15
summarization_threshold = 4000
recent_turns_kept = 3

[server]
host = "0.0.0.0"
port = 9000
"#,
    );

    let config = Config::load_from_path(file.path()).expect("load config");
    assert_eq!(config.reasoning.model, "gpt-4o-mini");
    assert_eq!(config.reasoning.base_url, "https://proxy.internal/v1");
    assert_eq!(config.reasoning.max_tokens, 2048);
    assert_eq!(config.agent.max_turns, 12);
    assert_eq!(config.agent.command_timeout_secs, 15);
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9000);
}

#[test]
fn test_partial_file_fills_defaults() {
    let file = write_config(
        r#"
[agent]
max_turns = 5
"#,
    );

    let config = Config::load_from_path(file.path()).expect("load config");
    assert_eq!(config.agent.max_turns, 5);
    assert_eq!(config.agent.recent_turns_kept, 2);
    assert_eq!(config.reasoning.model, "gpt-4o");
    assert_eq!(config.server.port, 8080);
}

#[test]
fn test_empty_file_is_all_defaults() {
    let file = write_config("");

    let config = Config::load_from_path(file.path()).expect("load config");
    assert_eq!(config.reasoning.base_url, "https://api.openai.com/v1");
    assert_eq!(config.agent.command_timeout_secs, 30);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let file = write_config("[reasoning\nmodel = ");

    let err = Config::load_from_path(file.path()).expect_err("must fail");
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn test_missing_file_is_config_error() {
    let err = Config::load_from_path(std::path::Path::new("/nonexistent/foreman.toml"))
        .expect_err("must fail");
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_validation_failure_surfaces_on_load() {
    let file = write_config(
        r#"
[agent]
max_turns = 0
"#,
    );

    let err = Config::load_from_path(file.path()).expect_err("must fail");
    assert!(err.to_string().contains("max_turns"));
}
