//! Configuration loading and validation tests
//!
//! Tests focus on BEHAVIOR of configuration loading, validation, and error handling.

use casework::config::{ConfigError, PolicyConfig};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

#[test]
fn test_config_loads_successfully_from_valid_toml() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(
        temp_file,
        r#"
[sla]
default_ack_hours = 72
high_severity_ack_hours = 12

[classification]
min_confidence = 0.7

[drafting]
min_confidence = 0.8
max_revision_rounds = 3

[hallucination]
threshold = 0.3

[retrieval]
top_k = 3
min_doc_confidence = 0.5

[risk]
escalate_flags = ["THREAT_SELF_HARM"]
hard_block_flags = ["POTENTIAL_FRAUD"]

[orchestrator]
max_total_steps = 10
enable_guardrails = false
"#
    )
    .unwrap();

    let config = PolicyConfig::load_from_file(temp_file.path()).unwrap();

    assert_eq!(config.sla.default_ack_hours, 72);
    assert_eq!(config.sla.high_severity_ack_hours, 12);
    assert_eq!(config.classification.min_confidence, 0.7);
    assert_eq!(config.drafting.max_revision_rounds, 3);
    assert_eq!(config.hallucination.threshold, 0.3);
    assert_eq!(config.retrieval.top_k, 3);
    assert!(config.risk.hard_block_flags.contains("POTENTIAL_FRAUD"));
    assert!(!config.risk.escalate_flags.contains("THREAT_VIOLENCE"));
    assert_eq!(config.orchestrator.max_total_steps, 10);
    assert!(!config.orchestrator.enable_guardrails);
    assert!(config.dispatch.is_none());
}

#[test]
fn test_config_loads_dispatch_section_with_defaults() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(
        temp_file,
        r#"
[dispatch]
webhook_url = "http://localhost:9000/responses"
"#
    )
    .unwrap();

    let config = PolicyConfig::load_from_file(temp_file.path()).unwrap();
    let dispatch = config.dispatch.unwrap();

    assert_eq!(dispatch.webhook_url, "http://localhost:9000/responses");
    assert_eq!(dispatch.timeout_ms, 5000);
    assert_eq!(dispatch.retry_attempts, 3);
}

#[test]
fn test_missing_file_is_a_read_error() {
    let result = PolicyConfig::load_from_file(Path::new("/nonexistent/casework.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn test_malformed_toml_is_a_parse_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    writeln!(temp_file, "[orchestrator\nmax_total_steps = ").unwrap();

    let result = PolicyConfig::load_from_file(temp_file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_wrong_type_is_a_parse_error() {
    let result = PolicyConfig::from_toml_str(
        r#"
[orchestrator]
max_total_steps = "forty"
"#,
    );
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn test_zero_step_budget_rejected() {
    let result = PolicyConfig::from_toml_str(
        r#"
[orchestrator]
max_total_steps = 0
"#,
    );
    match result {
        Err(ConfigError::InvalidConfig(message)) => assert!(message.contains("max_total_steps")),
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn test_threshold_out_of_range_rejected() {
    let result = PolicyConfig::from_toml_str(
        r#"
[hallucination]
threshold = 1.5
"#,
    );
    match result {
        Err(ConfigError::InvalidConfig(message)) => {
            assert!(message.contains("hallucination.threshold"))
        }
        other => panic!("expected invalid config, got {other:?}"),
    }
}

#[test]
fn test_flag_cannot_be_escalated_and_blocked() {
    let result = PolicyConfig::from_toml_str(
        r#"
[risk]
escalate_flags = ["THREAT_SELF_HARM"]
hard_block_flags = ["THREAT_SELF_HARM"]
"#,
    );
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_empty_webhook_url_rejected() {
    let result = PolicyConfig::from_toml_str(
        r#"
[dispatch]
webhook_url = "  "
"#,
    );
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn test_serialized_config_round_trips() {
    let mut config = PolicyConfig::default();
    config.orchestrator.max_total_steps = 7;
    config.risk.hard_block_flags.insert("POTENTIAL_FRAUD".to_string());

    let text = toml::to_string_pretty(&config).unwrap();
    let reloaded = PolicyConfig::from_toml_str(&text).unwrap();

    assert_eq!(reloaded, config);
}
