/*!
 * Tests for app configuration
 */

use scitrans::app_config::{Config, TranslationMode};

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_config_default_shouldCarryDocumentedValues() {
    let config = Config::default();
    assert_eq!(config.mode, TranslationMode::Hybrid);
    // An empty JSON object deserializes to the same defaults.
    let config: Config = serde_json::from_str("{}").unwrap();
    assert_eq!(config.source_language, "EN");
    assert_eq!(config.target_language, "ZH");
    assert_eq!(config.fast.chunk_size, 5000);
    assert_eq!(config.ai.chunk_size, 3000);
    assert_eq!(config.job.fix_chunk_size, 4000);
    assert_eq!(config.job.concurrency, 4);
    assert_eq!(config.ai.max_tokens, 16000);
}

#[test]
fn test_config_from_file_withPartialJson_shouldFillDefaults() {
    let dir = create_temp_dir().unwrap();
    let path = create_test_file(
        &dir.path().to_path_buf(),
        "conf.json",
        r#"{"mode": "fast", "fast": {"endpoint": "http://localhost:1188/translate"}}"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.mode, TranslationMode::Fast);
    assert_eq!(config.fast.endpoint, "http://localhost:1188/translate");
    assert_eq!(config.fast.max_retries, 3);
    assert_eq!(config.target_language, "ZH");
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_from_file_withMissingFile_shouldFail() {
    assert!(Config::from_file("/nonexistent/conf.json").is_err());
}

#[test]
fn test_config_validate_withMissingEndpoint_shouldFail() {
    let mut config: Config = serde_json::from_str("{}").unwrap();
    config.mode = TranslationMode::Fast;
    assert!(config.validate().is_err());

    config.fast.endpoint = "http://localhost:1188/translate".to_string();
    assert!(config.validate().is_ok());

    // Hybrid additionally needs the AI endpoint.
    config.mode = TranslationMode::Hybrid;
    assert!(config.validate().is_err());
    config.ai.endpoint = "http://localhost:8000".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_translation_mode_parse_andDisplay_shouldRoundTrip() {
    for mode in [TranslationMode::Fast, TranslationMode::Ai, TranslationMode::Hybrid] {
        let parsed: TranslationMode = mode.to_string().parse().unwrap();
        assert_eq!(parsed, mode);
    }
    assert!("turbo".parse::<TranslationMode>().is_err());
}
