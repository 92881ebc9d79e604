/*!
 * Tests for application configuration
 */

use anyhow::Result;
use ldom_render::app_config::{Config, LogLevel};
use crate::common;

/// Test default values
#[test]
fn test_default_shouldUseXelatexAndFiveMinuteTimeout() {
    let config = Config::default();
    assert_eq!(config.default_language, "en");
    assert_eq!(config.render.engine, "xelatex");
    assert_eq!(config.render.timeout_secs, 300);
    assert_eq!(config.render.source_extension, "tex");
    assert!(config.render.tool_path.is_none());
    assert!(config.render.workspace_root.ends_with("workspace"));
    assert!(config.validate().is_ok());
}

/// Test that an empty default language is rejected
#[test]
fn test_validate_withEmptyDefaultLanguage_shouldFail() {
    let mut config = Config::default();
    config.default_language = "  ".to_string();
    assert!(config.validate().is_err());
}

/// Test that adapter options follow the config
#[test]
fn test_adapterOptions_shouldReflectConfig() {
    let mut config = Config::default();
    config.languages = vec!["gr".to_string(), "en".to_string()];
    config.alignment.source_language = Some("gr".to_string());

    assert_eq!(config.typesetting_options().languages, vec!["gr", "en"]);
    let interlinear = config.interlinear_options();
    assert_eq!(interlinear.source_language.as_deref(), Some("gr"));
    assert!(interlinear.target_language.is_none());
    assert_eq!(interlinear.default_language, "en");
}

/// Test saving and loading a customized config
#[test]
fn test_save_thenLoad_shouldPreserveValues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("ldom.json");

    let mut config = Config::default();
    config.log_level = LogLevel::Debug;
    config.render.timeout_secs = 42;
    config.save(&path)?;

    let loaded = Config::load_or_create(&path)?;
    assert_eq!(loaded.log_level, LogLevel::Debug);
    assert_eq!(loaded.render.timeout_secs, 42);
    Ok(())
}

/// Test that malformed JSON is reported
#[test]
fn test_loadOrCreate_withMalformedFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "ldom.json", "{ not json")?;
    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}
