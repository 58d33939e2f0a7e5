use mineral_core::{
    ConfigManager, MineralConfig, OptimizationStrategy, RankDirection,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("nested").join("config.toml");

    ConfigManager::create_default_config(&config_path).unwrap();
    assert!(config_path.exists());

    let manager = ConfigManager::load_from(&config_path).unwrap();
    assert_eq!(manager.config_path(), Some(config_path.as_path()));
    assert_eq!(
        manager.config().oracle.result_variable,
        MineralConfig::default().oracle.result_variable
    );
}

#[test]
fn test_partial_config_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("mineral.toml");
    fs::write(
        &config_path,
        r#"
[function]
order = "desc"

[oracle]
endpoint = "http://localhost:3030/ds/sparql"
timeout_secs = 5
"#,
    )
    .unwrap();

    let manager = ConfigManager::load_from(&config_path).unwrap();
    let config = manager.config();
    assert_eq!(config.function.order, RankDirection::Desc);
    assert_eq!(config.oracle.timeout_secs, 5);
    assert_eq!(config.oracle.result_variable, "result");
    assert_eq!(config.logging.format, "pretty");
    assert_eq!(config.function.iri, "http://webofcode.org/wfn/mr");
}

#[test]
fn test_unknown_strategy_in_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("mineral.toml");
    fs::write(&config_path, "[function]\nstrategy = \"turbo\"\n").unwrap();

    assert!(ConfigManager::load_from(&config_path).is_err());
}

#[test]
fn test_missing_file_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("absent.toml");
    assert!(ConfigManager::load_from(&missing).is_err());
}

#[test]
fn test_strategy_serializes_lowercase() {
    let mut config = MineralConfig::default();
    config.function.strategy = OptimizationStrategy::Fast;
    let text = toml::to_string(&config).unwrap();
    assert!(text.contains("strategy = \"fast\""));
}
