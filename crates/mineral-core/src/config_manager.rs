use crate::error::MineralError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for MineralError {
    fn from(err: ConfigError) -> Self {
        MineralError::Config(err.to_string())
    }
}

/// How the recursive function trades completeness for speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationStrategy {
    /// No memoization and no cycle guard.
    None,
    /// Memoize every call; repeated keys are answered from the visitation cache.
    #[default]
    Memo,
    /// Memoize and prune branches whose accumulator cannot beat the best result so far.
    Fast,
}

impl OptimizationStrategy {
    pub const ALL: [OptimizationStrategy; 3] = [Self::None, Self::Memo, Self::Fast];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Memo => "memo",
            Self::Fast => "fast",
        }
    }

    pub fn caches(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn prunes(&self) -> bool {
        matches!(self, Self::Fast)
    }
}

impl fmt::Display for OptimizationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptimizationStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "memo" => Ok(Self::Memo),
            "fast" => Ok(Self::Fast),
            other => Err(ConfigError::ValidationError(format!(
                "optimization must be one of: 'none', 'memo', 'fast', got '{}'",
                other
            ))),
        }
    }
}

/// Direction of the outer ranking clause the pruning bound follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RankDirection {
    /// `ORDER BY ?x`: lower is better.
    #[default]
    Asc,
    /// `ORDER BY DESC(?x)`: higher is better.
    Desc,
}

impl FromStr for RankDirection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(ConfigError::ValidationError(format!(
                "rank order must be 'asc' or 'desc', got '{}'",
                other
            ))),
        }
    }
}

/// Main configuration for Mineral
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MineralConfig {
    #[serde(default)]
    pub function: FunctionConfig,

    /// Remote SPARQL endpoint the sub-queries are sent to
    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub template: TemplateConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionConfig {
    /// Function IRI the host evaluator resolves calls against
    #[serde(default = "default_function_iri")]
    pub iri: String,

    #[serde(default)]
    pub strategy: OptimizationStrategy,

    /// Ranking direction used by the `fast` strategy
    #[serde(default)]
    pub order: RankDirection,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            iri: default_function_iri(),
            strategy: OptimizationStrategy::default(),
            order: RankDirection::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// SPARQL query endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Projected variable holding the function result in each row
    #[serde(default = "default_result_variable")]
    pub result_variable: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            result_variable: default_result_variable(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TemplateConfig {
    /// Path of the SPARQL template file
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "pretty", "json", "compact"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_function_iri() -> String {
    "http://webofcode.org/wfn/mr".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_result_variable() -> String {
    "result".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

const STRATEGY_VARS: &[&str] = &["OPT", "opt", "MINERAL_OPT"];

/// Configuration manager: env overrides on top of a TOML file on top of defaults
pub struct ConfigManager {
    config: MineralConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables (.env file included)
    /// 2. Config file (.mineral.toml, then ~/.mineral/config.toml)
    /// 3. Defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_dotenv();
        let (config, config_path) = Self::load_config_file()?;
        Self::finish(config, config_path)
    }

    /// Load from an explicit file, still honouring environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_dotenv();
        let config = Self::read_toml_file(path)?;
        Self::finish(config, Some(path.to_path_buf()))
    }

    fn finish(config: MineralConfig, config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let has_strategy_env = STRATEGY_VARS.iter().any(|v| std::env::var(v).is_ok());
        if config_path.is_none() && !has_strategy_env {
            warn!(
                "no optimization specified. Using default {}",
                OptimizationStrategy::default()
            );
        }

        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        info!("Configuration loaded");
        if let Some(ref path) = config_path {
            info!("  config file: {}", path.display());
        } else {
            info!("  config file: NONE (using defaults)");
        }
        match config.oracle.endpoint {
            Some(ref endpoint) => info!("  endpoint set to {}", endpoint),
            None => error!("No endpoint specified! This is not going to work."),
        }
        info!("  optimization set to {}", config.function.strategy);
        info!("  cache results set to {}", config.function.strategy.caches());

        Ok(Self {
            config,
            config_path,
        })
    }

    fn load_dotenv() {
        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                warn!("Failed to load .env file: {}", e);
            }
        }
    }

    /// Search order: ./.mineral.toml, ~/.mineral/config.toml, defaults
    fn load_config_file() -> Result<(MineralConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".mineral.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".mineral").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((MineralConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<MineralConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(config: MineralConfig) -> MineralConfig {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup. An invalid strategy is reported and ignored,
    /// leaving the previous (file or default) value in place.
    pub fn apply_overrides(
        mut config: MineralConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> MineralConfig {
        if let Some(opt) = STRATEGY_VARS.iter().find_map(|v| lookup(v)) {
            match opt.parse::<OptimizationStrategy>() {
                Ok(strategy) => config.function.strategy = strategy,
                Err(_) => error!(
                    "optimization must be one of: 'none', 'memo', 'fast'. Non-valid '{}' value was specified. Using {}",
                    opt, config.function.strategy
                ),
            }
        }
        if let Some(order) = lookup("MINERAL_ORDER") {
            match order.parse::<RankDirection>() {
                Ok(order) => config.function.order = order,
                Err(e) => error!("{}", e),
            }
        }
        if let Some(endpoint) = lookup("MINERAL_ENDPOINT") {
            config.oracle.endpoint = Some(endpoint);
        }
        if let Some(timeout) = lookup("MINERAL_TIMEOUT_SECS") {
            match timeout.trim().parse() {
                Ok(secs) => config.oracle.timeout_secs = secs,
                Err(_) => error!(
                    "MINERAL_TIMEOUT_SECS must be a whole number of seconds. Non-valid '{}' value was specified. Using {}",
                    timeout, config.oracle.timeout_secs
                ),
            }
        }
        if let Some(path) = lookup("MINERAL_SPARQL_TEMPLATE") {
            config.template.path = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup("RUST_LOG") {
            config.logging.level = level;
        }

        config
    }

    pub fn validate_config(config: &MineralConfig) -> Result<(), ConfigError> {
        if let Some(endpoint) = &config.oracle.endpoint {
            if endpoint.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "oracle endpoint must not be empty".to_string(),
                ));
            }
        }

        if config.oracle.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "oracle timeout must be at least one second".to_string(),
            ));
        }

        let var = &config.oracle.result_variable;
        if var.is_empty() || !var.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(ConfigError::ValidationError(format!(
                "Invalid result variable: '{}'",
                var
            )));
        }

        // RUST_LOG may carry full directives ("mineral_eval=debug"); only bare levels are checked.
        let level = config.logging.level.as_str();
        if !level.contains('=') && !level.contains(',') {
            match level {
                "trace" | "debug" | "info" | "warn" | "error" => {}
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        other
                    )))
                }
            }
        }

        match config.logging.format.as_str() {
            "pretty" | "json" | "compact" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {}. Must be one of: pretty, json, compact",
                    other
                )))
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &MineralConfig {
        &self.config
    }

    pub fn into_config(self) -> MineralConfig {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Write a default config file
    pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        let config = MineralConfig::default();
        let toml_str =
            toml::to_string_pretty(&config).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        }

        std::fs::write(path, toml_str).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = MineralConfig::default();
        assert_eq!(config.function.strategy, OptimizationStrategy::Memo);
        assert_eq!(config.function.iri, "http://webofcode.org/wfn/mr");
        assert_eq!(config.oracle.result_variable, "result");
        assert!(config.oracle.endpoint.is_none());
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("FAST".parse::<OptimizationStrategy>().unwrap(), OptimizationStrategy::Fast);
        assert_eq!(" none ".parse::<OptimizationStrategy>().unwrap(), OptimizationStrategy::None);
        assert!("turbo".parse::<OptimizationStrategy>().is_err());
        for strategy in OptimizationStrategy::ALL {
            assert_eq!(strategy.to_string().parse::<OptimizationStrategy>().unwrap(), strategy);
        }
        assert!(!OptimizationStrategy::None.caches());
        assert!(OptimizationStrategy::Fast.prunes());
        assert!(!OptimizationStrategy::Memo.prunes());
    }

    #[test]
    fn test_env_overrides() {
        let config = ConfigManager::apply_overrides(
            MineralConfig::default(),
            env(&[
                ("OPT", "fast"),
                ("MINERAL_ENDPOINT", "http://localhost:3030/ds/sparql"),
                ("MINERAL_ORDER", "desc"),
                ("MINERAL_SPARQL_TEMPLATE", "/tmp/template.rq"),
            ]),
        );
        assert_eq!(config.function.strategy, OptimizationStrategy::Fast);
        assert_eq!(config.function.order, RankDirection::Desc);
        assert_eq!(
            config.oracle.endpoint.as_deref(),
            Some("http://localhost:3030/ds/sparql")
        );
        assert_eq!(config.template.path, Some(PathBuf::from("/tmp/template.rq")));
    }

    #[test]
    fn test_upper_case_opt_wins() {
        let config = ConfigManager::apply_overrides(
            MineralConfig::default(),
            env(&[("OPT", "none"), ("opt", "fast")]),
        );
        assert_eq!(config.function.strategy, OptimizationStrategy::None);
    }

    #[test]
    fn test_invalid_strategy_falls_back() {
        let config =
            ConfigManager::apply_overrides(MineralConfig::default(), env(&[("opt", "turbo")]));
        assert_eq!(config.function.strategy, OptimizationStrategy::Memo);
    }

    #[test]
    fn test_invalid_timeout_keeps_previous() {
        let config = ConfigManager::apply_overrides(
            MineralConfig::default(),
            env(&[("MINERAL_TIMEOUT_SECS", "soon")]),
        );
        assert_eq!(config.oracle.timeout_secs, 60);

        let config = ConfigManager::apply_overrides(
            MineralConfig::default(),
            env(&[("MINERAL_TIMEOUT_SECS", " 15 ")]),
        );
        assert_eq!(config.oracle.timeout_secs, 15);
    }

    #[test]
    fn test_config_validation() {
        let config = MineralConfig::default();
        assert!(ConfigManager::validate_config(&config).is_ok());

        let mut bad = config.clone();
        bad.logging.format = "xml".to_string();
        assert!(ConfigManager::validate_config(&bad).is_err());

        let mut bad = config.clone();
        bad.oracle.endpoint = Some("  ".to_string());
        assert!(ConfigManager::validate_config(&bad).is_err());

        let mut bad = config.clone();
        bad.oracle.result_variable = "?result".to_string();
        assert!(ConfigManager::validate_config(&bad).is_err());

        let mut directive = config;
        directive.logging.level = "mineral_eval=debug".to_string();
        assert!(ConfigManager::validate_config(&directive).is_ok());
    }
}
