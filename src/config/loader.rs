//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::ClientConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load a TOML file, apply environment overrides, and validate.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: ClientConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

impl ClientConfig {
    /// Defaults with environment overrides applied, validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

/// Overlay environment variables onto `config`.
///
/// `lookup` returns the raw value of a variable. Values that fail to parse
/// are skipped with a warning so one typo does not discard the file config.
pub fn apply_env_overrides<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup("SEMANTIC_SCHOLAR_API_KEY") {
        let key = key.trim();
        config.api.api_key = (!key.is_empty()).then(|| key.to_string());
    }
    if let Some(raw) = lookup("DISABLE_SSL_VERIFY") {
        config.api.disable_ssl_verify = parse_flag(&raw);
    }

    override_parsed(&lookup, "SS_RETRY_MAX_ATTEMPTS", &mut config.retries.max_attempts);
    if let Some(secs) = parsed::<f64, _>(&lookup, "SS_RETRY_BASE_DELAY") {
        config.retries.base_delay_ms = secs_to_millis(secs);
    }
    if let Some(secs) = parsed::<f64, _>(&lookup, "SS_RETRY_MAX_DELAY") {
        config.retries.max_delay_ms = secs_to_millis(secs);
    }
    if let Some(raw) = lookup("SS_ENABLE_AUTO_RETRY") {
        config.retries.enabled = parse_flag(&raw);
    }

    override_parsed(
        &lookup,
        "SS_CIRCUIT_FAILURE_THRESHOLD",
        &mut config.circuit_breaker.failure_threshold,
    );
    override_parsed(
        &lookup,
        "SS_CIRCUIT_RECOVERY_TIMEOUT",
        &mut config.circuit_breaker.recovery_timeout_secs,
    );

    if let Some(raw) = lookup("SS_CACHE_ENABLED") {
        config.cache.enabled = parse_flag(&raw);
    }
    override_parsed(&lookup, "SS_CACHE_TTL", &mut config.cache.default_ttl_secs);
    override_parsed(&lookup, "SS_CACHE_PAPER_TTL", &mut config.cache.detail_ttl_secs);

    if let Some(level) = lookup("SS_LOG_LEVEL") {
        config.observability.log_level = level.trim().to_lowercase();
    }
    if let Some(format) = lookup("SS_LOG_FORMAT") {
        config.observability.log_format = format.trim().to_lowercase();
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}

fn secs_to_millis(secs: f64) -> u64 {
    (secs.max(0.0) * 1000.0).round() as u64
}

fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(
                variable = key,
                value = %raw,
                "Ignoring unparseable environment override"
            );
            None
        }
    }
}

fn override_parsed<T, F>(lookup: &F, key: &str, target: &mut T)
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = parsed(lookup, key) {
        *target = value;
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
    fn test_no_env_keeps_defaults() {
        let mut config = ClientConfig::default();
        apply_env_overrides(&mut config, env(&[]));
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ClientConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("SEMANTIC_SCHOLAR_API_KEY", "  test-key-123 "),
                ("SS_RETRY_MAX_ATTEMPTS", "10"),
                ("SS_RETRY_BASE_DELAY", "2.5"),
                ("SS_RETRY_MAX_DELAY", "120"),
                ("SS_ENABLE_AUTO_RETRY", "false"),
                ("SS_CIRCUIT_FAILURE_THRESHOLD", "10"),
                ("SS_CIRCUIT_RECOVERY_TIMEOUT", "60.0"),
                ("SS_CACHE_ENABLED", "no"),
                ("SS_CACHE_TTL", "600"),
                ("SS_CACHE_PAPER_TTL", "7200"),
                ("SS_LOG_LEVEL", "DEBUG"),
                ("DISABLE_SSL_VERIFY", "yes"),
            ]),
        );

        assert_eq!(config.api.api_key(), Some("test-key-123"));
        assert_eq!(config.retries.max_attempts, 10);
        assert_eq!(config.retries.base_delay_ms, 2500);
        assert_eq!(config.retries.max_delay_ms, 120_000);
        assert!(!config.retries.enabled);
        assert_eq!(config.circuit_breaker.failure_threshold, 10);
        assert_eq!(config.circuit_breaker.recovery_timeout_secs, 60.0);
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.default_ttl_secs, 600);
        assert_eq!(config.cache.detail_ttl_secs, 7200);
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.api.disable_ssl_verify);
    }

    #[test]
    fn test_whitespace_api_key_is_none() {
        let mut config = ClientConfig::default();
        apply_env_overrides(&mut config, env(&[("SEMANTIC_SCHOLAR_API_KEY", " \n\t")]));
        assert_eq!(config.api.api_key, None);
    }

    #[test]
    fn test_unparseable_value_is_ignored() {
        let mut config = ClientConfig::default();
        apply_env_overrides(&mut config, env(&[("SS_RETRY_MAX_ATTEMPTS", "many")]));
        assert_eq!(config.retries.max_attempts, 5);
    }

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir()
            .join(format!("scholar_client_cfg_{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[retries]\nmax_attempts = 3\nbase_delay_ms = 10\nmax_delay_ms = 100\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.retries.max_attempts, 3);
        assert_eq!(config.retries.base_delay_ms, 10);

        std::fs::write(&path, "[retries]\nmax_attempts = 0\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("retries.max_attempts"));

        std::fs::remove_file(&path).unwrap_or_default();
    }
}
