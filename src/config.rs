//! Configuration loading (expansion): a TOML file mapping onto fetch
//! timeouts, per-provider enablement, and CLI display preferences.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Top-level configuration, deserialized from `usageguard.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub providers: HashMap<String, ProviderConfig>,
    pub display: DisplayConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self { fetch: FetchConfig::default(), providers: HashMap::new(), display: DisplayConfig::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Seconds per strategy attempt; the on-disk key is `timeout` (§6).
    /// A float on disk (e.g. `10.0`) to allow sub-second timeouts.
    #[serde(rename = "timeout")]
    pub timeout_seconds: f64,
    pub max_concurrent: usize,
    pub stale_threshold_minutes: i64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout_seconds: 30.0, max_concurrent: 5, stale_threshold_minutes: 15 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub enabled: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub no_color: bool,
    pub json: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { no_color: false, json: false }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: String, #[source] source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: String, #[source] source: toml::de::Error },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("failed to write config file {path}: {source}")]
    Write { path: String, #[source] source: std::io::Error },
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse { path: path.display().to_string(), source })
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Write this config to `path`, creating parent directories as
    /// needed. Used by `usageguard config --init` to seed a fresh
    /// config file with documented defaults.
    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|source| ConfigError::Write { path: parent.display().to_string(), source })?;
        }
        let raw = self.to_toml_string()?;
        std::fs::write(path, raw).map_err(|source| ConfigError::Write { path: path.display().to_string(), source })
    }

    pub fn is_provider_enabled(&self, provider_id: &str) -> bool {
        self.providers.get(provider_id).map(|p| p.enabled).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.fetch.timeout_seconds, 30.0);
        assert_eq!(config.fetch.max_concurrent, 5);
        assert_eq!(config.fetch.stale_threshold_minutes, 15);
        assert!(!config.display.json);
    }

    #[test]
    fn unlisted_provider_defaults_to_enabled() {
        let config = Config::default();
        assert!(config.is_provider_enabled("acme-ai"));
    }

    #[test]
    fn parses_a_minimal_toml_document() {
        let raw = r#"
            [fetch]
            timeout = 10.0
            max_concurrent = 2

            [providers.acme-ai]
            enabled = false

            [display]
            json = true
        "#;
        let config = Config::from_toml_str(raw).unwrap();
        assert_eq!(config.fetch.timeout_seconds, 10.0);
        assert_eq!(config.fetch.max_concurrent, 2);
        assert!(!config.is_provider_enabled("acme-ai"));
        assert!(config.is_provider_enabled("nimbus-ai"));
        assert!(config.display.json);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(Config::from_toml_str("not valid = [[[").is_err());
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let raw = config.to_toml_string().unwrap();
        let reloaded = Config::from_toml_str(&raw).unwrap();
        assert_eq!(reloaded.fetch.timeout_seconds, config.fetch.timeout_seconds);
        assert_eq!(reloaded.fetch.max_concurrent, config.fetch.max_concurrent);
    }

    #[test]
    fn save_writes_a_loadable_file() {
        let dir = std::env::temp_dir().join(format!("usageguard-config-test-{}", std::process::id()));
        let path = dir.join("nested").join("usageguard.toml");
        let config = Config::default();

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.fetch.max_concurrent, config.fetch.max_concurrent);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
