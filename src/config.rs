use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cache::CacheStrategy;
use crate::endpoints::DEFAULT_BASE_URL;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AresConfig {
    pub cache: CacheConfig,
    pub network: NetworkConfig,
    pub endpoint: EndpointConfig,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache directory; caching is disabled when unset
    pub directory: Option<PathBuf>,
    /// Validity window of cached records
    pub strategy: CacheStrategy,
    /// Keep raw upstream responses next to the cached records
    pub debug: bool,
    /// Maximum number of entries in the in-process tier
    pub max_memory_entries: u64,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of retry attempts for failed requests
    pub retry_attempts: u32,
    /// Initial retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Backoff cap in milliseconds
    pub max_retry_delay_ms: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL of the ARES CGI services
    pub base_url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            strategy: CacheStrategy::YearWeek,
            debug: false,
            max_memory_entries: 1000,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            max_retry_delay_ms: 30000,
            user_agent: format!("ares-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: defaults -> file -> environment
    pub async fn load_config(path: Option<&Path>) -> Result<AresConfig> {
        Self::load_config_with(&SystemEnvProvider, path).await
    }

    pub async fn load_config_with(
        env: &impl EnvProvider,
        path: Option<&Path>,
    ) -> Result<AresConfig> {
        let config = match path {
            Some(path) => Self::load_from_file(path).await?,
            None => Self::find_config_file().await?.unwrap_or_default(),
        };

        let config = Self::apply_environment_overrides_with(env, config)?;

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<AresConfig> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<AresConfig>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<AresConfig>> {
        let config_names = ["ares.toml", "ares.json", ".ares.toml", ".ares.json"];

        // Check current directory first
        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        // Check user config directory
        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("ares");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: AresConfig,
    ) -> Result<AresConfig> {
        // Cache settings
        if let Some(cache_dir) = env.get("ARES_CACHE_DIR") {
            config.cache.directory = if cache_dir.trim().is_empty() {
                None
            } else {
                Some(PathBuf::from(cache_dir))
            };
        }

        if let Some(strategy) = env.get("ARES_CACHE_STRATEGY") {
            config.cache.strategy = strategy.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid ARES_CACHE_STRATEGY value: {}", strategy))
            })?;
        }

        if let Some(debug) = env.get("ARES_DEBUG") {
            config.cache.debug = debug.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid ARES_DEBUG value: {}", debug))
            })?;
        }

        if let Some(entries) = env.get("ARES_MAX_MEMORY_ENTRIES") {
            config.cache.max_memory_entries = entries.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid ARES_MAX_MEMORY_ENTRIES value: {}",
                    entries
                ))
            })?;
        }

        // Network settings
        if let Some(timeout) = env.get("ARES_TIMEOUT") {
            config.network.timeout_seconds = timeout.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid ARES_TIMEOUT value: {}", timeout))
            })?;
        }

        if let Some(retry_attempts) = env.get("ARES_RETRY_ATTEMPTS") {
            config.network.retry_attempts = retry_attempts.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid ARES_RETRY_ATTEMPTS value: {}",
                    retry_attempts
                ))
            })?;
        }

        // Endpoint settings
        if let Some(base_url) = env.get("ARES_BASE_URL") {
            config.endpoint.base_url = base_url;
        }

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate_config(config: &AresConfig) -> Result<()> {
        if config.cache.max_memory_entries == 0 {
            return Err(ConfigError::Validation(
                "Memory cache size must be greater than 0".to_string(),
            ));
        }

        if config.network.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.network.retry_attempts > 10 {
            return Err(ConfigError::Validation(
                "Retry attempts cannot exceed 10".to_string(),
            ));
        }

        if config.network.max_retry_delay_ms < config.network.retry_delay_ms {
            return Err(ConfigError::Validation(
                "Maximum retry delay cannot be shorter than the initial delay".to_string(),
            ));
        }

        let base_url = &config.endpoint.base_url;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "Base URL must be an http(s) URL: {}",
                base_url
            )));
        }

        Ok(())
    }
}
