//! Configuration management for the collegium backend
//!
//! One TOML file describes a deployment; environment variables in the form
//! `COLLEGIUM_SECTION__KEY=value` override individual keys at load time.

use crate::error::{CollegiumError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub ranking: RankingConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

/// Query understanding and search tiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Keywords kept per query
    pub top_k: usize,
    /// Shortest token (in chars) that can become a keyword
    pub min_token_len: usize,
    /// Keywords participating in the LIKE fallback
    pub max_like_keywords: usize,
    /// Q&A rows fetched for ranking
    pub qa_candidate_limit: usize,
    /// Ranked Q&A rows returned to the client
    pub qa_top: usize,
    /// Catalog names scanned by the fuzzy matcher
    pub catalog_limit: usize,
    /// Dissimilarity ratio at or below which a name suggestion is accepted
    pub fuzzy_threshold: f64,
    /// Result limit when the request omits one
    pub default_limit: usize,
    /// Hard ceiling on the requested result limit
    pub max_limit: usize,
}

/// Q&A composite-score weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub overlap_weight: f64,
    pub similarity_weight: f64,
    pub tag_bonus: f64,
    /// Characters of each string fed to the edit-distance computation
    pub similarity_prefix_chars: usize,
    /// Optional clamp on the feedback-learned rank score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_score_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_score_max: Option<f64>,
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub response_ttl_secs: u64,
}

/// Fixed-window rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub per_minute: u64,
    pub per_hour: u64,
    /// Counter TTLs; must outlive their window
    pub minute_ttl_secs: u64,
    pub hour_ttl_secs: u64,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CollegiumError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CollegiumError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| CollegiumError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: COLLEGIUM_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix("COLLEGIUM_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
            value.parse().map_err(|_| CollegiumError::InvalidConfigValue {
                path: path.to_string(),
                message: format!("Cannot parse '{}'", value),
            })
        }

        match path {
            "SEARCH__TOP_K" => self.search.top_k = parse(path, value)?,
            "SEARCH__DEFAULT_LIMIT" => self.search.default_limit = parse(path, value)?,
            "SEARCH__FUZZY_THRESHOLD" => self.search.fuzzy_threshold = parse(path, value)?,
            "CACHE__RESPONSE_TTL_SECS" => self.cache.response_ttl_secs = parse(path, value)?,
            "RATE_LIMIT__PER_MINUTE" => self.rate_limit.per_minute = parse(path, value)?,
            "RATE_LIMIT__PER_HOUR" => self.rate_limit.per_hour = parse(path, value)?,
            "STORAGE__DATA_DIR" => self.storage.data_dir = PathBuf::from(value),
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            CollegiumError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("collegium").join("config.toml"))
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            CollegiumError::Config("Cannot determine home directory".to_string())
        })?;

        Ok(home_dir.join(".collegium"))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("~/.collegium"),
            },
            search: SearchConfig {
                top_k: 10,
                min_token_len: 2,
                max_like_keywords: 8,
                qa_candidate_limit: 60,
                qa_top: 8,
                catalog_limit: 500,
                fuzzy_threshold: 0.65,
                default_limit: 10,
                max_limit: 50,
            },
            ranking: RankingConfig {
                overlap_weight: 2.0,
                similarity_weight: 2.5,
                tag_bonus: 0.8,
                similarity_prefix_chars: 200,
                rank_score_min: None,
                rank_score_max: None,
            },
            cache: CacheConfig {
                response_ttl_secs: 90,
            },
            rate_limit: RateLimitConfig {
                per_minute: 120,
                per_hour: 2000,
                minute_ttl_secs: 70,
                hour_ttl_secs: 3700,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        ConfigValidator::validate(&Config::default()).unwrap();
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::default();
        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.search.top_k, config.search.top_k);
        assert_eq!(loaded.rate_limit.per_minute, config.rate_limit.per_minute);
        assert_eq!(loaded.meta.schema_version, "1.0.0");
    }

    #[test]
    fn test_missing_file_is_config_not_found() {
        let err = Config::load(Path::new("/nonexistent/config.toml")).unwrap_err();
        assert!(matches!(err, CollegiumError::ConfigNotFound { .. }));
    }
}
