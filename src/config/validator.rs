use crate::config::Config;
use crate::error::{CollegiumError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_search(config, &mut errors);
        Self::validate_ranking(config, &mut errors);
        Self::validate_cache(config, &mut errors);
        Self::validate_rate_limit(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CollegiumError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "Data directory path cannot be empty",
            ));
        }
    }

    fn validate_search(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.search.top_k == 0 {
            errors.push(ValidationError::new(
                "search.top_k",
                "Keyword count must be greater than 0",
            ));
        }

        if config.search.min_token_len == 0 {
            errors.push(ValidationError::new(
                "search.min_token_len",
                "Minimum token length must be greater than 0",
            ));
        }

        if config.search.max_like_keywords == 0 {
            errors.push(ValidationError::new(
                "search.max_like_keywords",
                "LIKE keyword cap must be greater than 0",
            ));
        }

        if config.search.qa_top == 0 || config.search.qa_top > config.search.qa_candidate_limit {
            errors.push(ValidationError::new(
                "search.qa_top",
                format!(
                    "Must be between 1 and qa_candidate_limit ({}), got {}",
                    config.search.qa_candidate_limit, config.search.qa_top
                ),
            ));
        }

        let threshold = config.search.fuzzy_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            errors.push(ValidationError::new(
                "search.fuzzy_threshold",
                format!("Must be between 0.0 and 1.0, got {}", threshold),
            ));
        }

        if config.search.max_limit == 0 || config.search.max_limit > 50 {
            errors.push(ValidationError::new(
                "search.max_limit",
                format!("Must be between 1 and 50, got {}", config.search.max_limit),
            ));
        }

        if config.search.default_limit == 0
            || config.search.default_limit > config.search.max_limit
        {
            errors.push(ValidationError::new(
                "search.default_limit",
                format!(
                    "Must be between 1 and max_limit ({}), got {}",
                    config.search.max_limit, config.search.default_limit
                ),
            ));
        }
    }

    fn validate_ranking(config: &Config, errors: &mut Vec<ValidationError>) {
        for (path, weight) in [
            ("ranking.overlap_weight", config.ranking.overlap_weight),
            ("ranking.similarity_weight", config.ranking.similarity_weight),
            ("ranking.tag_bonus", config.ranking.tag_bonus),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                errors.push(ValidationError::new(
                    path,
                    format!("Weight must be a non-negative number, got {}", weight),
                ));
            }
        }

        if config.ranking.similarity_prefix_chars == 0 {
            errors.push(ValidationError::new(
                "ranking.similarity_prefix_chars",
                "Similarity prefix length must be greater than 0",
            ));
        }

        if let (Some(min), Some(max)) =
            (config.ranking.rank_score_min, config.ranking.rank_score_max)
        {
            if min >= max {
                errors.push(ValidationError::new(
                    "ranking.rank_score_min",
                    format!("Clamp bounds must satisfy min < max, got {} >= {}", min, max),
                ));
            }
        }
    }

    fn validate_cache(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.cache.response_ttl_secs == 0 {
            errors.push(ValidationError::new(
                "cache.response_ttl_secs",
                "Response TTL must be greater than 0",
            ));
        }
    }

    fn validate_rate_limit(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.rate_limit.per_minute == 0 {
            errors.push(ValidationError::new(
                "rate_limit.per_minute",
                "Per-minute limit must be greater than 0",
            ));
        }

        if config.rate_limit.per_hour < config.rate_limit.per_minute {
            errors.push(ValidationError::new(
                "rate_limit.per_hour",
                "Per-hour limit cannot be lower than the per-minute limit",
            ));
        }

        // A counter that expires before its window ends would silently
        // reset the quota mid-window.
        if config.rate_limit.minute_ttl_secs < 60 {
            errors.push(ValidationError::new(
                "rate_limit.minute_ttl_secs",
                "Minute counter TTL must cover the full window (>= 60s)",
            ));
        }

        if config.rate_limit.hour_ttl_secs < 3600 {
            errors.push(ValidationError::new(
                "rate_limit.hour_ttl_secs",
                "Hour counter TTL must cover the full window (>= 3600s)",
            ));
        }
    }
}
