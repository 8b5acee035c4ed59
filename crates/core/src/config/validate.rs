use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Cache TTL is not 0
/// - Rate limit budgets and windows are not 0
/// - An enabled OpenSubtitles backend has an API key
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.cache.ttl_hours == 0 {
        return Err(ConfigError::ValidationError(
            "cache.ttl_hours cannot be 0".to_string(),
        ));
    }

    if config.rate_limit.default_requests == 0 {
        return Err(ConfigError::ValidationError(
            "rate_limit.default_requests cannot be 0".to_string(),
        ));
    }

    if config.rate_limit.default_window_secs == 0 {
        return Err(ConfigError::ValidationError(
            "rate_limit.default_window_secs cannot be 0".to_string(),
        ));
    }

    for limit in &config.rate_limit.providers {
        if limit.requests == 0 {
            return Err(ConfigError::ValidationError(format!(
                "rate_limit.providers[{}].requests cannot be 0",
                limit.provider
            )));
        }
        if limit.window_secs == 0 {
            return Err(ConfigError::ValidationError(format!(
                "rate_limit.providers[{}].window_secs cannot be 0",
                limit.provider
            )));
        }
    }

    if let Some(os) = &config.providers.opensubtitles {
        if os.enabled && os.api_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "providers.opensubtitles.api_key is required when enabled".to_string(),
            ));
        }
    }

    Ok(())
}
