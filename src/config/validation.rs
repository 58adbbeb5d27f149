use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_seed_url(&config.seed_url)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the seed URL: absolute, http(s), with a host
fn validate_seed_url(seed: &str) -> Result<(), ConfigError> {
    if seed.trim().is_empty() {
        return Err(ConfigError::InvalidUrl(
            "a seed URL is required (argument or MIRROR_SEED_URL)".to_string(),
        ));
    }

    let url = Url::parse(seed.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must use http or https",
            seed
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' has no host",
            seed
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_concurrent_assets < 1 || config.max_concurrent_assets > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_assets must be between 1 and 64, got {}",
            config.max_concurrent_assets
        )));
    }

    for (name, value) in [
        ("page_timeout_ms", config.page_timeout_ms),
        ("marker_timeout_ms", config.marker_timeout_ms),
        ("asset_timeout_ms", config.asset_timeout_ms),
    ] {
        if value < 100 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 100ms, got {}ms",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.site_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "site_dir cannot be empty".to_string(),
        ));
    }

    let assets = config.assets_dir.as_str();
    if assets.is_empty() || assets == "." || assets == ".." || assets.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "assets_dir must be a single directory name, got '{}'",
            assets
        )));
    }

    Ok(())
}
