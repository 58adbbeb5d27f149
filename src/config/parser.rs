use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use std::path::{Path, PathBuf};

/// Values supplied on the command line or environment, applied over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub seed_url: Option<String>,
    pub site_dir: Option<PathBuf>,
    pub max_pages: Option<usize>,
    pub max_concurrent_assets: Option<usize>,
    pub content_marker: Option<String>,
}

impl ConfigOverrides {
    /// Applies every present override to the configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(seed) = &self.seed_url {
            config.seed_url = seed.trim().to_string();
        }
        if let Some(dir) = &self.site_dir {
            config.output.site_dir = dir.clone();
        }
        if let Some(max_pages) = self.max_pages {
            config.crawler.max_pages = max_pages;
        }
        if let Some(concurrency) = self.max_concurrent_assets {
            config.crawler.max_concurrent_assets = concurrency;
        }
        if let Some(marker) = &self.content_marker {
            config.crawler.content_marker = marker.clone();
        }
    }
}

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Parses TOML content without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Builds the effective configuration: optional file, then overrides, then validation
///
/// The seed URL is usually absent from the file, so validation runs only
/// after the overrides are in place.
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::{resolve_config, ConfigOverrides};
///
/// let overrides = ConfigOverrides {
///     seed_url: Some("https://example.com/".to_string()),
///     ..ConfigOverrides::default()
/// };
/// let config = resolve_config(None, &overrides).unwrap();
/// assert_eq!(config.crawler.max_pages, 500);
/// ```
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    overrides.apply(&mut config);
    validate(&config)?;

    Ok(config)
}
