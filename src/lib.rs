//! Site-Mirror: a static mirror builder for rendered websites
//!
//! This crate crawls every in-scope page reachable from a single seed URL,
//! captures the rendered markup, downloads referenced images into a local
//! asset directory, and rewrites links so the result browses offline.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Site-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PageState,
        to: state::PageState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Setup error: {0}")]
    Setup(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors reported by a page renderer
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out")]
    Timeout { url: String },

    #[error("Navigation to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("No page has been rendered yet")]
    NoPage,

    #[error("Renderer unavailable: {0}")]
    Unavailable(String),
}

/// Errors for a single asset download
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("HTTP {status} for asset {url}")]
    Http { url: String, status: u16 },

    #[error("Network error for asset {url}: {message}")]
    Network { url: String, message: String },

    #[error("Timed out downloading asset {url}")]
    Timeout { url: String },

    #[error("Failed to store asset: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Site-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{PageState, VisitedEntry, VisitedPages};
pub use crate::url::{is_in_scope, normalize_url};
