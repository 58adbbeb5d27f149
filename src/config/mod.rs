//! Configuration module for Site-Mirror
//!
//! This module handles loading, parsing, and validating configuration. Every
//! setting has a default; an optional TOML file and command-line overrides
//! are layered on top.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mirror.toml")).unwrap();
//! println!("Mirror will visit at most {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config, resolve_config, ConfigOverrides};
pub use validation::validate;
