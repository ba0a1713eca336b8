//! Configuration module for List-Eater
//!
//! This module holds the crawl descriptors and handles loading, parsing,
//! and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use list_eater::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("list-eater.toml")).unwrap();
//! println!("Crawling from: {:?}", config.crawl.map(|c| c.list_url));
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlDescriptor, Credentials, ExtractConfig, HttpConfig, LoginDescriptor,
};

// Re-export parser and validation functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_crawl_descriptor, validate_login_descriptor};
