//! List-Eater: a crawler for paginated, optionally login-protected listings
//!
//! This crate walks the pages of a listing, follows every item link found on
//! each page, and streams the extracted items (or per-item errors) back to the
//! caller while the crawl is still running.

pub mod config;
pub mod crawler;
pub mod observe;

use thiserror::Error;

pub use crawler::{FetchError, PaginationError};

/// Main error type for List-Eater crawls
///
/// Every variant is fatal: the crawl stops and the error is returned to the
/// caller. Failures of individual items never show up here, they travel in
/// the result stream as [`ElementError`].
#[derive(Debug, Error)]
pub enum ListEaterError {
    #[error("Invalid config, missing crawl descriptor")]
    MissingCrawlConfig,

    #[error("Invalid crawl descriptor: {reason}")]
    InvalidCrawlConfig { reason: String },

    #[error("No login credentials provided, login needed")]
    NoLoginCredentials,

    #[error("Login rejected by {url} with status {status}")]
    LoginFailed { url: String, status: u16 },

    #[error("Login request to {url} failed: {source}")]
    LoginTransport { url: String, source: reqwest::Error },

    #[error("Failed to fetch list page {url}: {source}")]
    PageFetch { url: String, source: FetchError },

    #[error("Pagination error: {0}")]
    Pagination(#[from] PaginationError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Failed to load public suffix list: {0}")]
    SuffixList(#[from] publicsuffix::Error),

    #[error("Crawl cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
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

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// Error attached to a single element of the listing
///
/// These never abort a crawl; siblings and later pages are unaffected.
#[derive(Debug, Error)]
pub enum ElementError {
    #[error("Failed to fetch element {url}: {source}")]
    Fetch { url: String, source: FetchError },

    #[error("Failed to extract element {url}: {message}")]
    Extract { url: String, message: String },

    #[error("Element task for {url} did not complete: {message}")]
    TaskFailed { url: String, message: String },
}

/// Result type alias for List-Eater operations
pub type Result<T> = std::result::Result<T, ListEaterError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, CrawlDescriptor, Credentials, LoginDescriptor};
pub use crawler::{
    CrawlResult, EmbeddedNextPaginator, Extractor, FetchedPage, ListEater, PageTurn, Paginator,
    ResultSink, SelectorPaginator,
};
pub use observe::{CrawlEvent, CrawlObserver, CrawlStats, TracingObserver};
