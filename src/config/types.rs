use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Main configuration structure for List-Eater
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Login form to submit before crawling (absent means anonymous crawl)
    #[serde(default)]
    pub login: Option<LoginDescriptor>,

    /// What to crawl
    #[serde(default)]
    pub crawl: Option<CrawlDescriptor>,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub extract: ExtractConfig,
}

/// Describes the login form of the target site
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginDescriptor {
    /// URL the login form is posted to
    pub url: String,

    /// Form field carrying the user name
    #[serde(rename = "user-field")]
    pub user_field: String,

    /// Form field carrying the password
    #[serde(rename = "password-field")]
    pub password_field: String,
}

impl LoginDescriptor {
    pub fn new(
        url: impl Into<String>,
        user_field: impl Into<String>,
        password_field: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            user_field: user_field.into(),
            password_field: password_field.into(),
        }
    }
}

/// Describes the listing to walk
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrawlDescriptor {
    /// First page of the listing
    #[serde(rename = "url")]
    pub list_url: String,

    /// CSS selector matching the item links on a list page
    pub element: String,

    /// CSS selector matching the "next page" control
    #[serde(default)]
    pub pagination: Option<String>,
}

impl CrawlDescriptor {
    pub fn new(list_url: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            list_url: list_url.into(),
            element: element.into(),
            pagination: None,
        }
    }

    /// Sets the selector of the "next page" control
    pub fn with_pagination(mut self, selector: impl Into<String>) -> Self {
        self.pagination = Some(selector.into());
        self
    }
}

/// HTTP session settings
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_user_agent() -> String {
    format!("list-eater/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

/// Field selectors used by the built-in selector extractor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractConfig {
    /// Output field name -> CSS selector
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// User name and password for the login form
///
/// The password is kept in a [`SecretString`] so it never shows up in
/// `Debug` output or log records.
pub struct Credentials {
    user: String,
    password: SecretString,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: SecretString::from(password.into()),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}
