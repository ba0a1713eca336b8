use crate::config::types::{Config, CrawlDescriptor, ExtractConfig, HttpConfig, LoginDescriptor};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
///
/// A file that is meant to drive a crawl must carry a `[crawl]` section.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let crawl = config
        .crawl
        .as_ref()
        .ok_or_else(|| ConfigError::Validation("missing [crawl] section".to_string()))?;
    validate_crawl_descriptor(crawl)?;
    if let Some(login) = &config.login {
        validate_login_descriptor(login)?;
    }
    validate_http_config(&config.http)?;
    validate_extract_config(&config.extract)?;
    Ok(())
}

/// Validates a crawl descriptor
///
/// Checks the list URL is an absolute http(s) URL and that every selector
/// parses. Used both by config loading and by the engine before any network
/// activity.
pub fn validate_crawl_descriptor(crawl: &CrawlDescriptor) -> Result<(), ConfigError> {
    if crawl.list_url.trim().is_empty() {
        return Err(ConfigError::Validation("crawl url cannot be empty".to_string()));
    }
    validate_http_url(&crawl.list_url, "crawl url")?;

    if crawl.element.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawl element selector cannot be empty".to_string(),
        ));
    }
    validate_selector(&crawl.element)?;

    if let Some(pagination) = &crawl.pagination {
        validate_selector(pagination)?;
    }

    Ok(())
}

/// Validates a login descriptor
pub fn validate_login_descriptor(login: &LoginDescriptor) -> Result<(), ConfigError> {
    validate_http_url(&login.url, "login url")?;

    if login.user_field.is_empty() || login.password_field.is_empty() {
        return Err(ConfigError::Validation(
            "login user-field and password-field cannot be empty".to_string(),
        ));
    }

    if login.user_field == login.password_field {
        return Err(ConfigError::Validation(format!(
            "login user-field and password-field must differ, both are '{}'",
            login.user_field
        )));
    }

    Ok(())
}

fn validate_http_config(http: &HttpConfig) -> Result<(), ConfigError> {
    if http.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if http.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_extract_config(extract: &ExtractConfig) -> Result<(), ConfigError> {
    for (field, selector) in &extract.fields {
        if field.is_empty() {
            return Err(ConfigError::Validation(
                "extract field name cannot be empty".to_string(),
            ));
        }
        validate_selector(selector)?;
    }
    Ok(())
}

fn validate_http_url(raw: &str, what: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, raw
        )));
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::InvalidSelector(
            "selector cannot be empty".to_string(),
        ));
    }
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))?;
    Ok(())
}
