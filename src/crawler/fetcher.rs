//! HTTP fetcher implementation
//!
//! Every fetch in a crawl (list pages and element pages) goes through
//! [`fetch_page`]. The response body is read exactly once into a
//! [`FetchedPage`], which can then be handed to element discovery,
//! pagination, and extraction without touching the network again.

use reqwest::{Client, StatusCode};
use scraper::Html;
use thiserror::Error;
use url::Url;

/// Why a fetch did not produce a usable page
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never got a response (DNS, connect, TLS, timeout, ...)
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The server answered with anything other than 200 OK
    #[error("unexpected HTTP status {status}")]
    Status { status: u16 },

    /// The response started but its body could not be read
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),
}

impl FetchError {
    /// HTTP status of the failed response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status } => Some(*status),
            FetchError::Transport(e) | FetchError::Body(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

/// A fetched page with its body fully buffered in memory
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects, used as the base for relative links
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Page body content
    pub body: String,
}

impl FetchedPage {
    /// Builds a page from an already available body
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            status: StatusCode::OK.as_u16(),
            content_type: Some("text/html".to_string()),
            body: body.into(),
        }
    }

    /// Parses the buffered body as an HTML document
    ///
    /// `Html` is not `Send`, so callers should parse, query, and drop the
    /// document without holding it across an `.await`.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Fetches a URL and buffers the body
///
/// Only `200 OK` counts as success. Redirects are followed by the client.
///
/// # Arguments
///
/// * `client` - The session's HTTP client
/// * `url` - The URL to fetch
pub async fn fetch_page(client: &Client, url: Url) -> Result<FetchedPage, FetchError> {
    let response = client.get(url).send().await.map_err(FetchError::Transport)?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(FetchError::Status {
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response.text().await.map_err(FetchError::Body)?;

    Ok(FetchedPage {
        url: final_url,
        status: status.as_u16(),
        content_type,
        body,
    })
}
