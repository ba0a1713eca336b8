//! HTTP session for one crawl
//!
//! A [`Session`] owns the HTTP client and its cookie jar. It is created at
//! the start of a crawl, shared by every request the crawl makes (login,
//! list pages, and all concurrent element fetches), and dropped when the
//! crawl ends.

use crate::config::{Credentials, HttpConfig, LoginDescriptor};
use crate::{ListEaterError, Result};
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;
use url::Url;

const PUBLIC_SUFFIX_LIST: &str = include_str!("../../data/public_suffix_list.dat");

/// Parsed once per process, cloned into every session
fn public_suffixes() -> std::result::Result<publicsuffix::List, publicsuffix::Error> {
    static LIST: OnceLock<std::result::Result<publicsuffix::List, publicsuffix::Error>> =
        OnceLock::new();
    LIST.get_or_init(|| PUBLIC_SUFFIX_LIST.parse()).clone()
}

/// Cookie jar that refuses cookies scoped to a public suffix
///
/// A `Domain=co.uk` cookie set by `shop.co.uk` is dropped instead of being
/// sent to every other `*.co.uk` host. Everything else follows RFC 6265
/// domain and path matching.
pub struct CookieJar {
    store: RwLock<cookie_store::CookieStore>,
}

impl CookieJar {
    pub fn new(suffixes: publicsuffix::List) -> Self {
        Self {
            store: RwLock::new(cookie_store::CookieStore::new(Some(suffixes))),
        }
    }

    /// Stores one `Set-Cookie` value received from `url`
    ///
    /// Returns `false` if the cookie was rejected.
    pub fn insert(&self, set_cookie: &str, url: &Url) -> bool {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .parse(set_cookie, url)
            .is_ok()
    }

    /// The `Cookie` header value for a request to `url`
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let header = store
            .get_request_values(url)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");

        (!header.is_empty()).then_some(header)
    }
}

impl CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        for value in cookie_headers {
            if let Ok(set_cookie) = std::str::from_utf8(value.as_bytes()) {
                self.insert(set_cookie, url);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for(url)
            .and_then(|header| HeaderValue::from_str(&header).ok())
    }
}

impl fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieJar").finish_non_exhaustive()
    }
}

/// Cookie-preserving HTTP context of a crawl
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    jar: Arc<CookieJar>,
}

impl Session {
    /// Builds a fresh client with an empty cookie jar
    ///
    /// The jar is internally locked, so concurrent element fetches can read
    /// and update it.
    pub fn open(config: &HttpConfig) -> Result<Self> {
        let jar = Arc::new(CookieJar::new(public_suffixes()?));

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .cookie_provider(Arc::clone(&jar))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, jar })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Cookies the session would send to `url`, as a `Cookie` header value
    pub fn cookies_for(&self, url: &Url) -> Option<String> {
        self.jar.header_for(url)
    }

    /// Posts the credentials to the login form
    ///
    /// The response's cookies stay in the jar for the rest of the crawl.
    /// There is no retry: anything but `200 OK` is a failed login.
    pub async fn login(&self, login: &LoginDescriptor, credentials: &Credentials) -> Result<()> {
        let form = [
            (login.user_field.as_str(), credentials.user()),
            (login.password_field.as_str(), credentials.password()),
        ];

        let response = self
            .client
            .post(&login.url)
            .form(&form)
            .send()
            .await
            .map_err(|source| ListEaterError::LoginTransport {
                url: login.url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ListEaterError::LoginFailed {
                url: login.url.clone(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
