//! Element extraction
//!
//! An [`Extractor`] turns one fetched element page into a result on the
//! stream. The engine calls it once per successfully fetched element, from
//! that element's own task.

use crate::config::ExtractConfig;
use crate::crawler::fetcher::FetchedPage;
use crate::crawler::result::ResultSink;
use crate::{ConfigError, ElementError};
use async_trait::async_trait;
use scraper::Selector;
use serde_json::{Map, Value};
use std::marker::PhantomData;

/// Produces structured data from an element page
///
/// Implementations should send exactly one result per call, success or
/// error. Sends wait for the consumer, so a slow consumer holds back the
/// page barrier.
#[async_trait]
pub trait Extractor: Send + Sync + 'static {
    type Item: Send + 'static;

    async fn extract(&self, page: FetchedPage, sink: &ResultSink<Self::Item>);
}

/// Extracts the trimmed text of one CSS selector per output field
///
/// Emits a JSON object keyed by field name. Fields whose selector matches
/// nothing are `null`; a page where no field matches is an error.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    fields: Vec<(String, Selector)>,
}

impl SelectorExtractor {
    pub fn new<I, K, V>(fields: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let fields = fields
            .into_iter()
            .map(|(name, css)| {
                let css = css.as_ref();
                Selector::parse(css)
                    .map(|selector| (name.into(), selector))
                    .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", css, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if fields.is_empty() {
            return Err(ConfigError::Validation(
                "selector extractor needs at least one field".to_string(),
            ));
        }

        Ok(Self { fields })
    }

    /// Builds the extractor from `[extract.fields]`, falling back to the page title
    pub fn from_config(config: &ExtractConfig) -> Result<Self, ConfigError> {
        if config.fields.is_empty() {
            Self::new([("title", "title")])
        } else {
            Self::new(&config.fields)
        }
    }

    fn extract_fields(&self, page: &FetchedPage) -> Result<Value, ElementError> {
        let document = page.document();
        let mut object = Map::new();
        let mut matched = 0;

        for (name, selector) in &self.fields {
            let text = document.select(selector).next().map(|node| {
                node.text()
                    .collect::<String>()
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            });
            if text.is_some() {
                matched += 1;
            }
            object.insert(name.clone(), text.map(Value::String).unwrap_or(Value::Null));
        }

        if matched == 0 {
            return Err(ElementError::Extract {
                url: page.url.to_string(),
                message: "no field selector matched".to_string(),
            });
        }

        Ok(Value::Object(object))
    }
}

#[async_trait]
impl Extractor for SelectorExtractor {
    type Item = Value;

    async fn extract(&self, page: FetchedPage, sink: &ResultSink<Value>) {
        match self.extract_fields(&page) {
            Ok(value) => sink.element(value).await,
            Err(error) => sink.error(error).await,
        };
    }
}

/// Adapts a plain function into an [`Extractor`]
///
/// `Ok(None)` sends nothing, for pages that legitimately carry no element.
pub struct FnExtractor<F, T> {
    extract: F,
    _item: PhantomData<fn() -> T>,
}

impl<F, T> FnExtractor<F, T>
where
    F: Fn(&FetchedPage) -> Result<Option<T>, String> + Send + Sync + 'static,
    T: Send + 'static,
{
    pub fn new(extract: F) -> Self {
        Self {
            extract,
            _item: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T> Extractor for FnExtractor<F, T>
where
    F: Fn(&FetchedPage) -> Result<Option<T>, String> + Send + Sync + 'static,
    T: Send + 'static,
{
    type Item = T;

    async fn extract(&self, page: FetchedPage, sink: &ResultSink<T>) {
        let outcome = (self.extract)(&page);
        match outcome {
            Ok(Some(element)) => {
                sink.element(element).await;
            }
            Ok(None) => {}
            Err(message) => {
                sink.error(ElementError::Extract {
                    url: page.url.to_string(),
                    message,
                })
                .await;
            }
        }
    }
}
