//! Crawl observability
//!
//! The engine does not log on its own: it reports typed [`CrawlEvent`]s to
//! an injected [`CrawlObserver`]. [`TracingObserver`] (the default) turns
//! them into `tracing` records, and [`CrawlStats`] counts them.

mod stats;

pub use stats::{CrawlStats, StatsSnapshot};

use crate::crawler::{LastPageReason, SkipReason};
use crate::{ElementError, ListEaterError};
use std::sync::Arc;
use tokio::task::JoinError;
use url::Url;

/// Something that happened during a crawl
///
/// Credentials never appear in events.
#[derive(Debug)]
pub enum CrawlEvent<'a> {
    CrawlStarted { list_url: &'a Url },
    LoggedIn { url: &'a str },
    PageFetched { page: usize, url: &'a Url, elements: usize },
    ElementSkipped { page: usize, reason: &'a SkipReason },
    ElementFetched { url: &'a Url },
    ElementFailed { error: &'a ElementError },
    /// An element task ended without reporting a result
    ElementTaskAborted { error: &'a JoinError },
    NextPage { page: usize, url: &'a Url },
    PaginationEnded { page: usize, reason: LastPageReason },
    /// The result receiver was dropped before the crawl ended
    ResultsDiscarded,
    CrawlFinished { error: Option<&'a ListEaterError> },
}

/// Receives crawl events, possibly from many element tasks at once
pub trait CrawlObserver: Send + Sync {
    fn on_event(&self, event: &CrawlEvent<'_>);
}

impl<O: CrawlObserver + ?Sized> CrawlObserver for Arc<O> {
    fn on_event(&self, event: &CrawlEvent<'_>) {
        (**self).on_event(event)
    }
}

/// Logs every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn on_event(&self, event: &CrawlEvent<'_>) {
        match event {
            CrawlEvent::CrawlStarted { list_url } => {
                tracing::info!("Starting crawl at {}", list_url);
            }
            CrawlEvent::LoggedIn { url } => {
                tracing::info!("Successfully logged in at {}", url);
            }
            CrawlEvent::PageFetched {
                page,
                url,
                elements,
            } => {
                tracing::info!("Processing page {} ({}): {} elements", page, url, elements);
            }
            CrawlEvent::ElementSkipped { page, reason } => match reason {
                SkipReason::MissingHref => {
                    tracing::warn!("Page {}: element reference has no href", page);
                }
                SkipReason::NotFollowable { href } => {
                    tracing::warn!("Page {}: no followable url in href '{}'", page, href);
                }
            },
            CrawlEvent::ElementFetched { url } => {
                tracing::debug!("Fetched element {}", url);
            }
            CrawlEvent::ElementFailed { error } => {
                tracing::warn!("{}", error);
            }
            CrawlEvent::ElementTaskAborted { error } => {
                tracing::warn!("Element task ended abnormally: {}", error);
            }
            CrawlEvent::NextPage { page, url } => {
                tracing::debug!("Next page after page {}: {}", page, url);
            }
            CrawlEvent::PaginationEnded { page, reason } => match reason {
                LastPageReason::ControlWithoutLink => {
                    tracing::warn!(
                        "Page {}: pagination control has no followable link, stopping",
                        page
                    );
                }
                _ => tracing::info!("No more pages after page {}", page),
            },
            CrawlEvent::ResultsDiscarded => {
                tracing::debug!("Result receiver dropped, results were discarded");
            }
            CrawlEvent::CrawlFinished { error: None } => {
                tracing::info!("Crawl completed");
            }
            CrawlEvent::CrawlFinished { error: Some(error) } => {
                tracing::error!("Crawl aborted: {}", error);
            }
        }
    }
}

/// Forwards every event to several observers in order
#[derive(Clone, Default)]
pub struct FanoutObserver {
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl FanoutObserver {
    pub fn new(observers: Vec<Arc<dyn CrawlObserver>>) -> Self {
        Self { observers }
    }

    pub fn push(&mut self, observer: Arc<dyn CrawlObserver>) {
        self.observers.push(observer);
    }
}

impl CrawlObserver for FanoutObserver {
    fn on_event(&self, event: &CrawlEvent<'_>) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
