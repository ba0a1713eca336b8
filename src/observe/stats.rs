//! Crawl statistics gathered from observer events

use crate::observe::{CrawlEvent, CrawlObserver};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free event counters for one or more crawls
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages: AtomicU64,
    elements_found: AtomicU64,
    elements_skipped: AtomicU64,
    elements_fetched: AtomicU64,
    element_failures: AtomicU64,
    crawls_aborted: AtomicU64,
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// List pages fetched
    pub pages: u64,

    /// Followable element references dispatched
    pub elements_found: u64,

    /// Element references without a usable URL
    pub elements_skipped: u64,

    /// Element pages fetched and handed to the extractor
    pub elements_fetched: u64,

    /// Element fetches that failed
    pub element_failures: u64,

    /// Crawls that ended with a fatal error
    pub crawls_aborted: u64,
}

impl CrawlStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages: self.pages.load(Ordering::Relaxed),
            elements_found: self.elements_found.load(Ordering::Relaxed),
            elements_skipped: self.elements_skipped.load(Ordering::Relaxed),
            elements_fetched: self.elements_fetched.load(Ordering::Relaxed),
            element_failures: self.element_failures.load(Ordering::Relaxed),
            crawls_aborted: self.crawls_aborted.load(Ordering::Relaxed),
        }
    }
}

impl CrawlObserver for CrawlStats {
    fn on_event(&self, event: &CrawlEvent<'_>) {
        match event {
            CrawlEvent::PageFetched { elements, .. } => {
                self.pages.fetch_add(1, Ordering::Relaxed);
                self.elements_found
                    .fetch_add(*elements as u64, Ordering::Relaxed);
            }
            CrawlEvent::ElementSkipped { .. } => {
                self.elements_skipped.fetch_add(1, Ordering::Relaxed);
            }
            CrawlEvent::ElementFetched { .. } => {
                self.elements_fetched.fetch_add(1, Ordering::Relaxed);
            }
            CrawlEvent::ElementFailed { .. } | CrawlEvent::ElementTaskAborted { .. } => {
                self.element_failures.fetch_add(1, Ordering::Relaxed);
            }
            CrawlEvent::CrawlFinished { error: Some(_) } => {
                self.crawls_aborted.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pages crawled:      {}", self.pages)?;
        writeln!(f, "Elements found:     {}", self.elements_found)?;
        writeln!(f, "Elements fetched:   {}", self.elements_fetched)?;
        writeln!(f, "Element failures:   {}", self.element_failures)?;
        write!(f, "References skipped: {}", self.elements_skipped)
    }
}
