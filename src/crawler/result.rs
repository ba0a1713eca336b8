//! Result stream plumbing
//!
//! Extracted elements and per-element errors are multiplexed onto a single
//! channel and terminated by [`CrawlResult::Done`]. The channel is bounded:
//! a slow consumer throttles the crawl.

use crate::ElementError;
use tokio::sync::mpsc;

/// One item of the result stream
#[derive(Debug)]
pub enum CrawlResult<T> {
    /// A successfully extracted element
    Element(T),

    /// An element that could not be fetched or extracted
    Error(ElementError),

    /// No further results will be sent
    Done,
}

impl<T> CrawlResult<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, CrawlResult::Done)
    }

    pub fn element(&self) -> Option<&T> {
        match self {
            CrawlResult::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn into_element(self) -> Option<T> {
        match self {
            CrawlResult::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ElementError> {
        match self {
            CrawlResult::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// Producer side of the result stream
///
/// Cheap to clone; every per-element task holds one. Only the engine can
/// emit the terminal [`CrawlResult::Done`].
#[derive(Debug)]
pub struct ResultSink<T> {
    tx: mpsc::Sender<CrawlResult<T>>,
}

impl<T> Clone for ResultSink<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send> ResultSink<T> {
    /// Creates a sink and the receiver the caller must drain until `Done`
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<CrawlResult<T>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Sends an extracted element
    ///
    /// Returns `false` if the receiver is gone.
    pub async fn element(&self, element: T) -> bool {
        self.send(CrawlResult::Element(element)).await
    }

    /// Sends a per-element error
    pub async fn error(&self, error: ElementError) -> bool {
        self.send(CrawlResult::Error(error)).await
    }

    async fn send(&self, result: CrawlResult<T>) -> bool {
        self.tx.send(result).await.is_ok()
    }

    /// Whether the receiver is gone and results are being discarded
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Emits the terminal sentinel and releases this handle
    ///
    /// Returns `false` if the receiver is gone.
    pub(crate) async fn finish(self) -> bool {
        self.send(CrawlResult::Done).await
    }
}

impl<T> From<mpsc::Sender<CrawlResult<T>>> for ResultSink<T> {
    fn from(tx: mpsc::Sender<CrawlResult<T>>) -> Self {
        Self { tx }
    }
}
