//! Crawl engine - main crawl orchestration logic
//!
//! [`ListEater`] drives one crawl at a time:
//! 1. Validates the crawl descriptor (no network activity on failure)
//! 2. Opens a cookie-preserving session and logs in if a login form is set
//! 3. Walks the list pages strictly in pagination order
//! 4. For each page, spawns one fetch+extract task per element reference and
//!    waits for all of them before asking the paginator for the next page
//! 5. Emits the terminal `Done` result exactly once, whatever the outcome

use crate::config::{
    validate_crawl_descriptor, Config, CrawlDescriptor, Credentials, HttpConfig, LoginDescriptor,
};
use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::fetch_page;
use crate::crawler::paginator::{EmbeddedNextPaginator, PageTurn, Paginator, SelectorPaginator};
use crate::crawler::parser::discover_element_links;
use crate::crawler::result::ResultSink;
use crate::crawler::session::Session;
use crate::observe::{CrawlEvent, CrawlObserver, TracingObserver};
use crate::{ElementError, ListEaterError, Result};
use futures::FutureExt;
use reqwest::Client;
use scraper::Selector;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Crawler for a paginated listing
///
/// Descriptors are fixed at construction; each call to [`ListEater::crawl`]
/// gets its own session, so one `ListEater` can run several crawls.
pub struct ListEater {
    login: Option<LoginDescriptor>,
    crawl: Option<CrawlDescriptor>,
    http: HttpConfig,
    paginator: Option<Arc<dyn Paginator>>,
    observer: Arc<dyn CrawlObserver>,
}

/// Everything a crawl needs that can be checked before touching the network
struct CrawlPlan {
    start: Url,
    element: Selector,
    paginator: Arc<dyn Paginator>,
}

/// One element reference to fetch and extract
struct ElementTask<E: Extractor> {
    url: Url,
    client: Client,
    extractor: Arc<E>,
    sink: ResultSink<E::Item>,
    observer: Arc<dyn CrawlObserver>,
    cancel: CancellationToken,
}

impl Default for ListEater {
    fn default() -> Self {
        Self::new()
    }
}

impl ListEater {
    /// Creates an engine with no descriptors and a `tracing` observer
    pub fn new() -> Self {
        Self {
            login: None,
            crawl: None,
            http: HttpConfig::default(),
            paginator: None,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Creates an engine from a loaded configuration file
    pub fn from_config(config: &Config) -> Self {
        Self {
            login: config.login.clone(),
            crawl: config.crawl.clone(),
            http: config.http.clone(),
            ..Self::new()
        }
    }

    pub fn with_login(mut self, login: LoginDescriptor) -> Self {
        self.login = Some(login);
        self
    }

    pub fn with_crawl(mut self, crawl: CrawlDescriptor) -> Self {
        self.crawl = Some(crawl);
        self
    }

    pub fn with_http(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }

    /// Overrides the paginator derived from the crawl descriptor
    pub fn with_paginator(mut self, paginator: impl Paginator + 'static) -> Self {
        self.paginator = Some(Arc::new(paginator));
        self
    }

    pub fn with_observer(mut self, observer: impl CrawlObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Runs a complete crawl, streaming results into `sink`
    ///
    /// The caller must keep draining the receiver until
    /// [`CrawlResult::Done`](crate::CrawlResult::Done) arrives. `Done` is
    /// sent on every exit path, so a returned error and the sentinel both
    /// need checking.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Every page was walked; per-element failures are in the stream
    /// * `Err(ListEaterError)` - The crawl was aborted
    pub async fn crawl<E: Extractor>(
        &self,
        sink: ResultSink<E::Item>,
        extractor: Arc<E>,
        credentials: Option<&Credentials>,
    ) -> Result<()> {
        self.crawl_with_cancel(sink, extractor, credentials, CancellationToken::new())
            .await
    }

    /// Same as [`ListEater::crawl`], stopping early once `cancel` fires
    ///
    /// Cancellation interrupts in-flight page fetches, element fetches, and
    /// extractions, then returns [`ListEaterError::Cancelled`].
    pub async fn crawl_with_cancel<E: Extractor>(
        &self,
        sink: ResultSink<E::Item>,
        extractor: Arc<E>,
        credentials: Option<&Credentials>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let outcome = self.run(&sink, &extractor, credentials, &cancel).await;
        if sink.is_closed() {
            self.observer.on_event(&CrawlEvent::ResultsDiscarded);
        }
        self.observer.on_event(&CrawlEvent::CrawlFinished {
            error: outcome.as_ref().err(),
        });
        sink.finish().await;
        outcome
    }

    async fn run<E: Extractor>(
        &self,
        sink: &ResultSink<E::Item>,
        extractor: &Arc<E>,
        credentials: Option<&Credentials>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let CrawlPlan {
            start,
            element,
            paginator,
        } = self.plan()?;

        let login = match &self.login {
            Some(login) => Some((
                login,
                credentials.ok_or(ListEaterError::NoLoginCredentials)?,
            )),
            None => None,
        };

        self.observer
            .on_event(&CrawlEvent::CrawlStarted { list_url: &start });

        let session = Session::open(&self.http)?;

        if let Some((login, credentials)) = login {
            until_cancelled(cancel, session.login(login, credentials)).await??;
            self.observer
                .on_event(&CrawlEvent::LoggedIn { url: &login.url });
        }

        let mut next = Some(start);
        let mut page_no = 0;

        while let Some(url) = next.take() {
            page_no += 1;

            let page = until_cancelled(cancel, fetch_page(session.client(), url.clone()))
                .await?
                .map_err(|source| ListEaterError::PageFetch {
                    url: url.to_string(),
                    source,
                })?;

            let links = discover_element_links(&page, &element);
            self.observer.on_event(&CrawlEvent::PageFetched {
                page: page_no,
                url: &page.url,
                elements: links.urls.len(),
            });
            for reason in &links.skipped {
                self.observer.on_event(&CrawlEvent::ElementSkipped {
                    page: page_no,
                    reason,
                });
            }

            self.fan_out(links.urls, &session, sink, extractor, cancel)
                .await?;

            match paginator.paginate(&page)? {
                PageTurn::Next(next_url) => {
                    self.observer.on_event(&CrawlEvent::NextPage {
                        page: page_no,
                        url: &next_url,
                    });
                    next = Some(next_url);
                }
                PageTurn::Last(reason) => {
                    self.observer.on_event(&CrawlEvent::PaginationEnded {
                        page: page_no,
                        reason,
                    });
                }
            }
        }

        Ok(())
    }

    /// Checks the crawl descriptor and compiles what the page loop needs
    fn plan(&self) -> Result<CrawlPlan> {
        let crawl = self
            .crawl
            .as_ref()
            .ok_or(ListEaterError::MissingCrawlConfig)?;

        validate_crawl_descriptor(crawl).map_err(|e| ListEaterError::InvalidCrawlConfig {
            reason: e.to_string(),
        })?;

        let start =
            Url::parse(&crawl.list_url).map_err(|e| ListEaterError::InvalidCrawlConfig {
                reason: format!("invalid list url '{}': {}", crawl.list_url, e),
            })?;

        let element =
            Selector::parse(&crawl.element).map_err(|e| ListEaterError::InvalidCrawlConfig {
                reason: format!("invalid element selector '{}': {:?}", crawl.element, e),
            })?;

        let paginator: Arc<dyn Paginator> = match (&self.paginator, &crawl.pagination) {
            (Some(paginator), _) => Arc::clone(paginator),
            (None, Some(selector)) => Arc::new(SelectorPaginator::new(selector.clone())),
            (None, None) => Arc::new(EmbeddedNextPaginator),
        };

        Ok(CrawlPlan {
            start,
            element,
            paginator,
        })
    }

    /// Fetches and extracts every element of one page concurrently
    ///
    /// Returns once every task has finished. Element failures go to the
    /// result stream; only cancellation aborts the page.
    async fn fan_out<E: Extractor>(
        &self,
        urls: Vec<Url>,
        session: &Session,
        sink: &ResultSink<E::Item>,
        extractor: &Arc<E>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut tasks = JoinSet::new();

        for url in urls {
            tasks.spawn(follow_element(ElementTask {
                url,
                client: session.client().clone(),
                extractor: Arc::clone(extractor),
                sink: sink.clone(),
                observer: Arc::clone(&self.observer),
                cancel: cancel.child_token(),
            }));
        }

        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                joined = tasks.join_next() => Some(joined),
            };

            match joined {
                None => {
                    tasks.shutdown().await;
                    return Err(ListEaterError::Cancelled);
                }
                Some(None) => return Ok(()),
                Some(Some(Ok(()))) => {}
                Some(Some(Err(error))) => {
                    self.observer
                        .on_event(&CrawlEvent::ElementTaskAborted { error: &error });
                }
            }
        }
    }
}

/// Fetches one element page and hands it to the extractor
///
/// A failed fetch becomes an error result instead of an extractor call. A
/// panicking extractor is reported as [`ElementError::TaskFailed`].
async fn follow_element<E: Extractor>(task: ElementTask<E>) {
    let ElementTask {
        url,
        client,
        extractor,
        sink,
        observer,
        cancel,
    } = task;

    let work = {
        let url = url.clone();
        let sink = sink.clone();
        let observer = Arc::clone(&observer);
        async move {
            match fetch_page(&client, url.clone()).await {
                Ok(page) => {
                    observer.on_event(&CrawlEvent::ElementFetched { url: &url });
                    extractor.extract(page, &sink).await;
                }
                Err(source) => {
                    let error = ElementError::Fetch {
                        url: url.to_string(),
                        source,
                    };
                    observer.on_event(&CrawlEvent::ElementFailed { error: &error });
                    sink.error(error).await;
                }
            }
        }
    };

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        outcome = AssertUnwindSafe(work).catch_unwind() => outcome,
    };

    if let Err(panic) = outcome {
        let error = ElementError::TaskFailed {
            url: url.to_string(),
            message: panic_message(panic.as_ref()),
        };
        observer.on_event(&CrawlEvent::ElementFailed { error: &error });
        sink.error(error).await;
    }
}

async fn until_cancelled<F: Future>(cancel: &CancellationToken, future: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ListEaterError::Cancelled),
        output = future => Ok(output),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "extractor panicked".to_string()
    }
}
