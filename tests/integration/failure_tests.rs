//! Crawls that hit configuration, login, page, element, or pagination failures

use crate::common::*;
use list_eater::crawler::{
    CrawlResult, FetchedPage, FnExtractor, ListEater, PaginationError, ResultSink,
    SelectorPaginator,
};
use list_eater::{CrawlDescriptor, ElementError, FetchError, ListEaterError, LoginDescriptor};
use list_eater::observe::{CrawlEvent, CrawlObserver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Notes whether the crawl reported discarded results
#[derive(Default)]
struct DiscardWatch(AtomicBool);

impl CrawlObserver for DiscardWatch {
    fn on_event(&self, event: &CrawlEvent<'_>) {
        if matches!(event, CrawlEvent::ResultsDiscarded) {
            self.0.store(true, Ordering::SeqCst);
        }
    }
}

/// Fails the test on drop if the crawl touched the network
async fn mount_no_traffic(server: &MockServer) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_missing_crawl_config_makes_no_request() {
    let server = MockServer::start().await;
    mount_no_traffic(&server).await;

    let eater = ListEater::new().with_login(LoginDescriptor::new(
        login_url(&server),
        USER_FIELD,
        PASSWORD_FIELD,
    ));
    let creds = credentials();

    let (outcome, results) = run_crawl(&eater, title_extractor(), Some(&creds)).await;

    assert!(matches!(outcome, Err(ListEaterError::MissingCrawlConfig)));
    assert_single_done(&results);
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_login_required_without_credentials() {
    let server = MockServer::start().await;
    mount_no_traffic(&server).await;

    let eater = ListEater::new()
        .with_login(LoginDescriptor::new(
            login_url(&server),
            USER_FIELD,
            PASSWORD_FIELD,
        ))
        .with_crawl(CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR));

    let (outcome, results) = run_crawl(&eater, title_extractor(), None).await;

    assert!(matches!(outcome, Err(ListEaterError::NoLoginCredentials)));
    assert_single_done(&results);
}

#[tokio::test]
async fn test_rejected_login_aborts_before_listing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let eater = ListEater::new()
        .with_login(LoginDescriptor::new(
            login_url(&server),
            USER_FIELD,
            PASSWORD_FIELD,
        ))
        .with_crawl(CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR));
    let wrong = list_eater::Credentials::new(USER, "wrong");

    let (outcome, results) = run_crawl(&eater, title_extractor(), Some(&wrong)).await;

    match outcome {
        Err(ListEaterError::LoginFailed { url, status }) => {
            assert_eq!(url, login_url(&server));
            assert_eq!(status, 401);
        }
        other => panic!("expected LoginFailed, got {:?}", other),
    }
    assert_single_done(&results);
}

#[tokio::test]
async fn test_unreachable_login_is_transport_error() {
    let eater = ListEater::new()
        .with_login(LoginDescriptor::new(
            "http://127.0.0.1:1/login",
            USER_FIELD,
            PASSWORD_FIELD,
        ))
        .with_crawl(CrawlDescriptor::new("http://127.0.0.1:1/thelist", ITEM_SELECTOR));
    let creds = credentials();

    let (outcome, results) = run_crawl(&eater, title_extractor(), Some(&creds)).await;

    assert!(matches!(
        outcome,
        Err(ListEaterError::LoginTransport { .. })
    ));
    assert_single_done(&results);
}

#[tokio::test]
async fn test_failed_element_does_not_affect_siblings() {
    let server = MockServer::start().await;
    let items = titles(17);
    let broken = &items[3];

    mount_list_pages(&server, &items, NextLink::Paginator, false).await;
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", ELEMENTS_PATH, broken)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let healthy: Vec<String> = items.iter().filter(|t| *t != broken).cloned().collect();
    mount_elements(&server, &healthy, false).await;

    let eater = ListEater::new().with_crawl(
        CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR).with_pagination(PAGINATOR_SELECTOR),
    );

    let (outcome, results) = run_crawl(&eater, title_extractor(), None).await;

    assert!(outcome.is_ok());
    assert_single_done(&results);
    assert_eq!(extracted(&results).len(), 16);

    let errors: Vec<&ElementError> = results.iter().filter_map(CrawlResult::error).collect();
    assert_eq!(errors.len(), 1);
    match errors[0] {
        ElementError::Fetch { url, source } => {
            assert!(url.ends_with(&format!("{}/{}", ELEMENTS_PATH, broken)));
            assert!(matches!(source, FetchError::Status { status: 500 }));
        }
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_second_page_aborts_crawl() {
    let server = MockServer::start().await;
    let base = server.uri();
    let items = titles(17);

    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("p", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_page(
            &base,
            &items[..ELEMENTS_PER_PAGE],
            Some(1),
            NextLink::Paginator,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("p", "1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_elements(&server, &items, false).await;

    let eater = ListEater::new().with_crawl(
        CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR).with_pagination(PAGINATOR_SELECTOR),
    );

    let (outcome, results) = run_crawl(&eater, title_extractor(), None).await;

    match outcome {
        Err(ListEaterError::PageFetch { url, source }) => {
            assert_eq!(url, format!("{}{}?p=1", base, LIST_PATH));
            assert_eq!(source.status(), Some(503));
        }
        other => panic!("expected PageFetch, got {:?}", other),
    }
    assert_single_done(&results);

    let found = extracted(&results);
    assert_eq!(found.len(), ELEMENTS_PER_PAGE);
    assert!(found.iter().all(|t| items[..ELEMENTS_PER_PAGE].contains(t)));
}

#[tokio::test]
async fn test_invalid_pagination_selector_aborts_after_first_page() {
    let server = MockServer::start().await;
    let items = titles(17);
    mount_list_pages(&server, &items, NextLink::Paginator, false).await;
    mount_elements(&server, &items, false).await;

    let eater = ListEater::new()
        .with_crawl(CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR))
        .with_paginator(SelectorPaginator::new(""));

    let (outcome, results) = run_crawl(&eater, title_extractor(), None).await;

    assert!(matches!(
        outcome,
        Err(ListEaterError::Pagination(PaginationError::EmptySelector))
    ));
    assert_single_done(&results);
    assert_eq!(extracted(&results).len(), ELEMENTS_PER_PAGE);
}

type PathFn = fn(&FetchedPage) -> Result<Option<String>, String>;

fn path_or_panic(page: &FetchedPage) -> Result<Option<String>, String> {
    if page.url.path().ends_with("item-01") {
        panic!("extractor blew up");
    }
    Ok(Some(page.url.path().to_string()))
}

#[tokio::test]
async fn test_panicking_extractor_is_reported_per_element() {
    let server = MockServer::start().await;
    let items = titles(4);
    mount_list_pages(&server, &items, NextLink::Paginator, false).await;
    mount_elements(&server, &items, false).await;

    let eater = ListEater::new().with_crawl(CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR));
    let extractor = Arc::new(FnExtractor::new(path_or_panic as PathFn));

    let (outcome, results) = run_crawl(&eater, extractor, None).await;

    assert!(outcome.is_ok());
    assert_single_done(&results);
    assert_eq!(extracted(&results).len(), 3);

    let errors: Vec<&ElementError> = results.iter().filter_map(CrawlResult::error).collect();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        errors[0],
        ElementError::TaskFailed { url, message }
            if url.ends_with("item-01") && message == "extractor blew up"
    ));
}

#[tokio::test]
async fn test_cancellation_stops_slow_crawl() {
    let server = MockServer::start().await;
    let items = titles(3);
    mount_list_pages(&server, &items, NextLink::Paginator, false).await;
    Mock::given(method("GET"))
        .and(path(format!("{}/{}", ELEMENTS_PATH, items[0])))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(element_page(&items[0]))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    mount_elements(&server, &items[1..], false).await;

    let eater = ListEater::new().with_crawl(CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let (sink, mut rx) = ResultSink::channel(4);
    let collect = async {
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    };

    let (outcome, results) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(
            eater.crawl_with_cancel(sink, title_extractor(), None, cancel),
            collect
        )
    })
    .await
    .expect("cancelled crawl should return promptly");

    assert!(matches!(outcome, Err(ListEaterError::Cancelled)));
    assert_single_done(&results);
    assert!(extracted(&results).len() <= 2);
}

#[tokio::test]
async fn test_dropped_receiver_does_not_block_crawl() {
    let server = MockServer::start().await;
    let items = titles(10);
    mount_list_pages(&server, &items, NextLink::Paginator, false).await;
    mount_elements(&server, &items, false).await;

    let discarded = Arc::new(DiscardWatch::default());
    let eater = ListEater::new()
        .with_crawl(
            CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR)
                .with_pagination(PAGINATOR_SELECTOR),
        )
        .with_observer(discarded.clone());
    let (sink, rx) = ResultSink::channel(1);
    drop(rx);

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        eater.crawl(sink, title_extractor(), None),
    )
    .await
    .expect("crawl should not wait on a dropped receiver");

    assert!(outcome.is_ok());
    assert!(discarded.0.load(Ordering::SeqCst));
}
