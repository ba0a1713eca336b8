//! End-to-end crawls that are expected to succeed

use crate::common::*;
use list_eater::crawler::{ListEater, SelectorExtractor};
use list_eater::observe::{CrawlStats, FanoutObserver, TracingObserver};
use list_eater::{CrawlDescriptor, LoginDescriptor};
use std::collections::BTreeSet;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn login_eater(server: &MockServer) -> ListEater {
    ListEater::new()
        .with_login(LoginDescriptor::new(
            login_url(server),
            USER_FIELD,
            PASSWORD_FIELD,
        ))
        .with_crawl(
            CrawlDescriptor::new(list_url(server), ITEM_SELECTOR)
                .with_pagination(PAGINATOR_SELECTOR),
        )
}

#[tokio::test]
async fn test_login_crawl_streams_every_element() {
    let server = MockServer::start().await;
    let items = titles(17);
    mount_login(&server).await;
    mount_list_pages(&server, &items, NextLink::Paginator, true).await;
    mount_elements(&server, &items, true).await;

    let stats = Arc::new(CrawlStats::default());
    let eater = login_eater(&server).with_observer(stats.clone());

    let creds = credentials();
    let (outcome, results) = run_crawl(&eater, title_extractor(), Some(&creds)).await;

    outcome.expect("crawl should succeed");
    assert_single_done(&results);
    assert_eq!(results.len(), items.len() + 1);

    let found: BTreeSet<String> = extracted(&results).into_iter().collect();
    let expected: BTreeSet<String> = items.iter().cloned().collect();
    assert_eq!(found, expected);

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.pages, 3);
    assert_eq!(snapshot.elements_found, 17);
    assert_eq!(snapshot.elements_fetched, 17);
    assert_eq!(snapshot.element_failures, 0);
    assert_eq!(snapshot.crawls_aborted, 0);
}

#[tokio::test]
async fn test_anonymous_crawl_without_login_descriptor() {
    let server = MockServer::start().await;
    let items = titles(5);
    mount_list_pages(&server, &items, NextLink::Paginator, false).await;
    mount_elements(&server, &items, false).await;

    let eater = ListEater::new().with_crawl(
        CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR).with_pagination(PAGINATOR_SELECTOR),
    );

    let (outcome, results) = run_crawl(&eater, title_extractor(), None).await;

    assert!(outcome.is_ok());
    assert_single_done(&results);
    assert_eq!(extracted(&results).len(), 5);
}

#[tokio::test]
async fn test_embedded_next_links_are_followed() {
    let server = MockServer::start().await;
    let items = titles(20);
    mount_list_pages(&server, &items, NextLink::Embedded, false).await;
    mount_elements(&server, &items, false).await;

    // No pagination selector: the engine follows rel="next"
    let eater = ListEater::new().with_crawl(CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR));

    let (outcome, results) = run_crawl(&eater, title_extractor(), None).await;

    assert!(outcome.is_ok());
    assert_single_done(&results);
    assert_eq!(extracted(&results).len(), 20);
}

#[tokio::test]
async fn test_pagination_control_without_href_ends_cleanly() {
    let server = MockServer::start().await;
    let base = server.uri();
    let items = titles(2);

    let body = list_page(&base, &items, None, NextLink::Paginator)
        .replace(r#"id="thepaginator">"#, r#"id="thepaginator"><a class="disabled">NEXT</a>"#);
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(query_param("p", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    mount_elements(&server, &items, false).await;

    let eater = ListEater::new().with_crawl(
        CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR).with_pagination(PAGINATOR_SELECTOR),
    );

    let (outcome, results) = run_crawl(&eater, title_extractor(), None).await;

    assert!(outcome.is_ok());
    assert_eq!(extracted(&results).len(), 2);
}

#[tokio::test]
async fn test_references_without_url_are_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();
    let items = titles(3);

    let body = list_page(&base, &items, None, NextLink::Paginator).replace(
        r#"<div id="thelist">"#,
        r#"<div id="thelist"><li class="listitem"><a>no link</a></li><li class="listitem"><a href="javascript:void(0)">js</a></li>"#,
    );
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    mount_elements(&server, &items, false).await;

    let stats = Arc::new(CrawlStats::default());
    let mut observer = FanoutObserver::default();
    observer.push(stats.clone());
    observer.push(Arc::new(TracingObserver));
    let eater = ListEater::new()
        .with_crawl(CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR))
        .with_observer(observer);

    let (outcome, results) = run_crawl(&eater, title_extractor(), None).await;

    assert!(outcome.is_ok());
    assert_single_done(&results);
    assert_eq!(results.len(), 4);
    assert_eq!(stats.snapshot().elements_skipped, 2);
    assert_eq!(stats.snapshot().elements_found, 3);
}

#[tokio::test]
async fn test_empty_listing_only_sends_done() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;

    let eater = ListEater::new().with_crawl(CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR));

    let (outcome, results) = run_crawl(&eater, title_extractor(), None).await;

    assert!(outcome.is_ok());
    assert_eq!(results.len(), 1);
    assert!(results[0].is_done());
}

#[tokio::test]
async fn test_repeated_crawls_yield_same_titles() {
    let server = MockServer::start().await;
    let items = titles(17);
    mount_login(&server).await;
    mount_list_pages(&server, &items, NextLink::Paginator, true).await;
    mount_elements(&server, &items, true).await;

    let eater = login_eater(&server);
    let creds = credentials();

    let (first_outcome, first) = run_crawl(&eater, title_extractor(), Some(&creds)).await;
    let (second_outcome, second) = run_crawl(&eater, title_extractor(), Some(&creds)).await;

    assert!(first_outcome.is_ok());
    assert!(second_outcome.is_ok());

    let first: BTreeSet<String> = extracted(&first).into_iter().collect();
    let second: BTreeSet<String> = extracted(&second).into_iter().collect();
    assert_eq!(first.len(), 17);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_selector_extractor_emits_json() {
    let server = MockServer::start().await;
    let items = titles(9);
    mount_list_pages(&server, &items, NextLink::Paginator, false).await;
    mount_elements(&server, &items, false).await;

    let extractor = Arc::new(
        SelectorExtractor::new([("title", "#title"), ("desc", "#desc")]).unwrap(),
    );
    let eater = ListEater::new().with_crawl(
        CrawlDescriptor::new(list_url(&server), ITEM_SELECTOR).with_pagination(PAGINATOR_SELECTOR),
    );

    let (outcome, results) = run_crawl(&eater, extractor, None).await;

    assert!(outcome.is_ok());
    let values = extracted(&results);
    assert_eq!(values.len(), 9);
    let first = values
        .iter()
        .find(|v| v["title"] == "item-00")
        .expect("item-00 extracted");
    assert_eq!(first["desc"], "description of item-00");
}
