//! Crawler module for walking paginated listings
//!
//! This module contains the core crawling logic, including:
//! - The per-crawl HTTP session and login
//! - Single-read page fetching
//! - Element reference discovery on list pages
//! - Pagination strategies
//! - Element extraction and the result stream
//! - The crawl engine tying it all together

mod engine;
mod extractor;
mod fetcher;
mod paginator;
mod parser;
mod result;
mod session;

pub use engine::ListEater;
pub use extractor::{Extractor, FnExtractor, SelectorExtractor};
pub use fetcher::{fetch_page, FetchError, FetchedPage};
pub use paginator::{
    EmbeddedNextPaginator, LastPageReason, PageTurn, PaginationError, Paginator,
    SelectorPaginator, SinglePage,
};
pub use parser::{discover_element_links, ElementLinks, SkipReason};
pub use result::{CrawlResult, ResultSink};
pub use session::{CookieJar, Session};
