//! Pagination strategies
//!
//! A [`Paginator`] looks at the list page the engine just fetched and decides
//! whether another page follows. Paginators are stateless: the only thing
//! carried from one page to the next is the URL they return.

use crate::crawler::fetcher::FetchedPage;
use crate::crawler::parser::resolve_link;
use scraper::Selector;
use thiserror::Error;
use url::Url;

/// Errors that make the pagination control unusable
#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("Invalid selector for pagination: selector is empty")]
    EmptySelector,

    #[error("Invalid selector for pagination '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// Why pagination stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastPageReason {
    /// No "next" control on the page
    NoControl,

    /// A "next" control exists but carries no followable link
    ControlWithoutLink,

    /// The paginator never follows other pages
    SinglePage,
}

/// Outcome of evaluating a list page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTurn {
    /// Fetch this page next
    Next(Url),

    /// The listing ends here
    Last(LastPageReason),
}

/// Decides which list page, if any, follows the current one
pub trait Paginator: Send + Sync {
    fn paginate(&self, page: &FetchedPage) -> Result<PageTurn, PaginationError>;
}

/// Follows the `href` of the first node matching a CSS selector
///
/// A missing control, or one without a followable link, ends the crawl
/// cleanly. Only an empty or unparsable selector is an error.
#[derive(Debug, Clone)]
pub struct SelectorPaginator {
    selector: String,
}

impl SelectorPaginator {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    fn compile(&self) -> Result<Selector, PaginationError> {
        if self.selector.trim().is_empty() {
            return Err(PaginationError::EmptySelector);
        }
        Selector::parse(&self.selector).map_err(|e| PaginationError::InvalidSelector {
            selector: self.selector.clone(),
            message: format!("{:?}", e),
        })
    }
}

impl Paginator for SelectorPaginator {
    fn paginate(&self, page: &FetchedPage) -> Result<PageTurn, PaginationError> {
        let selector = self.compile()?;
        let document = page.document();

        let Some(control) = document.select(&selector).next() else {
            return Ok(PageTurn::Last(LastPageReason::NoControl));
        };

        let next = control
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, &page.url));

        Ok(match next {
            Some(url) => PageTurn::Next(url),
            None => PageTurn::Last(LastPageReason::ControlWithoutLink),
        })
    }
}

/// Follows the `rel="next"` link embedded in the list page itself
///
/// Looks for `<link rel="next">` first, then `<a rel="next">`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedNextPaginator;

impl Paginator for EmbeddedNextPaginator {
    fn paginate(&self, page: &FetchedPage) -> Result<PageTurn, PaginationError> {
        let document = page.document();

        for css in [r#"link[rel~="next"]"#, r#"a[rel~="next"]"#] {
            let selector = Selector::parse(css).map_err(|e| PaginationError::InvalidSelector {
                selector: css.to_string(),
                message: format!("{:?}", e),
            })?;

            if let Some(node) = document.select(&selector).next() {
                let next = node
                    .value()
                    .attr("href")
                    .and_then(|href| resolve_link(href, &page.url));
                return Ok(match next {
                    Some(url) => PageTurn::Next(url),
                    None => PageTurn::Last(LastPageReason::ControlWithoutLink),
                });
            }
        }

        Ok(PageTurn::Last(LastPageReason::NoControl))
    }
}

/// Never leaves the first page
#[derive(Debug, Clone, Copy, Default)]
pub struct SinglePage;

impl Paginator for SinglePage {
    fn paginate(&self, _page: &FetchedPage) -> Result<PageTurn, PaginationError> {
        Ok(PageTurn::Last(LastPageReason::SinglePage))
    }
}
