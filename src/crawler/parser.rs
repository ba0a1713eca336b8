//! Element reference discovery on list pages
//!
//! Finds every node matching the element locator on a list page and turns
//! its `href` into an absolute URL to follow. References without a usable
//! URL are reported back as skipped rather than failing the page.

use crate::crawler::fetcher::FetchedPage;
use scraper::Selector;
use url::Url;

/// Why an element reference was not followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The matched node has no `href` attribute
    MissingHref,

    /// The `href` does not resolve to an http(s) URL
    NotFollowable { href: String },
}

/// Element references found on one list page
#[derive(Debug, Clone, Default)]
pub struct ElementLinks {
    /// Absolute URLs to follow, in document order
    pub urls: Vec<Url>,

    /// References that were matched but not followed
    pub skipped: Vec<SkipReason>,
}

/// Extracts the element references matched by `selector` from a list page
///
/// Accepts relative hrefs as well as absolute ones: a relative link resolves
/// against the page's final URL instead of being skipped. Only http(s)
/// results are followed. Duplicates are kept: a listing that links the same
/// item twice yields two fetches.
///
/// # Example
///
/// ```no_run
/// use list_eater::crawler::{discover_element_links, FetchedPage};
/// use scraper::Selector;
/// use url::Url;
///
/// let page = FetchedPage::new(
///     Url::parse("https://example.com/list").unwrap(),
///     r#"<ul><li class="item"><a href="/items/1">One</a></li></ul>"#,
/// );
/// let links = discover_element_links(&page, &Selector::parse("li.item a").unwrap());
/// assert_eq!(links.urls[0].as_str(), "https://example.com/items/1");
/// ```
pub fn discover_element_links(page: &FetchedPage, selector: &Selector) -> ElementLinks {
    let document = page.document();
    let mut links = ElementLinks::default();

    for element in document.select(selector) {
        let href = match element.value().attr("href") {
            Some(href) => href,
            None => {
                links.skipped.push(SkipReason::MissingHref);
                continue;
            }
        };

        match resolve_link(href, &page.url) {
            Some(url) => links.urls.push(url),
            None => links.skipped.push(SkipReason::NotFollowable {
                href: href.to_string(),
            }),
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should not be followed:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel:, data: schemes
/// - anything that is not HTTP(S) after resolution
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url)
        }
        _ => None,
    }
}
