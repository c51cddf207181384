//! Field extraction from rendered storefront markup.
//!
//! Both entry points are pure over their inputs: a miss is `None` or an empty
//! `Vec`, never an error. Selectors that fail to parse count as a miss.

use chrono::{DateTime, Utc};
use qcprice_core::ScrapedItem;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fetch::PageKind;
use crate::platform::PlatformProfile;
use crate::price::parse_price;
use crate::relevance::RelevanceScorer;

/// Extracts a single product observation from a product page.
///
/// Returns `None` when the price is unparsable or the name is empty. A
/// missing image yields `image_ref: None`; an absent out-of-stock marker
/// means the product is available.
#[must_use]
pub fn extract_product(
    content: &str,
    profile: &PlatformProfile,
    source_url: &str,
    observed_at: DateTime<Utc>,
) -> Option<ScrapedItem> {
    let document = Html::parse_document(content);
    let root = document.root_element();
    let locators = &profile.product_locators;

    let price = select_text(root, locators.price).and_then(|raw| parse_price(&raw).value())?;
    let name = select_text(root, locators.name)?;
    let image_ref = select_image(root, locators.image, profile.base_url);
    let is_available = !matches_any(root, locators.out_of_stock);

    Some(ScrapedItem {
        platform: profile.platform,
        name,
        price: Some(price),
        image_ref,
        source_url: source_url.to_owned(),
        is_available,
        observed_at,
        relevance_score: None,
    })
}

/// Extracts ranked, relevant candidates from a search-results page.
///
/// Only the first `limit` item nodes are considered. An item is skipped when
/// its price does not parse, its name is empty, its link is missing or does
/// not resolve to an absolute `http(s)` URL, or the scorer deems it
/// irrelevant to `query`. Survivors are sorted by descending relevance; ties
/// keep page order.
#[must_use]
pub fn extract_search_results(
    content: &str,
    profile: &PlatformProfile,
    query: &str,
    scorer: &RelevanceScorer,
    observed_at: DateTime<Utc>,
    limit: usize,
) -> Vec<ScrapedItem> {
    let Some(item_selector) = selector(profile.search_locators.item) else {
        return Vec::new();
    };
    let Ok(base) = Url::parse(profile.base_url) else {
        tracing::warn!(platform = %profile.platform, "platform base URL does not parse");
        return Vec::new();
    };

    let document = Html::parse_document(content);
    let locators = &profile.search_locators;

    let mut results: Vec<ScrapedItem> = document
        .select(&item_selector)
        .take(limit)
        .filter_map(|node| {
            let price =
                select_text(node, locators.price).and_then(|raw| parse_price(&raw).value())?;
            let name = select_text(node, locators.name)?;
            let source_url = select_link(node, locators.link, &base)?;
            if !scorer.is_relevant(&name, query) {
                return None;
            }
            let relevance_score = scorer.score(&name, query);

            Some(ScrapedItem {
                platform: profile.platform,
                image_ref: select_image(node, locators.image, profile.base_url),
                is_available: !matches_any(node, profile.product_locators.out_of_stock),
                name,
                price: Some(price),
                source_url,
                observed_at,
                relevance_score: Some(relevance_score),
            })
        })
        .collect();

    // `sort_by` is stable.
    results.sort_by(|a, b| {
        let a = a.relevance_score.unwrap_or_default();
        let b = b.relevance_score.unwrap_or_default();
        b.total_cmp(&a)
    });
    results
}

/// Whether `content` carries enough data under the platform's locators to be
/// worth extracting. Used to decide if the plain-HTTP response suffices.
///
/// Product pages need a parsable price and a non-empty name; search pages
/// need at least one item node with both.
#[must_use]
pub(crate) fn has_usable_data(content: &str, profile: &PlatformProfile, kind: PageKind) -> bool {
    let document = Html::parse_document(content);
    let root = document.root_element();

    match kind {
        PageKind::Product => {
            let locators = &profile.product_locators;
            has_price_and_name(root, locators.price, locators.name)
        }
        PageKind::Search => {
            let locators = &profile.search_locators;
            let Some(item_selector) = selector(locators.item) else {
                return false;
            };
            root.select(&item_selector)
                .any(|node| has_price_and_name(node, locators.price, locators.name))
        }
    }
}

fn has_price_and_name(scope: ElementRef<'_>, price: &str, name: &str) -> bool {
    let priced = select_text(scope, price).is_some_and(|raw| parse_price(&raw).value().is_some());
    priced && select_text(scope, name).is_some()
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::warn!(selector = css, error = %e, "invalid CSS selector");
            None
        }
    }
}

fn matches_any(scope: ElementRef<'_>, css: &str) -> bool {
    selector(css).is_some_and(|sel| scope.select(&sel).next().is_some())
}

/// Whitespace-collapsed text of the first node matching `css`, if non-empty.
fn select_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    let sel = selector(css)?;
    let node = scope.select(&sel).next()?;
    let text = node.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// `href` of the first link node, resolved against `base`. Only absolute
/// `http(s)` results are accepted.
fn select_link(scope: ElementRef<'_>, css: &str, base: &Url) -> Option<String> {
    let sel = selector(css)?;
    let href = scope
        .select(&sel)
        .find_map(|node| node.value().attr("href"))
        .map(str::trim)
        .filter(|h| !h.is_empty())?;
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Image source of the first node matching `css`. The selector may point at
/// the `<img>` itself or at a wrapper containing one.
fn select_image(scope: ElementRef<'_>, css: &str, base: &str) -> Option<String> {
    let sel = selector(css)?;
    let node = scope.select(&sel).next()?;
    let src = node.value().attr("src").or_else(|| {
        let img = Selector::parse("img").ok()?;
        node.select(&img).find_map(|i| i.value().attr("src"))
    })?;
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    let resolved = Url::parse(base)
        .and_then(|b| b.join(src))
        .map_or_else(|_| src.to_owned(), |u| u.to_string());
    Some(resolved)
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
