//! Command handlers for the CLI.
//!
//! Each handler prints its result to stdout, as text or as pretty JSON when
//! `--json` is set. Logs go to stderr.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Context;
use qcprice_core::{AppConfig, PlatformId, ProductFilter, ScrapedItem, TrackedProduct};
use qcprice_scraper::{
    extract_product, profile, resolve_platform, Comparison, FetchConfig, Fetcher, PageKind,
    PriceTracker, RelevanceScorer, SearchOrchestrator, UpdateReport,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Output {
    pub(crate) json: bool,
}

impl Output {
    fn emit<T: Serialize>(self, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", text());
        }
        Ok(())
    }
}

pub(crate) async fn run_add(
    tracker: &PriceTracker,
    url: &str,
    name: Option<&str>,
    category: Option<&str>,
    out: Output,
) -> anyhow::Result<()> {
    let product = tracker.add_product(url, name, category).await?;
    out.emit(&product, || {
        format!(
            "added #{}: {} on {} at ₹{}\n",
            product.id, product.name, product.platform, product.current_price
        )
    })
}

/// Scrapes a single product page without touching the database.
pub(crate) async fn run_scrape(config: &AppConfig, url: &str, out: Output) -> anyhow::Result<()> {
    let platform =
        resolve_platform(url).with_context(|| format!("unsupported platform for URL {url}"))?;
    let fetcher = Fetcher::new(FetchConfig::from_app_config(config))?;

    let fetched = fetcher.fetch(url, platform, PageKind::Product).await;
    fetcher.release().await;
    let content = fetched?;

    let item = extract_product(&content.body, profile(platform), url, chrono::Utc::now())
        .with_context(|| format!("no price or name found at {url}"))?;
    out.emit(&item, || format_item(&item))
}

/// Runs a cross-platform search without touching the database.
pub(crate) async fn run_search(config: &AppConfig, query: &str, out: Output) -> anyhow::Result<()> {
    let fetcher = Arc::new(Fetcher::new(FetchConfig::from_app_config(config))?);
    let search = SearchOrchestrator::new(
        fetcher,
        RelevanceScorer::default(),
        config.search_max_results,
    );
    let results = search.search(query).await;
    out.emit(&results, || format_search(query, &results))
}

pub(crate) async fn run_compare(
    tracker: &PriceTracker,
    query: &str,
    out: Output,
) -> anyhow::Result<()> {
    let comparison = tracker.compare(query).await?;
    out.emit(&comparison, || format_comparison(&comparison))
}

pub(crate) async fn run_update(tracker: &PriceTracker, out: Output) -> anyhow::Result<()> {
    let report = tracker.run_price_update_pass().await;
    out.emit(&report, || format_report(&report))?;
    if let Some(error) = report.error {
        anyhow::bail!("price update pass failed: {error}");
    }
    Ok(())
}

pub(crate) async fn run_history(
    tracker: &PriceTracker,
    id: i64,
    out: Output,
) -> anyhow::Result<()> {
    let product = tracker.price_history(id).await?;
    out.emit(&product, || format_history(&product))
}

pub(crate) async fn run_list(
    tracker: &PriceTracker,
    filter: &ProductFilter,
    out: Output,
) -> anyhow::Result<()> {
    let products = tracker.list_products(filter).await?;
    out.emit(&products, || format_list(&products))
}

pub(crate) async fn run_delete(tracker: &PriceTracker, id: i64, out: Output) -> anyhow::Result<()> {
    tracker.delete_product(id).await?;
    out.emit(&serde_json::json!({ "deleted": id }), || format!("removed #{id}\n"))
}

// ---------------------------------------------------------------------------
// Text formatting
// ---------------------------------------------------------------------------

fn availability(is_available: bool) -> &'static str {
    if is_available {
        "in stock"
    } else {
        "out of stock"
    }
}

fn format_item(item: &ScrapedItem) -> String {
    let price = item
        .price
        .map_or_else(|| "-".to_owned(), |p| format!("₹{p}"));
    format!(
        "{:<10} {:>10}  {} ({})\n           {}\n",
        item.platform,
        price,
        item.name,
        availability(item.is_available),
        item.source_url
    )
}

fn format_search(query: &str, results: &BTreeMap<PlatformId, ScrapedItem>) -> String {
    if results.is_empty() {
        return format!("no results for \"{query}\"\n");
    }
    results.values().map(format_item).collect()
}

fn format_comparison(comparison: &Comparison) -> String {
    let mut text = String::new();
    if comparison.per_platform.is_empty() {
        let _ = writeln!(text, "no prices found for \"{}\"", comparison.query);
        return text;
    }
    for candidate in comparison.per_platform.values() {
        let price = format!("₹{}", candidate.price);
        let _ = writeln!(
            text,
            "{:<10} {:>10}  {} ({})",
            candidate.platform,
            price,
            candidate.name,
            availability(candidate.is_available)
        );
    }
    match &comparison.best_deal {
        Some(best) => {
            let _ = writeln!(text, "best deal: {} at ₹{}", best.platform, best.price);
        }
        None => {
            let _ = writeln!(text, "best deal: none in stock");
        }
    }
    text
}

fn format_report(report: &UpdateReport) -> String {
    let mut text = format!(
        "updated {} product(s), {} failure(s)\n",
        report.updated_count,
        report.failures.len()
    );
    for failure in &report.failures {
        let _ = writeln!(
            text,
            "  #{} {}: {}",
            failure.product_id, failure.source_url, failure.reason
        );
    }
    text
}

fn format_list(products: &[TrackedProduct]) -> String {
    if products.is_empty() {
        return "no tracked products\n".to_owned();
    }
    let mut text = String::new();
    for product in products {
        let price = format!("₹{}", product.current_price);
        let _ = writeln!(
            text,
            "#{:<5} {:<10} {:>10}  {} [{}] ({})",
            product.id,
            product.platform,
            price,
            product.name,
            product.category,
            availability(product.is_available)
        );
    }
    text
}

fn format_history(product: &TrackedProduct) -> String {
    let mut text = format!(
        "#{} {} [{}] on {}\ncurrent ₹{} ({}), lowest ₹{}\n",
        product.id,
        product.name,
        product.category,
        product.platform,
        product.current_price,
        availability(product.is_available),
        product.lowest_price()
    );
    for point in &product.price_history {
        let _ = writeln!(
            text,
            "  {}  ₹{}",
            point.observed_at.format("%Y-%m-%d %H:%M UTC"),
            point.price
        );
    }
    text
}
