use chrono::TimeZone;
use qcprice_core::PlatformId;
use rust_decimal::Decimal;

use super::*;
use crate::platform::profile;

fn observed() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

const PRODUCT_URL: &str = "https://blinkit.com/prn/amul-butter/prid/1";

fn blinkit_product_page(price: &str, extra: &str) -> String {
    format!(
        r#"<html><body>
            <h1 class="product-title">  Amul Butter
               500g </h1>
            <div class="product-price">{price}</div>
            <div class="product-image"><img src="/images/amul.jpg"></div>
            {extra}
        </body></html>"#
    )
}

// ---------------------------------------------------------------------------
// extract_product
// ---------------------------------------------------------------------------

#[test]
fn product_page_extracts_all_fields() {
    let html = blinkit_product_page("₹1,234.50", "");
    let item = extract_product(&html, profile(PlatformId::Blinkit), PRODUCT_URL, observed())
        .expect("expected an item");

    assert_eq!(item.platform, PlatformId::Blinkit);
    assert_eq!(item.name, "Amul Butter 500g");
    assert_eq!(item.price, Some(Decimal::new(123_450, 2)));
    assert_eq!(item.image_ref.as_deref(), Some("https://blinkit.com/images/amul.jpg"));
    assert_eq!(item.source_url, PRODUCT_URL);
    assert!(item.is_available);
    assert_eq!(item.observed_at, observed());
    assert!(item.relevance_score.is_none());
}

#[test]
fn product_page_out_of_stock_marker_flips_availability() {
    let html = blinkit_product_page("₹60", r#"<span class="out-of-stock">Sold out</span>"#);
    let item = extract_product(&html, profile(PlatformId::Blinkit), PRODUCT_URL, observed())
        .expect("expected an item");
    assert!(!item.is_available);
}

#[test]
fn product_page_without_image_has_no_image_ref() {
    let html = r#"<div class="product-title">Milk</div><div class="product-price">₹30</div>"#;
    let item = extract_product(html, profile(PlatformId::Blinkit), PRODUCT_URL, observed())
        .expect("expected an item");
    assert!(item.image_ref.is_none());
}

#[test]
fn product_page_unparsable_price_is_a_miss() {
    let html = blinkit_product_page("Price unavailable", "");
    let item = extract_product(&html, profile(PlatformId::Blinkit), PRODUCT_URL, observed());
    assert!(item.is_none());
}

#[test]
fn product_page_empty_name_is_a_miss() {
    let html = r#"<div class="product-title">   </div><div class="product-price">₹30</div>"#;
    assert!(extract_product(html, profile(PlatformId::Blinkit), PRODUCT_URL, observed()).is_none());
}

#[test]
fn product_page_uses_the_platform_locators() {
    let html = r#"<div class="prod-name">Fortune Oil 1L</div>
                  <div class="discnt-price">Rs 145</div>
                  <img class="product-img" src="https://cdn.bigbasket.com/oil.jpg">"#;
    let item = extract_product(
        html,
        profile(PlatformId::Bigbasket),
        "https://www.bigbasket.com/pd/1/oil/",
        observed(),
    )
    .expect("expected an item");
    assert_eq!(item.platform, PlatformId::Bigbasket);
    assert_eq!(item.price, Some(Decimal::from(145)));
    assert_eq!(item.image_ref.as_deref(), Some("https://cdn.bigbasket.com/oil.jpg"));

    // Blinkit selectors find nothing on this markup.
    assert!(extract_product(html, profile(PlatformId::Blinkit), PRODUCT_URL, observed()).is_none());
}

// ---------------------------------------------------------------------------
// extract_search_results
// ---------------------------------------------------------------------------

fn search_item(name: &str, price: &str, href: Option<&str>, extra: &str) -> String {
    let link = href.map_or(String::new(), |h| format!(r#"<a href="{h}">view</a>"#));
    format!(
        r#"<div class="product-item">
             {link}
             <div class="product-name">{name}</div>
             <div class="product-price">{price}</div>
             <div class="product-image"><img src="/img/{name}.png"></div>
             {extra}
           </div>"#
    )
}

fn search_page(items: &[String]) -> String {
    format!("<html><body>{}</body></html>", items.join("\n"))
}

fn run_search(html: &str, query: &str, limit: usize) -> Vec<ScrapedItem> {
    extract_search_results(
        html,
        profile(PlatformId::Blinkit),
        query,
        &RelevanceScorer::default(),
        observed(),
        limit,
    )
}

#[test]
fn search_results_are_ranked_by_relevance() {
    let html = search_page(&[
        search_item("Fresh Amul Butter Pack Of Two Extra Large", "₹520", Some("/prn/a/prid/1"), ""),
        search_item("Amul Butter", "₹56", Some("/prn/b/prid/2"), ""),
        search_item("Amul Butter 500g Pack", "₹275", Some("/prn/c/prid/3"), ""),
    ]);
    let results = run_search(&html, "amul butter", 5);

    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Amul Butter",
            "Amul Butter 500g Pack",
            "Fresh Amul Butter Pack Of Two Extra Large"
        ]
    );
    assert!(results.iter().all(|r| r.relevance_score.is_some()));
}

#[test]
fn search_results_resolve_relative_links_against_base() {
    let html = search_page(&[search_item("Amul Butter", "₹56", Some("/prn/b/prid/2"), "")]);
    let results = run_search(&html, "amul butter", 5);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source_url, "https://blinkit.com/prn/b/prid/2");
    assert_eq!(
        results[0].image_ref.as_deref(),
        Some("https://blinkit.com/img/Amul%20Butter.png")
    );
}

#[test]
fn search_results_skip_items_missing_link_price_or_relevance() {
    let html = search_page(&[
        search_item("Amul Butter No Link", "₹56", None, ""),
        search_item("Amul Butter No Price", "coming soon", Some("/p/1"), ""),
        search_item("Parle-G Biscuits", "₹10", Some("/p/2"), ""),
        search_item("Amul Butter Cube", "₹50", Some("javascript:void(0)"), ""),
        search_item("Amul Butter Keeper", "₹45", Some("/p/3"), ""),
    ]);
    let results = run_search(&html, "amul butter", 5);

    assert_eq!(results.len(), 1, "got: {results:?}");
    let item = &results[0];
    assert_eq!(item.name, "Amul Butter Keeper");
    assert!(item.source_url.starts_with("https://"));
    assert!(item.price.is_some());
}

#[test]
fn search_results_only_consider_first_limit_nodes() {
    let html = search_page(&[
        search_item("Parle-G Biscuits", "₹10", Some("/p/1"), ""),
        search_item("Britannia Bread", "₹40", Some("/p/2"), ""),
        search_item("Amul Butter", "₹56", Some("/p/3"), ""),
    ]);
    assert!(run_search(&html, "amul butter", 2).is_empty());
    assert_eq!(run_search(&html, "amul butter", 3).len(), 1);
}

#[test]
fn search_results_keep_page_order_on_ties() {
    let html = search_page(&[
        search_item("Amul Butter Red", "₹56", Some("/p/1"), ""),
        search_item("Amul Butter Blu", "₹57", Some("/p/2"), ""),
    ]);
    let results = run_search(&html, "amul butter", 5);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].name, "Amul Butter Red");
    assert_eq!(results[1].name, "Amul Butter Blu");
}

#[test]
fn search_item_with_out_of_stock_marker_is_unavailable() {
    let html = search_page(&[
        search_item("Amul Butter", "₹56", Some("/p/1"), r#"<span class="out-of-stock">x</span>"#),
        search_item("Amul Butter Tub", "₹99", Some("/p/2"), ""),
    ]);
    let results = run_search(&html, "amul butter", 5);
    let by_name = |n: &str| results.iter().find(|r| r.name == n).unwrap();
    assert!(!by_name("Amul Butter").is_available);
    assert!(by_name("Amul Butter Tub").is_available);
}

#[test]
fn search_page_without_items_is_empty() {
    assert!(run_search("<html><body><p>No results</p></body></html>", "amul", 5).is_empty());
}

// ---------------------------------------------------------------------------
// has_usable_data
// ---------------------------------------------------------------------------

#[test]
fn usable_product_needs_price_and_name() {
    let blinkit = profile(PlatformId::Blinkit);
    assert!(has_usable_data(&blinkit_product_page("₹60", ""), blinkit, PageKind::Product));
    assert!(!has_usable_data(&blinkit_product_page("n/a", ""), blinkit, PageKind::Product));
    assert!(!has_usable_data("<div id=\"root\"></div>", blinkit, PageKind::Product));
}

#[test]
fn usable_search_needs_one_priced_named_item() {
    let blinkit = profile(PlatformId::Blinkit);
    let html = search_page(&[search_item("Anything", "₹1", None, "")]);
    assert!(has_usable_data(&html, blinkit, PageKind::Search));
    let html = search_page(&[search_item("Anything", "soon", None, "")]);
    assert!(!has_usable_data(&html, blinkit, PageKind::Search));
}
