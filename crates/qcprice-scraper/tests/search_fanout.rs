//! Integration tests for the cross-platform search fan-out. Each platform is
//! backed by its own `wiremock` server.

mod common;

use std::sync::Arc;

use qcprice_core::PlatformId;
use qcprice_scraper::{RelevanceScorer, SearchOrchestrator};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{search_page, test_fetcher, FakeRenderer, EMPTY_SHELL};

async fn platform_server(status: u16, body: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn orchestrator(renderer: Arc<FakeRenderer>) -> SearchOrchestrator {
    SearchOrchestrator::new(test_fetcher(renderer), RelevanceScorer::default(), 5)
}

#[tokio::test]
async fn failing_platforms_are_omitted_and_the_rest_returned() {
    let blinkit = platform_server(
        200,
        search_page(
            PlatformId::Blinkit,
            &[
                ("Parle-G Biscuits", "₹10", "/prn/parle/prid/1"),
                ("Amul Butter 100g", "₹58", "/prn/amul/prid/2"),
            ],
        ),
    )
    .await;
    let zepto = platform_server(
        200,
        search_page(PlatformId::Zepto, &[("Amul Butter", "₹52", "/pn/amul-butter")]),
    )
    .await;
    let bigbasket = platform_server(
        200,
        search_page(PlatformId::Bigbasket, &[("Amul Butter Pasteurised", "Rs 60", "/pd/1/")]),
    )
    .await;
    let swiggy = platform_server(500, "internal error".to_owned()).await;
    let dunzo = platform_server(200, EMPTY_SHELL.to_owned()).await;

    let renderer = FakeRenderer::failing();
    let search = orchestrator(Arc::clone(&renderer))
        .with_base_url(PlatformId::Blinkit, blinkit.uri())
        .with_base_url(PlatformId::Zepto, zepto.uri())
        .with_base_url(PlatformId::Bigbasket, bigbasket.uri())
        .with_base_url(PlatformId::Swiggy, swiggy.uri())
        .with_base_url(PlatformId::Dunzo, dunzo.uri());

    let results = search.search("amul butter").await;

    let platforms: Vec<PlatformId> = results.keys().copied().collect();
    assert_eq!(
        platforms,
        vec![PlatformId::Blinkit, PlatformId::Zepto, PlatformId::Bigbasket],
        "expected exactly the three healthy platforms, got: {results:?}"
    );

    let blinkit_hit = &results[&PlatformId::Blinkit];
    assert_eq!(blinkit_hit.name, "Amul Butter 100g");
    assert_eq!(blinkit_hit.source_url, "https://blinkit.com/prn/amul/prid/2");
    assert!(blinkit_hit.relevance_score.is_some());

    // Swiggy and Dunzo each exhaust two render attempts.
    assert_eq!(renderer.renders(), 4);
    assert_eq!(renderer.releases(), 1, "session must be released after the episode");
}

#[tokio::test]
async fn every_returned_item_has_link_price_and_score() {
    let blinkit = platform_server(
        200,
        search_page(PlatformId::Blinkit, &[("Amul Butter", "₹56", "/prn/a/prid/1")]),
    )
    .await;
    let renderer = FakeRenderer::failing();
    let mut search = orchestrator(renderer).with_base_url(PlatformId::Blinkit, blinkit.uri());
    for platform in [
        PlatformId::Zepto,
        PlatformId::Swiggy,
        PlatformId::Bigbasket,
        PlatformId::Dunzo,
    ] {
        search = search.with_base_url(platform, blinkit.uri());
    }

    let results = search.search("amul butter").await;

    assert!(!results.is_empty());
    for item in results.values() {
        assert!(item.source_url.starts_with("http"), "item: {item:?}");
        assert!(item.price.is_some(), "item: {item:?}");
        assert!(item.relevance_score.is_some(), "item: {item:?}");
    }
}

#[tokio::test]
async fn blank_query_fetches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let renderer = FakeRenderer::failing();
    let mut search = orchestrator(Arc::clone(&renderer));
    for platform in PlatformId::ALL {
        search = search.with_base_url(platform, server.uri());
    }

    assert!(search.search("   ").await.is_empty());
    assert_eq!(renderer.renders(), 0);
}
