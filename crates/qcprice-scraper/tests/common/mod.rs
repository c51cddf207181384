//! Shared fixtures for the scraper integration tests: an in-memory product
//! store, a scripted page renderer, and storefront HTML builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use qcprice_core::{
    is_storable_price, sort_newest_first, NewTrackedProduct, PlatformId, ProductFilter,
    ProductRepository, ProductUpdate, RepositoryError, TrackedProduct,
};
use qcprice_scraper::{profile, FetchConfig, Fetcher, PageRenderer, RenderRequest, ScraperError};

// ---------------------------------------------------------------------------
// Fetch configuration
// ---------------------------------------------------------------------------

/// Short timeouts, two navigation attempts, no retry delay.
pub fn test_fetch_config() -> FetchConfig {
    FetchConfig {
        timeout: Duration::from_secs(5),
        user_agent: "qcprice-test/0.1".to_owned(),
        browser_enabled: true,
        nav_timeout: Duration::from_secs(1),
        nav_attempts: 2,
        retry_delay: Duration::ZERO,
        wait: Duration::ZERO,
    }
}

pub fn test_fetcher(renderer: Arc<FakeRenderer>) -> Arc<Fetcher> {
    Arc::new(
        Fetcher::with_renderer(test_fetch_config(), renderer)
            .expect("failed to build test Fetcher"),
    )
}

// ---------------------------------------------------------------------------
// Fake renderer
// ---------------------------------------------------------------------------

/// Renderer that returns a fixed document, or fails every navigation when
/// constructed with [`FakeRenderer::failing`].
#[derive(Default)]
pub struct FakeRenderer {
    body: Option<String>,
    renders: AtomicU32,
    releases: AtomicU32,
}

impl FakeRenderer {
    pub fn returning(body: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            body: Some(body.into()),
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn renders(&self) -> u32 {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> u32 {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render(&self, request: &RenderRequest<'_>) -> Result<String, ScraperError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.body.clone().ok_or_else(|| ScraperError::Navigation {
            url: request.url.to_owned(),
            reason: "net::ERR_NAME_NOT_RESOLVED".to_owned(),
        })
    }

    async fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// In-memory repository
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryRepository {
    products: Mutex<Vec<TrackedProduct>>,
    fail_reads: AtomicBool,
    bulk_writes: AtomicU32,
    /// Ids are never reused, like a `BIGSERIAL`.
    next_id: AtomicI64,
}

impl InMemoryRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> Vec<TrackedProduct> {
        self.products.lock().unwrap().clone()
    }

    pub fn product(&self, id: i64) -> TrackedProduct {
        self.snapshot()
            .into_iter()
            .find(|p| p.id == id)
            .expect("product should exist")
    }

    pub fn bulk_writes(&self) -> u32 {
        self.bulk_writes.load(Ordering::SeqCst)
    }

    /// Makes every subsequent `find_all` fail with a backend error.
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProductRepository for InMemoryRepository {
    async fn find_all(&self) -> Result<Vec<TrackedProduct>, RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(RepositoryError::backend(std::io::Error::other(
                "connection refused",
            )));
        }
        Ok(self.snapshot())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<TrackedProduct>, RepositoryError> {
        Ok(self.snapshot().into_iter().find(|p| p.source_url == url))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TrackedProduct>, RepositoryError> {
        Ok(self.snapshot().into_iter().find(|p| p.id == id))
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<TrackedProduct>, RepositoryError> {
        let mut products: Vec<TrackedProduct> =
            self.snapshot().into_iter().filter(|p| filter.matches(p)).collect();
        sort_newest_first(&mut products);
        Ok(products)
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let mut products = self.products.lock().unwrap();
        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            return Err(RepositoryError::NotFound { id });
        }
        Ok(())
    }

    async fn insert(&self, product: NewTrackedProduct) -> Result<TrackedProduct, RepositoryError> {
        if !is_storable_price(product.price) {
            return Err(RepositoryError::backend(std::io::Error::other(
                "numeric field overflow",
            )));
        }
        let mut products = self.products.lock().unwrap();
        if products.iter().any(|p| p.source_url == product.source_url) {
            return Err(RepositoryError::Conflict {
                source_url: product.source_url,
            });
        }
        let tracked = TrackedProduct {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            price_history: vec![product.initial_point()],
            name: product.name,
            source_url: product.source_url,
            platform: product.platform,
            current_price: product.price,
            image_ref: product.image_ref,
            category: product.category,
            is_available: product.is_available,
            last_updated_at: product.observed_at,
        };
        products.push(tracked.clone());
        Ok(tracked)
    }

    async fn bulk_apply_updates(
        &self,
        updates: &[ProductUpdate],
    ) -> Result<usize, RepositoryError> {
        self.bulk_writes.fetch_add(1, Ordering::SeqCst);
        // Postgres rejects the whole transaction on a NUMERIC(12, 2) overflow.
        if updates.iter().any(|u| !is_storable_price(u.current_price)) {
            return Err(RepositoryError::backend(std::io::Error::other(
                "numeric field overflow",
            )));
        }
        let mut products = self.products.lock().unwrap();
        let mut applied = 0;
        for update in updates {
            if let Some(product) = products.iter_mut().find(|p| p.id == update.product_id) {
                update.apply_to(product);
                applied += 1;
            }
        }
        Ok(applied)
    }
}

// ---------------------------------------------------------------------------
// HTML builders
// ---------------------------------------------------------------------------

fn class(selector: &str) -> &str {
    selector.trim_start_matches('.')
}

/// A product page for `platform` using its own locators.
pub fn product_page(platform: PlatformId, name: &str, price: &str, in_stock: bool) -> String {
    let locators = &profile(platform).product_locators;
    let stock = if in_stock {
        String::new()
    } else {
        format!(r#"<div class="{}">Out of stock</div>"#, class(locators.out_of_stock))
    };
    format!(
        r#"<html><body>
             <h1 class="{name_class}">{name}</h1>
             <span class="{price_class}">{price}</span>
             {stock}
           </body></html>"#,
        name_class = class(locators.name),
        price_class = class(locators.price),
    )
}

/// A search-results page for `platform`; each entry is `(name, price, href)`.
pub fn search_page(platform: PlatformId, items: &[(&str, &str, &str)]) -> String {
    let locators = &profile(platform).search_locators;
    let body: String = items
        .iter()
        .map(|(name, price, href)| {
            format!(
                r#"<div class="{item}">
                     <a href="{href}">open</a>
                     <div class="{name_class}">{name}</div>
                     <div class="{price_class}">{price}</div>
                   </div>"#,
                item = class(locators.item),
                name_class = class(locators.name),
                price_class = class(locators.price),
            )
        })
        .collect();
    format!("<html><body>{body}</body></html>")
}

/// A client-rendered shell with no data in the initial HTML.
pub const EMPTY_SHELL: &str = r#"<html><body><div id="root"></div></body></html>"#;
