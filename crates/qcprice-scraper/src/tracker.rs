//! Entry points used by the CLI and the scheduler.

use std::collections::BTreeMap;
use std::sync::Arc;

use qcprice_core::{
    AppConfig, NewTrackedProduct, PlatformId, ProductFilter, ProductRepository, ScrapedItem,
    TrackedProduct,
};

use crate::error::{ScraperError, TrackerError};
use crate::fetch::{FetchConfig, Fetcher};
use crate::platform::resolve_platform;
use crate::relevance::RelevanceScorer;
use crate::search::{compare, Comparison, SearchOrchestrator};
use crate::update::{observe_product, PriceUpdateJob, UpdateReport};

/// Ties the fetcher, search fan-out, update job, and product store together.
pub struct PriceTracker {
    fetcher: Arc<Fetcher>,
    repository: Arc<dyn ProductRepository>,
    search: SearchOrchestrator,
    update_job: PriceUpdateJob,
}

impl PriceTracker {
    #[must_use]
    pub fn new(
        fetcher: Arc<Fetcher>,
        repository: Arc<dyn ProductRepository>,
        scorer: RelevanceScorer,
        max_results: usize,
    ) -> Self {
        let search = SearchOrchestrator::new(Arc::clone(&fetcher), scorer, max_results);
        let update_job = PriceUpdateJob::new(Arc::clone(&fetcher), Arc::clone(&repository));
        Self {
            fetcher,
            repository,
            search,
            update_job,
        }
    }

    /// Builds a tracker with a Chrome-backed fetcher and default relevance
    /// weights.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn from_app_config(
        config: &AppConfig,
        repository: Arc<dyn ProductRepository>,
    ) -> Result<Self, ScraperError> {
        let fetcher = Arc::new(Fetcher::new(FetchConfig::from_app_config(config))?);
        Ok(Self::new(
            fetcher,
            repository,
            RelevanceScorer::default(),
            config.search_max_results,
        ))
    }

    /// Routes searches for `platform` to `base` instead of its public origin.
    #[must_use]
    pub fn with_search_base_url(mut self, platform: PlatformId, base: impl Into<String>) -> Self {
        self.search = self.search.with_base_url(platform, base);
        self
    }

    /// Scrapes one product page. Failures are logged and reported as `None`.
    pub async fn scrape_product(&self, url: &str, platform: PlatformId) -> Option<ScrapedItem> {
        let observed = match observe_product(&self.fetcher, url, platform).await {
            Ok(Some(item)) => Some(item),
            Ok(None) => {
                tracing::warn!(url, %platform, "no price or name found on page");
                None
            }
            Err(e) => {
                tracing::warn!(url, %platform, error = %e, "product scrape failed");
                None
            }
        };
        self.fetcher.release().await;
        observed
    }

    pub async fn search_across_platforms(&self, query: &str) -> BTreeMap<PlatformId, ScrapedItem> {
        self.search.search(query).await
    }

    pub async fn run_price_update_pass(&self) -> UpdateReport {
        self.update_job.run().await
    }

    /// Starts tracking the product at `url` after one successful scrape.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::UnsupportedPlatform`] if `url` matches no platform.
    /// - [`TrackerError::RepositoryConflict`] if `url` is already tracked.
    /// - [`TrackerError::ScrapeFailed`] if the initial scrape yields nothing.
    /// - [`TrackerError::Repository`] on a store failure.
    pub async fn add_product(
        &self,
        url: &str,
        name_override: Option<&str>,
        category: Option<&str>,
    ) -> Result<TrackedProduct, TrackerError> {
        let url = url.trim();
        let platform = resolve_platform(url).ok_or_else(|| TrackerError::UnsupportedPlatform {
            url: url.to_owned(),
        })?;

        if self.repository.find_by_url(url).await?.is_some() {
            return Err(TrackerError::RepositoryConflict {
                url: url.to_owned(),
            });
        }

        let scraped = self
            .scrape_product(url, platform)
            .await
            .ok_or_else(|| TrackerError::ScrapeFailed {
                url: url.to_owned(),
            })?;
        let new_product = NewTrackedProduct::from_scrape(&scraped, name_override, category)
            .ok_or_else(|| TrackerError::ScrapeFailed {
                url: url.to_owned(),
            })?;

        let product = self.repository.insert(new_product).await?;
        tracing::info!(
            product_id = product.id,
            %platform,
            price = %product.current_price,
            "product added"
        );
        Ok(product)
    }

    /// Compares live search results with matching tracked products.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::EmptyQuery`] if `query` is blank.
    /// - [`TrackerError::Repository`] if tracked products cannot be loaded.
    pub async fn compare(&self, query: &str) -> Result<Comparison, TrackerError> {
        if query.trim().is_empty() {
            return Err(TrackerError::EmptyQuery);
        }
        let tracked = self.repository.find_all().await?;
        let live = self.search.search(query).await;
        Ok(compare(query, &live, &tracked))
    }

    /// Returns a tracked product with its full price history.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::ProductNotFound`] if no product has `id`.
    /// - [`TrackerError::Repository`] on a store failure.
    pub async fn price_history(&self, id: i64) -> Result<TrackedProduct, TrackerError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(TrackerError::ProductNotFound { id })
    }

    /// Lists tracked products matching `filter`, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::Repository`] on a store failure.
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<TrackedProduct>, TrackerError> {
        Ok(self.repository.list(filter).await?)
    }

    /// Stops tracking a product and drops its price history.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::ProductNotFound`] if no product has `id`.
    /// - [`TrackerError::Repository`] on a store failure.
    pub async fn delete_product(&self, id: i64) -> Result<(), TrackerError> {
        self.repository.delete(id).await?;
        tracing::info!(product_id = id, "product removed");
        Ok(())
    }

    /// Releases the browser session, if one is held.
    pub async fn release(&self) {
        self.fetcher.release().await;
    }
}
