//! Scheduled re-scrape of every tracked product.

use std::sync::Arc;

use chrono::Utc;
use qcprice_core::{
    is_storable_price, plan_update, PlatformId, ProductRepository, RepositoryError, ScrapedItem,
};
use serde::Serialize;

use crate::error::ScraperError;
use crate::extract::extract_product;
use crate::fetch::{Fetcher, PageKind};
use crate::platform::profile;

/// A product that could not be refreshed during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateFailure {
    pub product_id: i64,
    pub source_url: String,
    pub reason: String,
}

/// Outcome of one update pass. A pass never fails as a whole: a
/// pass-level error is carried in `error`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateReport {
    /// Products mutated by the batched write.
    pub updated_count: usize,
    pub failures: Vec<UpdateFailure>,
    pub error: Option<String>,
}

impl UpdateReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.failures.is_empty()
    }
}

/// Fetches and extracts one product page.
///
/// `Ok(None)` means the page loaded but carried no usable price or name.
pub(crate) async fn observe_product(
    fetcher: &Fetcher,
    url: &str,
    platform: PlatformId,
) -> Result<Option<ScrapedItem>, ScraperError> {
    let content = fetcher.fetch(url, platform, PageKind::Product).await?;
    Ok(extract_product(
        &content.body,
        profile(platform),
        url,
        Utc::now(),
    ))
}

pub struct PriceUpdateJob {
    fetcher: Arc<Fetcher>,
    repository: Arc<dyn ProductRepository>,
}

impl PriceUpdateJob {
    #[must_use]
    pub fn new(fetcher: Arc<Fetcher>, repository: Arc<dyn ProductRepository>) -> Self {
        Self {
            fetcher,
            repository,
        }
    }

    /// Re-scrapes every tracked product in turn and applies the resulting
    /// deltas in one batched write.
    ///
    /// Per-product failures are recorded in the report and skipped, including
    /// observed prices the store cannot hold, so one bad page never rolls
    /// back the batched write. A repository error aborts the pass with
    /// `updated_count = 0` and the error text in `error`. The browser session
    /// is released on every path.
    pub async fn run(&self) -> UpdateReport {
        let started = std::time::Instant::now();
        let report = match self.run_pass().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "price update pass failed");
                UpdateReport {
                    updated_count: 0,
                    failures: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        };
        self.fetcher.release().await;

        tracing::info!(
            updated = report.updated_count,
            failed = report.failures.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "price update pass finished"
        );
        report
    }

    async fn run_pass(&self) -> Result<UpdateReport, RepositoryError> {
        let products = self.repository.find_all().await?;
        tracing::info!(products = products.len(), "starting price update pass");

        let mut staged = Vec::with_capacity(products.len());
        let mut failures = Vec::new();

        for product in &products {
            let observation =
                observe_product(&self.fetcher, &product.source_url, product.platform).await;
            let reason = match observation {
                Ok(Some(observed)) => match plan_update(product, &observed) {
                    Some(update) if !is_storable_price(update.current_price) => {
                        format!(
                            "price {} is outside the storable range",
                            update.current_price
                        )
                    }
                    Some(update) => {
                        if update.appended_point.is_some() {
                            tracing::info!(
                                product_id = product.id,
                                old_price = %product.current_price,
                                new_price = %update.current_price,
                                "price changed"
                            );
                        }
                        staged.push(update);
                        continue;
                    }
                    None => "observation carried no price".to_owned(),
                },
                Ok(None) => "no price or name found on page".to_owned(),
                Err(e) => e.to_string(),
            };

            tracing::warn!(
                product_id = product.id,
                url = %product.source_url,
                reason = %reason,
                "skipping product"
            );
            failures.push(UpdateFailure {
                product_id: product.id,
                source_url: product.source_url.clone(),
                reason,
            });
        }

        let updated_count = if staged.is_empty() {
            0
        } else {
            self.repository.bulk_apply_updates(&staged).await?
        };

        Ok(UpdateReport {
            updated_count,
            failures,
            error: None,
        })
    }
}
