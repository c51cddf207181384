//! Cross-platform search fan-out and price comparison.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use qcprice_core::{PlatformId, ScrapedItem, TrackedProduct};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::ScraperError;
use crate::extract::extract_search_results;
use crate::fetch::{Fetcher, PageKind};
use crate::platform::{profile, search_url_with_base};
use crate::relevance::RelevanceScorer;

/// Sends one query to every platform concurrently and keeps the top hit
/// from each.
pub struct SearchOrchestrator {
    fetcher: Arc<Fetcher>,
    scorer: RelevanceScorer,
    max_results: usize,
    base_urls: BTreeMap<PlatformId, String>,
}

impl SearchOrchestrator {
    #[must_use]
    pub fn new(fetcher: Arc<Fetcher>, scorer: RelevanceScorer, max_results: usize) -> Self {
        let base_urls = PlatformId::ALL
            .into_iter()
            .map(|p| (p, profile(p).base_url.to_owned()))
            .collect();
        Self {
            fetcher,
            scorer,
            max_results,
            base_urls,
        }
    }

    /// Sends searches for `platform` to `base` instead of its public origin.
    #[must_use]
    pub fn with_base_url(mut self, platform: PlatformId, base: impl Into<String>) -> Self {
        self.base_urls.insert(platform, base.into());
        self
    }

    /// Runs `query` against every platform and returns the most relevant
    /// result per platform.
    ///
    /// Platforms that fail or find nothing relevant are logged and omitted.
    /// All branches complete before this returns, and the browser session is
    /// released afterwards. A blank query returns an empty map without
    /// fetching anything.
    pub async fn search(&self, query: &str) -> BTreeMap<PlatformId, ScrapedItem> {
        let query = query.trim();
        if query.is_empty() {
            return BTreeMap::new();
        }

        let branches = PlatformId::ALL
            .into_iter()
            .map(|platform| async move { (platform, self.search_platform(platform, query).await) });
        let outcomes = join_all(branches).await;

        let mut results = BTreeMap::new();
        for (platform, outcome) in outcomes {
            match outcome {
                Ok(Some(item)) => {
                    results.insert(platform, item);
                }
                Ok(None) => {
                    tracing::info!(%platform, query, "no relevant results");
                }
                Err(e) => {
                    tracing::warn!(%platform, query, error = %e, "platform search failed");
                }
            }
        }

        self.fetcher.release().await;
        tracing::info!(query, platforms = results.len(), "search complete");
        results
    }

    async fn search_platform(
        &self,
        platform: PlatformId,
        query: &str,
    ) -> Result<Option<ScrapedItem>, ScraperError> {
        let base = self
            .base_urls
            .get(&platform)
            .map_or(profile(platform).base_url, String::as_str);
        let url = search_url_with_base(base, platform, query);

        let content = self.fetcher.fetch(&url, platform, PageKind::Search).await?;
        let ranked = extract_search_results(
            &content.body,
            profile(platform),
            query,
            &self.scorer,
            Utc::now(),
            self.max_results,
        );
        Ok(ranked.into_iter().next())
    }
}

/// Where a comparison candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Tracked,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonCandidate {
    pub platform: PlatformId,
    pub name: String,
    pub price: Decimal,
    pub source_url: String,
    pub image_ref: Option<String>,
    pub is_available: bool,
    pub observed_at: DateTime<Utc>,
    pub source: CandidateSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub query: String,
    /// Cheapest known candidate per platform.
    pub per_platform: BTreeMap<PlatformId, ComparisonCandidate>,
    /// Cheapest available candidate across platforms.
    pub best_deal: Option<ComparisonCandidate>,
}

/// Merges tracked products and fresh search hits into a per-platform price
/// comparison.
///
/// Tracked products are considered only when their name contains `query`
/// (case-insensitive). Per platform the cheapest candidate wins, with
/// tracked products considered first so a live hit must be strictly cheaper
/// to replace one. The best deal is the cheapest per-platform winner that is
/// available; ties go to the platform that sorts first.
#[must_use]
pub fn compare(
    query: &str,
    live: &BTreeMap<PlatformId, ScrapedItem>,
    tracked: &[TrackedProduct],
) -> Comparison {
    let needle = query.trim().to_lowercase();

    let tracked_candidates = tracked
        .iter()
        .filter(|p| !needle.is_empty() && p.name.to_lowercase().contains(&needle))
        .map(|p| ComparisonCandidate {
            platform: p.platform,
            name: p.name.clone(),
            price: p.current_price,
            source_url: p.source_url.clone(),
            image_ref: p.image_ref.clone(),
            is_available: p.is_available,
            observed_at: p.last_updated_at,
            source: CandidateSource::Tracked,
        });
    let live_candidates = live.values().filter_map(|item| {
        Some(ComparisonCandidate {
            platform: item.platform,
            name: item.name.clone(),
            price: item.price?,
            source_url: item.source_url.clone(),
            image_ref: item.image_ref.clone(),
            is_available: item.is_available,
            observed_at: item.observed_at,
            source: CandidateSource::Live,
        })
    });

    let mut per_platform: BTreeMap<PlatformId, ComparisonCandidate> = BTreeMap::new();
    for candidate in tracked_candidates.chain(live_candidates) {
        match per_platform.get(&candidate.platform) {
            Some(current) if current.price <= candidate.price => {}
            _ => {
                per_platform.insert(candidate.platform, candidate);
            }
        }
    }

    let best_deal = per_platform
        .values()
        .filter(|c| c.is_available)
        .fold(None::<&ComparisonCandidate>, |best, c| match best {
            Some(b) if b.price <= c.price => Some(b),
            _ => Some(c),
        })
        .cloned();

    Comparison {
        query: query.trim().to_owned(),
        per_platform,
        best_deal,
    }
}
