use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::platform::PlatformId;

/// Category assigned to products added without an explicit one.
pub const DEFAULT_CATEGORY: &str = "general";

/// Largest price the store can hold (`NUMERIC(12, 2)`): 9,999,999,999.99.
#[must_use]
pub fn max_storable_price() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Whether `price` fits the price columns: non-negative, at most two
/// fractional digits, and no larger than [`max_storable_price`].
#[must_use]
pub fn is_storable_price(price: Decimal) -> bool {
    !price.is_sign_negative() && price.scale() <= 2 && price <= max_storable_price()
}

/// A single normalized observation of a product on one platform.
///
/// Produced by the extraction engine and consumed immediately by its caller;
/// it is never persisted on its own, only folded into a [`TrackedProduct`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedItem {
    pub platform: PlatformId,
    pub name: String,
    /// Currency-agnostic price. `None` only when a caller builds an item by
    /// hand; the extraction engine never emits an item without a price.
    pub price: Option<Decimal>,
    pub image_ref: Option<String>,
    /// Absolute URL of the product page the observation came from.
    pub source_url: String,
    pub is_available: bool,
    pub observed_at: DateTime<Utc>,
    /// Present only on items produced from a search-results page.
    pub relevance_score: Option<f64>,
}

/// One immutable point in a product's price history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceHistoryPoint {
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
}

/// A product the user has asked to track, as owned by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedProduct {
    pub id: i64,
    pub name: String,
    /// Unique per product.
    pub source_url: String,
    pub platform: PlatformId,
    pub current_price: Decimal,
    pub image_ref: Option<String>,
    pub category: String,
    pub is_available: bool,
    pub last_updated_at: DateTime<Utc>,
    /// Insertion-ordered; only ever appended to.
    pub price_history: Vec<PriceHistoryPoint>,
}

impl TrackedProduct {
    /// Returns the most recently appended history point, if any.
    #[must_use]
    pub fn latest_point(&self) -> Option<&PriceHistoryPoint> {
        self.price_history.last()
    }

    /// Lowest price ever recorded for this product, including the current one.
    #[must_use]
    pub fn lowest_price(&self) -> Decimal {
        self.price_history
            .iter()
            .map(|p| p.price)
            .fold(self.current_price, Decimal::min)
    }
}

/// Narrows a product listing. Unset fields match every product; `category`
/// matches exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub platform: Option<PlatformId>,
    pub category: Option<String>,
}

impl ProductFilter {
    #[must_use]
    pub fn matches(&self, product: &TrackedProduct) -> bool {
        self.platform.map_or(true, |p| p == product.platform)
            && self
                .category
                .as_deref()
                .map_or(true, |c| c == product.category)
    }
}

/// Listing order: most recently updated first, ties by ascending id.
pub fn sort_newest_first(products: &mut [TrackedProduct]) {
    products.sort_by(|a, b| {
        b.last_updated_at
            .cmp(&a.last_updated_at)
            .then(a.id.cmp(&b.id))
    });
}

/// Insert shape for a product that passed its initial scrape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTrackedProduct {
    pub name: String,
    pub source_url: String,
    pub platform: PlatformId,
    pub price: Decimal,
    pub image_ref: Option<String>,
    pub category: String,
    pub is_available: bool,
    pub observed_at: DateTime<Utc>,
}

impl NewTrackedProduct {
    /// Builds the insert shape from a successful initial scrape.
    ///
    /// `name_override` wins over the scraped name when non-empty; a missing or
    /// empty `category` falls back to [`DEFAULT_CATEGORY`]. Returns `None` when
    /// the scrape carries no price, or one the store cannot hold.
    #[must_use]
    pub fn from_scrape(
        item: &ScrapedItem,
        name_override: Option<&str>,
        category: Option<&str>,
    ) -> Option<Self> {
        let price = item.price.filter(|p| is_storable_price(*p))?;
        let name = name_override
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&item.name)
            .to_owned();
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_owned();

        Some(Self {
            name,
            source_url: item.source_url.clone(),
            platform: item.platform,
            price,
            image_ref: item.image_ref.clone(),
            category,
            is_available: item.is_available,
            observed_at: item.observed_at,
        })
    }

    /// The first history point recorded for a newly added product.
    #[must_use]
    pub fn initial_point(&self) -> PriceHistoryPoint {
        PriceHistoryPoint {
            price: self.price,
            observed_at: self.observed_at,
        }
    }
}

/// A staged delta for one product, applied in a single batched write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub product_id: i64,
    pub current_price: Decimal,
    pub is_available: bool,
    pub last_updated_at: DateTime<Utc>,
    pub appended_point: Option<PriceHistoryPoint>,
}

/// History-merge policy: decides what a fresh observation changes on a product.
///
/// Price, availability, and the timestamp are refreshed on every observation
/// that carries a price. A history point is appended only when the observed
/// price differs from the product's current price. Returns `None` when the
/// observation has no price, leaving the product untouched.
#[must_use]
pub fn plan_update(product: &TrackedProduct, observed: &ScrapedItem) -> Option<ProductUpdate> {
    let price = observed.price?;

    let appended_point = (price != product.current_price).then_some(PriceHistoryPoint {
        price,
        observed_at: observed.observed_at,
    });

    Some(ProductUpdate {
        product_id: product.id,
        current_price: price,
        is_available: observed.is_available,
        last_updated_at: observed.observed_at,
        appended_point,
    })
}

impl ProductUpdate {
    /// Applies this delta to an in-memory product, mirroring what the
    /// repository does on `bulk_apply_updates`.
    pub fn apply_to(&self, product: &mut TrackedProduct) {
        product.current_price = self.current_price;
        product.is_available = self.is_available;
        product.last_updated_at = self.last_updated_at;
        if let Some(point) = self.appended_point {
            product.price_history.push(point);
        }
    }
}
