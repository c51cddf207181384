//! Database operations for `tracked_products` and `price_history_points`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qcprice_core::{
    NewTrackedProduct, PlatformId, PriceHistoryPoint, ProductFilter, ProductRepository,
    ProductUpdate, RepositoryError, TrackedProduct,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `tracked_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub source_url: String,
    /// Lowercase platform id, e.g. `"blinkit"`.
    pub platform: String,
    pub current_price: Decimal,
    pub image_ref: Option<String>,
    pub category: String,
    pub is_available: bool,
    pub last_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `price_history_points` table. `id` order is insertion order.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceHistoryRow {
    pub id: i64,
    pub product_id: i64,
    pub price: Decimal,
    pub observed_at: DateTime<Utc>,
}

impl From<PriceHistoryRow> for PriceHistoryPoint {
    fn from(row: PriceHistoryRow) -> Self {
        PriceHistoryPoint {
            price: row.price,
            observed_at: row.observed_at,
        }
    }
}

impl ProductRow {
    /// Converts the row and its history into the domain type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidRow`] if `platform` is not a known platform id.
    pub fn into_tracked(
        self,
        price_history: Vec<PriceHistoryPoint>,
    ) -> Result<TrackedProduct, DbError> {
        let platform: PlatformId = self.platform.parse().map_err(|e| DbError::InvalidRow {
            table: "tracked_products",
            reason: format!("product {}: {e}", self.id),
        })?;

        Ok(TrackedProduct {
            id: self.id,
            name: self.name,
            source_url: self.source_url,
            platform,
            current_price: self.current_price,
            image_ref: self.image_ref,
            category: self.category,
            is_available: self.is_available,
            last_updated_at: self.last_updated_at,
            price_history,
        })
    }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Postgres-backed [`ProductRepository`].
#[derive(Debug, Clone)]
pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Lists every tracked product with its full history, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if either query fails, or
    /// [`DbError::InvalidRow`] for an unknown platform value.
    pub async fn list_products(&self) -> Result<Vec<TrackedProduct>, DbError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, source_url, platform, current_price, image_ref, category, \
                    is_available, last_updated_at, created_at \
             FROM tracked_products \
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let points = sqlx::query_as::<_, PriceHistoryRow>(
            "SELECT id, product_id, price, observed_at \
             FROM price_history_points \
             ORDER BY product_id, id",
        )
        .fetch_all(&self.pool)
        .await?;

        attach_history(rows, points)
    }

    /// Lists products matching `filter`, most recently updated first, each
    /// with its full history.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if either query fails, or
    /// [`DbError::InvalidRow`] for an unknown platform value.
    pub async fn list_products_filtered(
        &self,
        filter: &ProductFilter,
    ) -> Result<Vec<TrackedProduct>, DbError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, source_url, platform, current_price, image_ref, category, \
                    is_available, last_updated_at, created_at \
             FROM tracked_products \
             WHERE ($1::TEXT IS NULL OR platform = $1) \
               AND ($2::TEXT IS NULL OR category = $2) \
             ORDER BY last_updated_at DESC, id",
        )
        .bind(filter.platform.map(PlatformId::as_str))
        .bind(filter.category.as_deref())
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let points = sqlx::query_as::<_, PriceHistoryRow>(
            "SELECT id, product_id, price, observed_at \
             FROM price_history_points \
             WHERE product_id = ANY($1) \
             ORDER BY product_id, id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        attach_history(rows, points)
    }

    /// Deletes a product; its history goes with it through the cascading
    /// foreign key. Returns `false` when no product has `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the statement fails.
    pub async fn delete_product(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM tracked_products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fetches one product by `source_url`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if a query fails.
    pub async fn get_product_by_url(&self, url: &str) -> Result<Option<TrackedProduct>, DbError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, source_url, platform, current_price, image_ref, category, \
                    is_available, last_updated_at, created_at \
             FROM tracked_products \
             WHERE source_url = $1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        self.with_history(row).await
    }

    /// Fetches one product by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if a query fails.
    pub async fn get_product_by_id(&self, id: i64) -> Result<Option<TrackedProduct>, DbError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, source_url, platform, current_price, image_ref, category, \
                    is_available, last_updated_at, created_at \
             FROM tracked_products \
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        self.with_history(row).await
    }

    async fn with_history(
        &self,
        row: Option<ProductRow>,
    ) -> Result<Option<TrackedProduct>, DbError> {
        let Some(row) = row else {
            return Ok(None);
        };
        let points = self.list_price_history(row.id).await?;
        row.into_tracked(points).map(Some)
    }

    /// Returns a product's history in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn list_price_history(
        &self,
        product_id: i64,
    ) -> Result<Vec<PriceHistoryPoint>, DbError> {
        let rows = sqlx::query_as::<_, PriceHistoryRow>(
            "SELECT id, product_id, price, observed_at \
             FROM price_history_points \
             WHERE product_id = $1 \
             ORDER BY id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PriceHistoryPoint::from).collect())
    }

    /// Inserts a product and its initial history point in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if either insert fails; a duplicate
    /// `source_url` surfaces as a unique-violation database error.
    pub async fn insert_product(
        &self,
        product: &NewTrackedProduct,
    ) -> Result<TrackedProduct, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(
            "INSERT INTO tracked_products \
                 (name, source_url, platform, current_price, image_ref, category, \
                  is_available, last_updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, name, source_url, platform, current_price, image_ref, category, \
                       is_available, last_updated_at, created_at",
        )
        .bind(&product.name)
        .bind(&product.source_url)
        .bind(product.platform.as_str())
        .bind(product.price)
        .bind(&product.image_ref)
        .bind(&product.category)
        .bind(product.is_available)
        .bind(product.observed_at)
        .fetch_one(&mut *tx)
        .await?;

        let initial = product.initial_point();
        insert_point(&mut tx, row.id, initial).await?;

        tx.commit().await?;
        row.into_tracked(vec![initial])
    }

    /// Applies every staged delta inside one transaction. Deltas for ids that
    /// no longer exist are skipped. Returns the number of products updated.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if any statement fails; nothing is committed
    /// in that case.
    pub async fn apply_updates(&self, updates: &[ProductUpdate]) -> Result<usize, DbError> {
        let mut tx = self.pool.begin().await?;
        let mut applied = 0usize;

        for update in updates {
            let result = sqlx::query(
                "UPDATE tracked_products \
                 SET current_price = $2, is_available = $3, last_updated_at = $4 \
                 WHERE id = $1",
            )
            .bind(update.product_id)
            .bind(update.current_price)
            .bind(update.is_available)
            .bind(update.last_updated_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                continue;
            }
            if let Some(point) = update.appended_point {
                insert_point(&mut tx, update.product_id, point).await?;
            }
            applied += 1;
        }

        tx.commit().await?;
        Ok(applied)
    }
}

async fn insert_point(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    product_id: i64,
    point: PriceHistoryPoint,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO price_history_points (product_id, price, observed_at) \
         VALUES ($1, $2, $3)",
    )
    .bind(product_id)
    .bind(point.price)
    .bind(point.observed_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Groups `points` under their products, keeping row order.
fn attach_history(
    rows: Vec<ProductRow>,
    points: Vec<PriceHistoryRow>,
) -> Result<Vec<TrackedProduct>, DbError> {
    let mut history: HashMap<i64, Vec<PriceHistoryPoint>> = HashMap::new();
    for point in points {
        history.entry(point.product_id).or_default().push(point.into());
    }

    rows.into_iter()
        .map(|row| {
            let points = history.remove(&row.id).unwrap_or_default();
            row.into_tracked(points)
        })
        .collect()
}

fn is_unique_violation(err: &DbError) -> bool {
    matches!(err, DbError::Sqlx(sqlx::Error::Database(db)) if db.is_unique_violation())
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn find_all(&self) -> Result<Vec<TrackedProduct>, RepositoryError> {
        self.list_products().await.map_err(RepositoryError::backend)
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<TrackedProduct>, RepositoryError> {
        self.get_product_by_url(url)
            .await
            .map_err(RepositoryError::backend)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<TrackedProduct>, RepositoryError> {
        self.get_product_by_id(id)
            .await
            .map_err(RepositoryError::backend)
    }

    async fn list(&self, filter: &ProductFilter) -> Result<Vec<TrackedProduct>, RepositoryError> {
        self.list_products_filtered(filter)
            .await
            .map_err(RepositoryError::backend)
    }

    async fn insert(&self, product: NewTrackedProduct) -> Result<TrackedProduct, RepositoryError> {
        match self.insert_product(&product).await {
            Ok(tracked) => Ok(tracked),
            Err(e) if is_unique_violation(&e) => Err(RepositoryError::Conflict {
                source_url: product.source_url,
            }),
            Err(e) => Err(RepositoryError::backend(e)),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        match self.delete_product(id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(RepositoryError::NotFound { id }),
            Err(e) => Err(RepositoryError::backend(e)),
        }
    }

    async fn bulk_apply_updates(
        &self,
        updates: &[ProductUpdate],
    ) -> Result<usize, RepositoryError> {
        self.apply_updates(updates)
            .await
            .map_err(RepositoryError::backend)
    }
}
