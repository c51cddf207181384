//! The persistence seam the tracking engine depends on.
//!
//! The engine only reads product state and writes back staged deltas; how the
//! store indexes or queries products is the implementor's concern.

use async_trait::async_trait;
use thiserror::Error;

use crate::products::{NewTrackedProduct, ProductFilter, ProductUpdate, TrackedProduct};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("a product with source URL {source_url} is already tracked")]
    Conflict { source_url: String },

    #[error("product {id} not found")]
    NotFound { id: i64 },

    #[error("repository backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl RepositoryError {
    /// Wraps any backend error (driver, pool, migration) as [`RepositoryError::Backend`].
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Product store used by the tracker.
///
/// Implementations must treat [`ProductRepository::bulk_apply_updates`] as a
/// single batched write: either every delta lands or none do.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Every tracked product with its full price history.
    async fn find_all(&self) -> Result<Vec<TrackedProduct>, RepositoryError>;

    async fn find_by_url(&self, url: &str) -> Result<Option<TrackedProduct>, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<TrackedProduct>, RepositoryError>;

    /// Products matching `filter`, most recently updated first (ties by id).
    async fn list(&self, filter: &ProductFilter) -> Result<Vec<TrackedProduct>, RepositoryError>;

    /// Inserts a product together with its initial history point.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] when the source URL is already tracked.
    async fn insert(&self, product: NewTrackedProduct) -> Result<TrackedProduct, RepositoryError>;

    /// Removes a product and its history.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when no product has `id`.
    async fn delete(&self, id: i64) -> Result<(), RepositoryError>;

    /// Applies every staged delta in one write. Returns the number of products
    /// that were mutated.
    async fn bulk_apply_updates(
        &self,
        updates: &[ProductUpdate],
    ) -> Result<usize, RepositoryError>;
}
