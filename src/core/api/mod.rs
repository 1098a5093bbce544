//! Remote collection and catalog APIs.
//!
//! The controller only depends on the two traits below; [`HttpApi`] is the
//! reqwest implementation used by the binary. Tests substitute mocks.

mod error;
mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::models::{BookPage, BookUpdate, CatalogHit, NewBook, PageQuery};

pub use error::{ApiError, ApiResult, RETRY_HINT};
pub use http::HttpApi;

/// CRUD access to the user's saved books.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollectionApi: Send + Sync {
    /// Fetch one page of the collection under the given filters.
    async fn list_books(&self, query: &PageQuery) -> ApiResult<BookPage>;

    /// Create a record. Returns the new id when the server reports one.
    async fn create_book(&self, book: &NewBook) -> ApiResult<Option<i64>>;

    /// Update status and rating of an existing record.
    async fn update_book(&self, id: i64, update: &BookUpdate) -> ApiResult<()>;

    async fn delete_book(&self, id: i64) -> ApiResult<()>;
}

/// Lookups against the external book catalog.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Free-text title search.
    async fn search(&self, query: &str) -> ApiResult<Vec<CatalogHit>>;

    /// Work description for a catalog key, normalized to plain text.
    /// `Ok(None)` when the work has no description.
    async fn summary(&self, key: &str) -> ApiResult<Option<String>>;
}

/// Shared handles to both APIs.
#[derive(Clone)]
pub struct Backends {
    pub collection: Arc<dyn CollectionApi>,
    pub catalog: Arc<dyn CatalogApi>,
}

impl Backends {
    pub fn new(collection: Arc<dyn CollectionApi>, catalog: Arc<dyn CatalogApi>) -> Self {
        Self {
            collection,
            catalog,
        }
    }

    /// Both APIs served by one HTTP client.
    pub fn http(api: HttpApi) -> Self {
        let api = Arc::new(api);
        Self {
            collection: api.clone(),
            catalog: api,
        }
    }
}
