//! Storage seam behind the cache gateway.

use async_trait::async_trait;
use chrono::Utc;

use super::{CacheDb, CachedPage};
use crate::Error;

/// Backend holding fetched pages.
///
/// Implementations own expiry; `get` must never return an expired page.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Look up a fresh page by key.
    async fn get(&self, key: &str) -> Result<Option<CachedPage>, Error>;

    /// Store a page, replacing any previous entry for the key.
    async fn put(&self, page: CachedPage) -> Result<(), Error>;
}

#[async_trait]
impl PageStore for CacheDb {
    async fn get(&self, key: &str) -> Result<Option<CachedPage>, Error> {
        self.get_fresh_page(key).await
    }

    async fn put(&self, page: CachedPage) -> Result<(), Error> {
        if page.is_expired(Utc::now()) {
            return Ok(());
        }
        self.upsert_page(&page).await
    }
}
