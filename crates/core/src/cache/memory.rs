//! In-memory page store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{CachedPage, PageStore};
use crate::Error;

/// In-memory cache of pages.
///
/// Uses a simple HashMap with tokio RwLock for concurrent access. Expired
/// entries are dropped lazily on lookup.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pages: Arc<RwLock<HashMap<String, CachedPage>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, including expired ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.pages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.pages.read().await.is_empty()
    }
}

#[async_trait]
impl PageStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CachedPage>, Error> {
        let now = Utc::now();
        {
            let pages = self.pages.read().await;
            match pages.get(key) {
                Some(page) if !page.is_expired(now) => return Ok(Some(page.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut pages = self.pages.write().await;
        if pages.get(key).is_some_and(|page| page.is_expired(now)) {
            pages.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, page: CachedPage) -> Result<(), Error> {
        let mut pages = self.pages.write().await;
        pages.insert(page.key.clone(), page);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        store
            .put(CachedPage::new("k", "<p>hi</p>", Duration::from_secs(60)))
            .await
            .unwrap();

        let page = store.get("k").await.unwrap().unwrap();
        assert_eq!(page.html, "<p>hi</p>");
        assert!(store.get("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted() {
        let store = MemoryStore::new();
        let mut page = CachedPage::new("k", "<p>old</p>", Duration::from_secs(60));
        page.expires_at = Utc::now() - chrono::Duration::seconds(1);
        store.put(page).await.unwrap();
        assert_eq!(store.len().await, 1);

        assert!(store.get("k").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }
}
