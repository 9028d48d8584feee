//! Page cache fronting the browser fetch step.
//!
//! - Content-addressed keys using SHA-256 of the normalized URL
//! - `PageStore` backends: in-memory TTL map or SQLite (WAL, migrations)
//! - `CacheGateway` adding a single-flight guarantee per key

pub mod connection;
pub mod gateway;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod pages;
pub mod store;

use std::sync::Arc;

use crate::AppConfig;

pub use crate::Error;

pub use connection::CacheDb;
pub use gateway::CacheGateway;
pub use hash::fingerprint;
pub use memory::MemoryStore;
pub use pages::CachedPage;
pub use store::PageStore;

/// Open the page store selected by configuration.
///
/// Uses SQLite at `db_path` when set, otherwise an in-memory store.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn PageStore>, Error> {
    match &config.db_path {
        Some(path) => {
            let db = CacheDb::open(path).await?;
            let purged = db.purge_expired_pages().await?;
            if purged > 0 {
                tracing::debug!("purged {purged} expired pages from {}", path.display());
            }
            Ok(Arc::new(db))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_store_defaults_to_memory() {
        let store = open_store(&AppConfig::default()).await.unwrap();
        assert!(store.get("missing").await.unwrap().is_none());
    }
}
