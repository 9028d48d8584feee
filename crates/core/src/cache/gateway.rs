//! Single-flight cache gateway.
//!
//! On a miss exactly one caller per key runs the computation; concurrent
//! callers for the same key await that flight's result. A failed flight is
//! delivered to its waiters and then forgotten, so the next call retries.
//! Unrelated keys never wait on each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};

use super::{CachedPage, PageStore};
use crate::Error;

type Flight = Arc<OnceCell<Result<String, Error>>>;

/// Cache front for fetched pages.
pub struct CacheGateway {
    store: Arc<dyn PageStore>,
    ttl: Duration,
    in_flight: Mutex<HashMap<String, Flight>>,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn PageStore>, ttl: Duration) -> Self {
        Self { store, ttl, in_flight: Mutex::new(HashMap::new()) }
    }

    /// Return the cached value for `key`, or run `compute` once to produce it.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<String, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, Error>>,
    {
        if let Some(html) = self.lookup(key).await {
            return Ok(html);
        }

        let flight = {
            let mut in_flight = self.in_flight.lock().await;
            Arc::clone(in_flight.entry(key.to_string()).or_default())
        };

        let result = flight
            .get_or_init(|| async {
                // A previous flight may have stored the page after our lookup.
                if let Some(html) = self.lookup(key).await {
                    return Ok(html);
                }
                let result = compute().await;
                if let Ok(html) = &result {
                    self.save(key, html).await;
                }
                result
            })
            .await
            .clone();

        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, &flight))
            {
                in_flight.remove(key);
            }
        }

        result
    }

    /// Number of keys with a computation currently running.
    pub async fn in_flight(&self) -> usize {
        self.in_flight.lock().await.len()
    }

    async fn lookup(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(Some(page)) => {
                tracing::debug!("page cache hit for {key}");
                Some(page.html)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "page cache read failed for {key}; treating as miss");
                None
            }
        }
    }

    async fn save(&self, key: &str, html: &str) {
        let page = CachedPage::new(key, html, self.ttl);
        if let Err(e) = self.store.put(page).await {
            tracing::warn!(error = %e, "page cache write failed for {key}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheDb, MemoryStore};
    use async_trait::async_trait;
    use futures_util::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gateway() -> CacheGateway {
        CacheGateway::new(Arc::new(MemoryStore::new()), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_hit_skips_compute() {
        let gateway = gateway();
        let first = gateway
            .get_or_compute("k", || async { Ok("<p>one</p>".to_string()) })
            .await
            .unwrap();
        assert_eq!(first, "<p>one</p>");

        let second = gateway
            .get_or_compute("k", || async { Err(Error::FetchFailed("compute must not run on a hit".into())) })
            .await
            .unwrap();
        assert_eq!(second, "<p>one</p>");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_flight() {
        let gateway = gateway();
        let calls = AtomicUsize::new(0);

        let run = || {
            gateway.get_or_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok("<p>page</p>".to_string())
            })
        };

        let results = join_all(vec![run(), run(), run(), run()]).await;
        assert!(results.iter().all(|r| matches!(r, Ok(html) if html == "<p>page</p>")));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.in_flight().await, 0);
    }

    #[tokio::test]
    async fn test_failure_reaches_all_waiters_and_does_not_poison() {
        let gateway = gateway();
        let calls = AtomicUsize::new(0);

        let run = || {
            gateway.get_or_compute("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(Error::FetchFailed("net::ERR_CONNECTION_RESET".into()))
            })
        };

        let results = join_all(vec![run(), run()]).await;
        assert!(results.iter().all(|r| matches!(r, Err(Error::FetchFailed(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let retry = gateway
            .get_or_compute("k", || async { Ok("<p>recovered</p>".to_string()) })
            .await
            .unwrap();
        assert_eq!(retry, "<p>recovered</p>");
    }

    #[tokio::test]
    async fn test_unrelated_keys_do_not_serialize() {
        let gateway = gateway();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        // `a` cannot finish until `b` has run, which would deadlock if the
        // two keys shared a lock.
        let a = gateway.get_or_compute("a", || async move {
            rx.await.ok();
            Ok("a".to_string())
        });
        let b = gateway.get_or_compute("b", || async move {
            tx.send(()).ok();
            Ok("b".to_string())
        });

        let (a, b) = tokio::time::timeout(Duration::from_secs(5), async { tokio::join!(a, b) })
            .await
            .expect("keys serialized on each other");
        assert_eq!(a.unwrap(), "a");
        assert_eq!(b.unwrap(), "b");
    }

    #[tokio::test]
    async fn test_sqlite_backend() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let gateway = CacheGateway::new(Arc::new(db.clone()), Duration::from_secs(60));

        gateway
            .get_or_compute("k", || async { Ok("<p>stored</p>".to_string()) })
            .await
            .unwrap();

        assert_eq!(db.page_count().await.unwrap(), 1);
        let page = db.get_fresh_page("k").await.unwrap().unwrap();
        assert_eq!(page.html, "<p>stored</p>");
    }

    struct BrokenStore;

    #[async_trait]
    impl PageStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<CachedPage>, Error> {
            Err(Error::Database("disk I/O error".into()))
        }

        async fn put(&self, _page: CachedPage) -> Result<(), Error> {
            Err(Error::Database("disk I/O error".into()))
        }
    }

    #[tokio::test]
    async fn test_store_failures_fall_through_to_compute() {
        let gateway = CacheGateway::new(Arc::new(BrokenStore), Duration::from_secs(60));
        let html = gateway
            .get_or_compute("k", || async { Ok("<p>live</p>".to_string()) })
            .await
            .unwrap();
        assert_eq!(html, "<p>live</p>");
    }
}
