//! Cached page CRUD operations on the SQLite store.

use super::connection::CacheDb;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A fetched HTML page held by the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedPage {
    /// Fingerprint of the normalized URL.
    pub key: String,
    pub html: String,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CachedPage {
    /// Build a page fetched now that lives for `ttl`.
    pub fn new(key: impl Into<String>, html: impl Into<String>, ttl: std::time::Duration) -> Self {
        let fetched_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = fetched_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { key: key.into(), html: html.into(), fetched_at, expires_at }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl CacheDb {
    /// Insert or replace a cached page.
    pub async fn upsert_page(&self, page: &CachedPage) -> Result<(), Error> {
        let page = page.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO pages (key, html, fetched_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(key) DO UPDATE SET
                        html = excluded.html,
                        fetched_at = excluded.fetched_at,
                        expires_at = excluded.expires_at",
                    params![&page.key, &page.html, page.fetched_at.to_rfc3339(), page.expires_at.to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a page by key if it has not expired.
    pub async fn get_fresh_page(&self, key: &str) -> Result<Option<CachedPage>, Error> {
        let key = key.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<Option<CachedPage>, Error> {
                let result = conn.query_row(
                    "SELECT key, html, fetched_at, expires_at FROM pages
                     WHERE key = ?1 AND expires_at > ?2",
                    params![key, now],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                );

                match result {
                    Ok((key, html, fetched_at, expires_at)) => Ok(Some(CachedPage {
                        key,
                        html,
                        fetched_at: parse_timestamp(&fetched_at)?,
                        expires_at: parse_timestamp(&expires_at)?,
                    })),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired pages.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired_pages(&self) -> Result<u64, Error> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM pages WHERE expires_at <= ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored pages, expired or not.
    pub async fn page_count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Database(format!("bad timestamp {value:?}: {e}")))
}
