//! Core types and shared functionality for fbfeed.
//!
//! This crate provides:
//! - Page cache with a single-flight gateway and SQLite/in-memory stores
//! - Unified error types
//! - Layered configuration
//! - Session credential parsing

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;

pub use cache::{CacheDb, CacheGateway, CachedPage, MemoryStore, PageStore};
pub use config::{AppConfig, ConfigError};
pub use credentials::{SessionCookie, SessionCredentials};
pub use error::Error;
