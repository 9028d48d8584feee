//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Largest offset accepted for `timezone_offset_minutes` (UTC±14:00).
const MAX_OFFSET_MINUTES: u32 = 14 * 60;

/// Longest accepted cache TTL (one year).
const MAX_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// The cookie is deliberately not checked here: a missing or malformed
    /// cookie surfaces as `Error::Configuration` on the first fetch.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_ttl_secs` is 0 or longer than a year
    /// - `navigation_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `timezone_offset_minutes` is outside ±14 hours
    /// - `locale` or any of the domains is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid { field: "cache_ttl_secs".into(), reason: "must be greater than 0".into() });
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(ConfigError::Invalid {
                field: "cache_ttl_secs".into(),
                reason: format!("must not exceed one year ({MAX_CACHE_TTL_SECS}s)"),
            });
        }

        if self.navigation_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "navigation_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.navigation_timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "navigation_timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.timezone_offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES {
            return Err(ConfigError::Invalid {
                field: "timezone_offset_minutes".into(),
                reason: format!("must be within ±{MAX_OFFSET_MINUTES}"),
            });
        }

        for (field, value) in [
            ("locale", &self.locale),
            ("fetch_domain", &self.fetch_domain),
            ("public_domain", &self.public_domain),
            ("cookie_domain", &self.cookie_domain),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
            }
        }

        if self.fetch_domain == self.public_domain {
            tracing::warn!(
                domain = %self.fetch_domain,
                "fetch_domain and public_domain are identical; links will not be rewritten"
            );
        }

        Ok(())
    }
}
