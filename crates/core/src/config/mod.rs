//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FBFEED_*)
//! 2. TOML config file (if FBFEED_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FBFEED_*)
/// 2. TOML config file (if FBFEED_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Raw cookie string of a logged-in session. Must carry `c_user` and `xs`.
    ///
    /// Set via FBFEED_COOKIE environment variable.
    #[serde(default)]
    pub cookie: Option<String>,

    /// Path to the SQLite page cache. Pages are cached in memory when unset.
    ///
    /// Set via FBFEED_DB_PATH environment variable.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// Lifetime of a cached page in seconds.
    ///
    /// Set via FBFEED_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Upper bound for one navigation, in milliseconds.
    ///
    /// Set via FBFEED_NAVIGATION_TIMEOUT_MS environment variable.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Value forced into the `locale` query parameter of every fetched URL.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Low-bandwidth host pages are fetched from.
    #[serde(default = "default_fetch_domain")]
    pub fetch_domain: String,

    /// Public host used in produced links.
    #[serde(default = "default_public_domain")]
    pub public_domain: String,

    /// Domain the session cookies are scoped to.
    #[serde(default = "default_cookie_domain")]
    pub cookie_domain: String,

    /// Fixed offset from UTC, in minutes, that publish dates are expressed in.
    ///
    /// Set via FBFEED_TIMEZONE_OFFSET_MINUTES environment variable.
    #[serde(default)]
    pub timezone_offset_minutes: i32,

    /// Chrome/Chromium binary. Auto-detected when unset.
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,

    /// Run the browser without a window.
    #[serde(default = "default_true")]
    pub headless: bool,
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_locale() -> String {
    "en_US".into()
}

fn default_fetch_domain() -> String {
    "mbasic.facebook.com".into()
}

fn default_public_domain() -> String {
    "www.facebook.com".into()
}

fn default_cookie_domain() -> String {
    ".facebook.com".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cookie: None,
            db_path: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            locale: default_locale(),
            fetch_domain: default_fetch_domain(),
            public_domain: default_public_domain(),
            cookie_domain: default_cookie_domain(),
            timezone_offset_minutes: 0,
            chrome_executable: None,
            headless: true,
        }
    }
}

impl AppConfig {
    /// Cache TTL as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Navigation timeout as Duration.
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// The configured publish-date offset.
    ///
    /// Falls back to UTC for out-of-range values; `validate` rejects those.
    pub fn timezone_offset(&self) -> FixedOffset {
        self.timezone_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `FBFEED_`
    /// 2. TOML file from `FBFEED_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("FBFEED_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("FBFEED_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check that a session cookie is configured.
    ///
    /// Only checks presence; the required cookie names are checked when the
    /// cookie is parsed into `SessionCredentials`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the cookie is not set.
    pub fn require_cookie(&self) -> Result<&str, ConfigError> {
        self.cookie.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "cookie".into(),
            hint: "Set FBFEED_COOKIE to the cookie string of a logged-in session".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.cookie.is_none());
        assert!(config.db_path.is_none());
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.navigation_timeout_ms, 30_000);
        assert_eq!(config.locale, "en_US");
        assert_eq!(config.fetch_domain, "mbasic.facebook.com");
        assert_eq!(config.public_domain, "www.facebook.com");
        assert_eq!(config.cookie_domain, ".facebook.com");
        assert_eq!(config.timezone_offset_minutes, 0);
        assert!(config.headless);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(config.navigation_timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn test_timezone_offset() {
        let config = AppConfig { timezone_offset_minutes: 480, ..Default::default() };
        assert_eq!(config.timezone_offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_timezone_offset_out_of_range_falls_back_to_utc() {
        for minutes in [i32::MIN, i32::MAX, 40_000_000, 24 * 60] {
            let config = AppConfig { timezone_offset_minutes: minutes, ..Default::default() };
            assert_eq!(config.timezone_offset().local_minus_utc(), 0, "{minutes}");
        }
    }

    #[test]
    fn test_require_cookie_missing() {
        let config = AppConfig::default();
        assert!(matches!(config.require_cookie(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_cookie_present() {
        let config = AppConfig { cookie: Some("c_user=1; xs=2".into()), ..Default::default() };
        assert_eq!(config.require_cookie().unwrap(), "c_user=1; xs=2");
    }

    #[test]
    fn test_load_from_env() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FBFEED_COOKIE", "c_user=100; xs=abc");
            jail.set_env("FBFEED_CACHE_TTL_SECS", "600");
            jail.set_env("FBFEED_TIMEZONE_OFFSET_MINUTES", "-300");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cookie.as_deref(), Some("c_user=100; xs=abc"));
            assert_eq!(config.cache_ttl_secs, 600);
            assert_eq!(config.timezone_offset_minutes, -300);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("fbfeed.toml", "navigation_timeout_ms = 5000\nlocale = \"en_GB\"\n")?;
            jail.set_env("FBFEED_CONFIG_FILE", "fbfeed.toml");
            jail.set_env("FBFEED_LOCALE", "en_US");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.navigation_timeout_ms, 5000);
            assert_eq!(config.locale, "en_US");
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_extreme_offset() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FBFEED_TIMEZONE_OFFSET_MINUTES", "-2147483648");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timezone_offset_minutes"));
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FBFEED_CACHE_TTL_SECS", "0");
            assert!(AppConfig::load().is_err());
            Ok(())
        });
    }
}
