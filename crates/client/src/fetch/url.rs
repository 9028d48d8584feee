//! URL normalization for consistent caching.

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Normalize a request URL so equal pages share one cache key.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Require an absolute http(s) URL
/// 3. Lowercase the host, remove fragment (#...)
/// 4. Replace any `locale` query parameter with `locale`
/// 5. Sort query pairs by key (stable for repeated keys)
pub fn normalize_with_locale(input: &str, locale: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "locale")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.push(("locale".to_string(), locale.to_string()));
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    parsed.query_pairs_mut().clear().extend_pairs(&pairs);

    Ok(parsed)
}
