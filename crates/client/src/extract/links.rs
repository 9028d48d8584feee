//! Story permalink canonicalization.

use url::Url;

/// Query keys that identify a story; everything else is tracking noise.
const STORY_KEYS: [&str; 3] = ["fbid", "id", "story_fbid"];

/// Strip a story link down to its identifying query keys.
///
/// Keeps `fbid`, `id` and `story_fbid` (those present), sorted by key, and
/// drops the fragment. Input that does not parse as an absolute URL is returned
/// unchanged.
pub fn trim_story_link(link: &str) -> String {
    let Ok(mut url) = Url::parse(link.trim()) else {
        return link.to_string();
    };

    let mut kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| STORY_KEYS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    kept.sort_by(|a, b| a.0.cmp(&b.0));
    kept.dedup_by(|a, b| a.0 == b.0);

    url.set_fragment(None);
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    url.to_string()
}

/// Rewrite the first occurrence of the fetch host with the public host.
pub fn to_public_domain(link: &str, fetch_domain: &str, public_domain: &str) -> String {
    if fetch_domain.is_empty() {
        return link.to_string();
    }
    link.replacen(fetch_domain, public_domain, 1)
}
