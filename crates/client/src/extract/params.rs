//! Route query parameters.

use std::collections::HashMap;

/// Query parameters supplied by the route caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    /// Parse a raw query string such as `textOnly=1&foo=bar`.
    ///
    /// A leading `?` is ignored. Keys and values are percent-decoded.
    pub fn parse(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let params = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { params }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Whether descriptions should be plain text.
    ///
    /// Absent, `false` and `0` mean no; any other value means yes.
    pub fn text_only(&self) -> bool {
        match self.get("textOnly") {
            None => false,
            Some(value) => {
                let value = value.trim();
                !(value.eq_ignore_ascii_case("false") || value == "0")
            }
        }
    }
}
