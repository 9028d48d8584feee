//! Session credentials parsed from a raw cookie string.

use crate::Error;

/// Cookie names that must be present for an authenticated session.
pub const REQUIRED_COOKIES: [&str; 2] = ["c_user", "xs"];

/// One `name=value` pair from the cookie string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

/// Authenticated session cookies.
///
/// Construction guarantees every name in [`REQUIRED_COOKIES`] is present
/// with a non-empty value.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    cookies: Vec<SessionCookie>,
}

impl SessionCredentials {
    /// Parse a `name=value; name2=value2` cookie string.
    ///
    /// Segments without `=` are skipped. Attribute-looking segments such as
    /// `Path=/` are kept as plain pairs; the browser ignores unknown names.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if a required cookie is missing or empty.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let cookies: Vec<SessionCookie> = raw
            .split(';')
            .filter_map(|segment| {
                let (name, value) = segment.split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some(SessionCookie { name: name.to_string(), value: value.trim().trim_matches('"').to_string() })
            })
            .collect();

        for required in REQUIRED_COOKIES {
            let present = cookies
                .iter()
                .any(|c| c.name == required && !c.value.is_empty());
            if !present {
                return Err(Error::Configuration(format!("cookie is not valid: missing `{required}`")));
            }
        }

        Ok(Self { cookies })
    }

    /// Parse an optional cookie string, treating `None` as not configured.
    pub fn from_config(raw: Option<&str>) -> Result<Self, Error> {
        match raw {
            Some(raw) if !raw.trim().is_empty() => Self::parse(raw),
            _ => Err(Error::Configuration("cookie is not configured".to_string())),
        }
    }

    /// All cookies, in the order given.
    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    /// Value of the named cookie, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_cookie() {
        let creds = SessionCredentials::parse("c_user=100012345; xs=12%3Aabc; datr=xyz").unwrap();
        assert_eq!(creds.get("c_user"), Some("100012345"));
        assert_eq!(creds.get("xs"), Some("12%3Aabc"));
        assert_eq!(creds.cookies().len(), 3);
    }

    #[test]
    fn test_parse_missing_xs() {
        let result = SessionCredentials::parse("c_user=100012345; datr=xyz");
        assert!(matches!(result, Err(Error::Configuration(msg)) if msg.contains("xs")));
    }

    #[test]
    fn test_parse_missing_c_user() {
        let result = SessionCredentials::parse("xs=abc");
        assert!(matches!(result, Err(Error::Configuration(msg)) if msg.contains("c_user")));
    }

    #[test]
    fn test_parse_empty_value() {
        let result = SessionCredentials::parse("c_user=; xs=abc");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_parse_tolerates_whitespace_and_garbage() {
        let creds = SessionCredentials::parse("  c_user = 1 ;; junk ; xs=\"2\" ;").unwrap();
        assert_eq!(creds.get("c_user"), Some("1"));
        assert_eq!(creds.get("xs"), Some("2"));
        assert_eq!(creds.cookies().len(), 2);
    }

    #[test]
    fn test_value_may_contain_equals() {
        let creds = SessionCredentials::parse("c_user=1; xs=a=b").unwrap();
        assert_eq!(creds.get("xs"), Some("a=b"));
    }

    #[test]
    fn test_from_config_none() {
        assert!(matches!(SessionCredentials::from_config(None), Err(Error::Configuration(_))));
        assert!(matches!(SessionCredentials::from_config(Some("  ")), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_required_errors_are_fatal() {
        let err = SessionCredentials::parse("").unwrap_err();
        assert!(err.is_fatal());
    }
}
