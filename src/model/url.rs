//! Parsed server addresses.

use std::fmt;

use reqwest::Url;

/// Errors that make a URL unusable for reporting.
#[derive(Debug, thiserror::Error)]
pub enum UrlError {
    #[error("malformed URL `{0}`: {1}")]
    Malformed(String, String),

    #[error("URL `{0}` is not HTTP or HTTPS")]
    Scheme(String),

    #[error("URL `{0}` does not specify a host")]
    NoHost(String),
}

/// A server address reduced to the parts Tattle uses.
///
/// Query strings, fragments and user info are dropped with a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub port: u16,
}

impl ParsedUrl {
    pub fn parse(raw: &str) -> Result<Self, UrlError> {
        let url = raw
            .trim()
            .parse::<Url>()
            .map_err(|e| UrlError::Malformed(raw.to_string(), e.to_string()))?;

        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(UrlError::Scheme(raw.to_string()));
        }

        let host = url.host_str().unwrap_or_default();
        if host.is_empty() {
            return Err(UrlError::NoHost(raw.to_string()));
        }

        if url.query().is_some() {
            log::warn!("ignoring query in URL `{raw}`");
        }
        if url.fragment().is_some() {
            log::warn!("ignoring fragment in URL `{raw}`");
        }
        if !url.username().is_empty() || url.password().is_some() {
            log::warn!("ignoring user info in URL `{raw}`");
        }

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            path: url.path().to_string(),
            port: url.port_or_known_default().unwrap_or(80),
        })
    }

    /// True iff a host is present.
    pub fn is_set(&self) -> bool {
        !self.host.is_empty()
    }

    /// `scheme://host[:port]`, omitting the port when it is the scheme default.
    pub fn origin(&self) -> String {
        let default_port = if self.scheme == "https" { 443 } else { 80 };
        if self.port == default_port {
            format!("{}://{}", self.scheme, self.host)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }

    /// Build a same-origin link from an untrusted server-supplied one.
    ///
    /// Only the path and query of `link` survive; scheme, host, port and
    /// user info always come from this URL.
    pub fn same_origin(&self, link: &str) -> String {
        let link = link.trim();
        let rest = match link.parse::<Url>() {
            Ok(absolute) => {
                let mut rest = absolute.path().trim_start_matches('/').to_string();
                if let Some(query) = absolute.query() {
                    rest.push('?');
                    rest.push_str(query);
                }
                rest
            }
            Err(_) => {
                let without_fragment = link.split('#').next().unwrap_or_default();
                without_fragment.trim_start_matches('/').to_string()
            }
        };
        format!("{}/{}", self.origin(), rest)
    }
}

impl fmt::Display for ParsedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{}{}", self.origin(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_path_and_default_port() {
        let url = ParsedUrl::parse("http://reports.example.com/crash/submit.php").unwrap();
        assert_eq!(url.scheme, "http");
        assert_eq!(url.host, "reports.example.com");
        assert_eq!(url.path, "/crash/submit.php");
        assert_eq!(url.port, 80);
        assert!(url.is_set());
    }

    #[test]
    fn parses_explicit_port_and_https() {
        let url = ParsedUrl::parse("https://example.com:8443/q").unwrap();
        assert_eq!(url.port, 8443);
        assert_eq!(url.to_string(), "https://example.com:8443/q");

        let url = ParsedUrl::parse("https://example.com/q").unwrap();
        assert_eq!(url.port, 443);
        assert_eq!(url.to_string(), "https://example.com/q");
    }

    #[test]
    fn rejects_other_schemes() {
        let err = ParsedUrl::parse("ftp://example.com/").unwrap_err();
        assert!(matches!(err, UrlError::Scheme(_)));
    }

    #[test]
    fn rejects_garbage() {
        let err = ParsedUrl::parse("not a url").unwrap_err();
        assert!(matches!(err, UrlError::Malformed(..)));
    }

    #[test]
    fn drops_query_string() {
        let url = ParsedUrl::parse("http://example.com/a?b=c").unwrap();
        assert_eq!(url.path, "/a");
    }

    #[test]
    fn same_origin_keeps_only_path() {
        let url = ParsedUrl::parse("http://example.com/report.php").unwrap();

        assert_eq!(url.same_origin("faq/crash"), "http://example.com/faq/crash");
        assert_eq!(url.same_origin("/faq/crash"), "http://example.com/faq/crash");
        assert_eq!(
            url.same_origin("https://evil.example.net/phish?x=1"),
            "http://example.com/phish?x=1"
        );
        assert_eq!(
            url.same_origin("//evil.example.net/phish"),
            "http://example.com/evil.example.net/phish"
        );
    }
}
