//! URL validation and component extraction.
//!
//! A URL is accepted when it has a valid host: a dotted hostname, `localhost`,
//! an IPv4 address or a bracketed IPv6 address. The scheme is optional but the
//! host must then contain a dot, so bare words never pass as URLs.

use super::convert::to_ip;
use crate::bag::FieldValue;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

fn url_regex() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(
            r"^(?:([A-Za-z][A-Za-z0-9+.\-]*)://)?(?:[^@/?#\s]*@)?(\[[^\]\s]+\]|[^:/?#\s\[\]@]+)(?::([0-9]{1,5}))?(/[^?#\s]*)?(?:\?([^#\s]*))?(?:#(\S*))?$",
        )
        .expect("valid url regex")
    })
}

/// A validated URL split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    /// Lowercased scheme, if one was given.
    pub scheme: Option<String>,
    /// Lowercased host, without brackets for IPv6.
    pub host: String,
    pub port: Option<u16>,
    /// Path including the leading `/`; empty when absent.
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl Url {
    /// Parse and validate `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use logparser_engine::normalize::Url;
    ///
    /// let url = Url::parse("HTTPS://WWW.Example.com:8443/a/b/index.php?q=1#top").unwrap();
    /// assert_eq!(url.scheme.as_deref(), Some("https"));
    /// assert_eq!(url.host, "www.example.com");
    /// assert_eq!(url.port, Some(8443));
    /// assert_eq!(url.path, "/a/b/index.php");
    /// assert_eq!(url.extension(), Some("php"));
    ///
    /// assert!(Url::parse("http://exa mple.com").is_none());
    /// assert!(Url::parse("http://host:99999/").is_none());
    /// ```
    pub fn parse(value: &str) -> Option<Url> {
        let caps = url_regex().captures(value.trim())?;
        let scheme = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
        let raw_host = caps.get(2)?.as_str();

        let host = match raw_host.strip_prefix('[') {
            Some(bracketed) => {
                let inner = bracketed.strip_suffix(']')?;
                if !inner.contains(':') {
                    return None;
                }
                to_ip(inner)?.to_ascii_lowercase()
            }
            None => {
                let host = raw_host.to_ascii_lowercase();
                if !is_valid_host(&host) || (scheme.is_none() && !host.contains('.')) {
                    return None;
                }
                host
            }
        };

        let port = match caps.get(3) {
            Some(m) => match m.as_str().parse::<u16>() {
                Ok(port) if port > 0 => Some(port),
                _ => return None,
            },
            None => None,
        };

        Some(Url {
            scheme,
            host,
            port,
            path: caps.get(4).map_or_else(String::new, |m| m.as_str().to_string()),
            query: caps.get(5).map(|m| m.as_str().to_string()),
            fragment: caps.get(6).map(|m| m.as_str().to_string()),
        })
    }

    /// Explicit port, or the default port of a well-known scheme.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or_else(|| match self.scheme.as_deref()? {
            "http" | "ws" => Some(80),
            "https" | "wss" => Some(443),
            "ftp" => Some(21),
            _ => None,
        })
    }

    /// Last path segment, if non-empty.
    pub fn page(&self) -> Option<&str> {
        self.path.rsplit('/').next().filter(|page| !page.is_empty())
    }

    /// Extension of the last path segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let page = self.page()?;
        let (stem, ext) = page.rsplit_once('.')?;
        (!stem.is_empty() && !ext.is_empty()).then_some(ext)
    }

    /// Scheme, host and port: everything before the path.
    pub fn root(&self) -> String {
        let mut root = String::new();
        if let Some(scheme) = &self.scheme {
            root.push_str(scheme);
            root.push_str("://");
        }
        if self.host.contains(':') {
            root.push('[');
            root.push_str(&self.host);
            root.push(']');
        } else {
            root.push_str(&self.host);
        }
        if let Some(port) = self.port {
            root.push(':');
            root.push_str(&port.to_string());
        }
        root
    }

    /// Extract one component; `None` when the URL does not carry it.
    pub fn component(&self, component: UrlComponent) -> Option<FieldValue> {
        let text = |s: &str| Some(FieldValue::Str(s.to_string()));
        match component {
            UrlComponent::Scheme => text(self.scheme.as_deref()?),
            UrlComponent::Domain => text(self.host.as_str()),
            UrlComponent::Port => self.effective_port().map(|p| FieldValue::Int(i64::from(p))),
            UrlComponent::Path => (!self.path.is_empty()).then(|| FieldValue::Str(self.path.clone())),
            UrlComponent::Query => text(self.query.as_deref().filter(|q| !q.is_empty())?),
            UrlComponent::Fragment => text(self.fragment.as_deref().filter(|f| !f.is_empty())?),
            UrlComponent::Page => text(self.page()?),
            UrlComponent::Extension => text(self.extension()?),
            UrlComponent::Root => Some(FieldValue::Str(self.root())),
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root())?;
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// Named part of a URL, as requested by the `URL` call function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlComponent {
    Scheme,
    Domain,
    Port,
    Path,
    Query,
    Fragment,
    Page,
    Extension,
    Root,
}

impl UrlComponent {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_lowercase().as_str() {
            "scheme" | "protocol" => UrlComponent::Scheme,
            "domain" | "host" => UrlComponent::Domain,
            "port" => UrlComponent::Port,
            "path" => UrlComponent::Path,
            "query" => UrlComponent::Query,
            "fragment" => UrlComponent::Fragment,
            "page" => UrlComponent::Page,
            "ext" | "extension" => UrlComponent::Extension,
            "root" => UrlComponent::Root,
            _ => return None,
        })
    }
}

fn is_valid_host(host: &str) -> bool {
    if host.len() > 253 {
        return false;
    }
    if host.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return to_ip(host).is_some();
    }
    let host = host.strip_suffix('.').unwrap_or(host);
    host.split('.').all(|label| {
        (1..=63).contains(&label.len())
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    })
}

/// Validate a URL and return it with its scheme and host lowercased.
///
/// ```rust
/// use logparser_engine::normalize::to_url;
///
/// assert_eq!(to_url("HTTP://Example.COM/Index.html").as_deref(), Some("http://example.com/Index.html"));
/// assert_eq!(to_url("www.example.com/a?b=c").as_deref(), Some("www.example.com/a?b=c"));
/// assert_eq!(to_url("not a url"), None);
/// ```
pub fn to_url(value: &str) -> Option<String> {
    Url::parse(value).map(|url| url.to_string())
}
