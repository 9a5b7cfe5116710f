//! Type coercion for mapped fields.
//!
//! Every converter either returns a normalized value or `None`; malformed input
//! is an expected outcome, never an error.

use super::url::to_url;
use crate::bag::FieldValue;
use crate::error::{ParserError, Result};
use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::OnceLock;

/// Largest integer a double represents exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Named coercion applied before a value is merged into a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Converter {
    Long,
    Double,
    Ip,
    Mac,
    Url,
    Date,
    Lowercase,
}

impl Converter {
    /// Resolve a converter by name, with or without the `to_` prefix.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use logparser_engine::normalize::Converter;
    ///
    /// assert_eq!(Converter::from_name("to_ip").unwrap(), Converter::Ip);
    /// assert_eq!(Converter::from_name("long").unwrap(), Converter::Long);
    /// assert!(Converter::from_name("to_bogus").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<Self> {
        let bare = name.strip_prefix("to_").unwrap_or(name);
        match bare {
            "long" | "integer" => Ok(Converter::Long),
            "double" | "float" => Ok(Converter::Double),
            "ip" => Ok(Converter::Ip),
            "mac" => Ok(Converter::Mac),
            "url" => Ok(Converter::Url),
            "date" => Ok(Converter::Date),
            "lowercase" | "textual" => Ok(Converter::Lowercase),
            _ => Err(ParserError::UnknownConverter(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Converter::Long => "to_long",
            Converter::Double => "to_double",
            Converter::Ip => "to_ip",
            Converter::Mac => "to_mac",
            Converter::Url => "to_url",
            Converter::Date => "to_date",
            Converter::Lowercase => "to_lowercase",
        }
    }

    /// Convert a field value, `None` when it cannot be interpreted.
    pub fn apply(&self, value: &FieldValue) -> Option<FieldValue> {
        match self {
            Converter::Long => match value {
                FieldValue::Int(n) => is_safe_integer(*n).then_some(FieldValue::Int(*n)),
                FieldValue::Float(f) => float_to_long(*f).map(FieldValue::Int),
                FieldValue::Str(s) => to_long(s).map(FieldValue::Int),
                _ => None,
            },
            Converter::Double => match value {
                FieldValue::Int(n) => Some(FieldValue::Float(*n as f64)),
                FieldValue::Float(f) => f.is_finite().then_some(FieldValue::Float(*f)),
                FieldValue::Str(s) => to_double(s).map(FieldValue::Float),
                _ => None,
            },
            Converter::Ip => value.as_str().and_then(to_ip).map(FieldValue::Str),
            Converter::Mac => value.as_str().and_then(to_mac).map(FieldValue::Str),
            Converter::Url => value.as_str().and_then(to_url).map(FieldValue::Str),
            Converter::Date => to_date(value).map(FieldValue::Date),
            Converter::Lowercase => match value {
                FieldValue::List(_) | FieldValue::Date(_) => None,
                other => Some(FieldValue::Str(other.to_text().to_lowercase())),
            },
        }
    }
}

impl TryFrom<String> for Converter {
    type Error = ParserError;

    fn try_from(value: String) -> Result<Self> {
        Converter::from_name(&value)
    }
}

impl fmt::Display for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn is_safe_integer(n: i64) -> bool {
    (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&n)
}

fn float_to_long(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let truncated = f.trunc();
    if truncated.abs() > MAX_SAFE_INTEGER as f64 {
        return None;
    }
    Some(truncated as i64)
}

fn long_regex() -> &'static Regex {
    static LONG: OnceLock<Regex> = OnceLock::new();
    LONG.get_or_init(|| Regex::new(r"^\s*([+-]?[0-9]+)").expect("valid integer regex"))
}

fn double_regex() -> &'static Regex {
    static DOUBLE: OnceLock<Regex> = OnceLock::new();
    DOUBLE.get_or_init(|| {
        Regex::new(r"^\s*([+-]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][+-]?[0-9]+)?)").expect("valid float regex")
    })
}

fn mac_regex() -> &'static Regex {
    static MAC: OnceLock<Regex> = OnceLock::new();
    MAC.get_or_init(|| {
        Regex::new(
            r"^(?:[0-9A-Fa-f]{2}([:-])[0-9A-Fa-f]{2}(?:[:-][0-9A-Fa-f]{2}){4}|[0-9A-Fa-f]{4}\.[0-9A-Fa-f]{4}\.[0-9A-Fa-f]{4}|[0-9A-Fa-f]{12})$",
        )
        .expect("valid mac regex")
    })
}

/// Parse the leading integer of `value`, rejecting values a double cannot hold exactly.
///
/// Like a lenient `parseInt`, trailing text after the digits is ignored.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::normalize::to_long;
///
/// assert_eq!(to_long("1234"), Some(1234));
/// assert_eq!(to_long(" 80/tcp"), Some(80));
/// assert_eq!(to_long("9007199254740992"), None);
/// assert_eq!(to_long("n/a"), None);
/// ```
pub fn to_long(value: &str) -> Option<i64> {
    let digits = long_regex().captures(value)?.get(1)?.as_str();
    // Overflowing i64 is already out of the safe range.
    let n: i64 = digits.parse().ok()?;
    is_safe_integer(n).then_some(n)
}

/// Parse the leading floating point number of `value`.
pub fn to_double(value: &str) -> Option<f64> {
    let number = double_regex().captures(value)?.get(1)?.as_str();
    let parsed: f64 = number.parse().ok()?;
    parsed.is_finite().then_some(parsed)
}

/// Validate an IPv4 or IPv6 address, returning it without brackets or zone id.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::normalize::to_ip;
///
/// assert_eq!(to_ip("008.189.239.199").as_deref(), Some("008.189.239.199"));
/// assert_eq!(to_ip("10.100.1000.1"), None);
/// assert_eq!(to_ip("::1").as_deref(), Some("::1"));
/// assert_eq!(to_ip("fff::1::3"), None);
/// assert_eq!(to_ip("[fe80::1%eth0]").as_deref(), Some("fe80::1"));
/// ```
pub fn to_ip(value: &str) -> Option<String> {
    if value.contains(':') {
        to_ipv6(value)
    } else {
        to_ipv4(value)
    }
}

fn is_ipv4(value: &str) -> bool {
    let octets: Vec<&str> = value.split('.').collect();
    octets.len() == 4
        && octets.iter().all(|octet| {
            !octet.is_empty()
                && octet.bytes().all(|b| b.is_ascii_digit())
                && octet.parse::<u32>().map_or(false, |n| n <= 255)
        })
}

fn to_ipv4(value: &str) -> Option<String> {
    is_ipv4(value).then(|| value.to_string())
}

fn is_hex_group(group: &str) -> bool {
    (1..=4).contains(&group.len()) && group.bytes().all(|b| b.is_ascii_hexdigit())
}

fn to_ipv6(value: &str) -> Option<String> {
    let mut address = value;
    if let Some(close) = address.find(']') {
        address = address.strip_prefix('[')?.get(..close - 1)?;
    }
    if let Some(zone) = address.find('%') {
        address = &address[..zone];
    }

    let groups: Vec<&str> = address.split(':').collect();
    if groups.len() < 3 || groups.len() > 8 {
        return None;
    }

    let last = groups.len() - 1;
    let mut inner_empty = 0;
    for (index, group) in groups.iter().enumerate() {
        if group.is_empty() {
            if index > 0 && index < last {
                inner_empty += 1;
            }
        } else if !is_hex_group(group) && (index < last || !is_ipv4(group)) {
            return None;
        }
    }

    let valid = (inner_empty == 0 && groups.len() == 8) || inner_empty == 1;
    valid.then(|| address.to_string())
}

/// Validate a MAC address and normalize it to lowercase colon notation.
///
/// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff`, `aabb.ccdd.eeff` and
/// twelve bare hex digits.
pub fn to_mac(value: &str) -> Option<String> {
    let caps = mac_regex().captures(value)?;
    if let Some(separator) = caps.get(1) {
        // Separators must not be mixed.
        let sep = separator.as_str();
        if value.matches(|c| c == ':' || c == '-').any(|s| s != sep) {
            return None;
        }
    }
    let hex: String = value
        .chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let pairs: Vec<&str> = (0..6).map(|i| &hex[i * 2..i * 2 + 2]).collect();
    Some(pairs.join(":"))
}

/// Interpret a value as an instant: dates pass through, integers are UNIX
/// seconds, strings must be RFC 3339.
pub fn to_date(value: &FieldValue) -> Option<DateTime<Utc>> {
    match value {
        FieldValue::Date(date) => Some(*date),
        FieldValue::Int(seconds) => Utc.timestamp_opt(*seconds, 0).single(),
        FieldValue::Str(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        _ => None,
    }
}
