//! Process-wide parser configuration.
//!
//! The configuration is built once before any record is processed and is
//! read-only afterwards. It travels by reference into every combinator through
//! [`ParseContext`](crate::matcher::ParseContext).

use crate::error::{ParserError, Result};
use chrono::{FixedOffset, Local, Offset, Utc};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::sync::OnceLock;

/// How timestamps without an explicit zone are interpreted.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::TimezoneMode;
///
/// assert_eq!(TimezoneMode::parse("local").unwrap(), TimezoneMode::Local);
/// assert_eq!(TimezoneMode::parse("event").unwrap(), TimezoneMode::Event);
/// assert!(TimezoneMode::parse("-02:00").is_ok());
/// assert!(TimezoneMode::parse("CEST").is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum TimezoneMode {
    /// Use the offset of the host running the parser.
    #[default]
    Local,
    /// Use the timezone attached to each event by the host, UTC when missing.
    Event,
    /// Use an explicit offset.
    Fixed(FixedOffset),
}

impl TimezoneMode {
    /// Parse a `tz_offset` option: `"local"`, `"event"` or `±HH:MM`.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "local" => Ok(TimezoneMode::Local),
            "event" => Ok(TimezoneMode::Event),
            other => parse_offset(other)
                .map(TimezoneMode::Fixed)
                .ok_or_else(|| ParserError::InvalidTimezone(other.to_string())),
        }
    }

    /// Resolve the offset to apply for one record.
    ///
    /// `event_tz` is the timezone the host attached to the record, only
    /// consulted in [`TimezoneMode::Event`].
    pub fn resolve(&self, event_tz: Option<&str>) -> FixedOffset {
        match self {
            TimezoneMode::Local => Local::now().offset().fix(),
            TimezoneMode::Fixed(offset) => *offset,
            TimezoneMode::Event => event_tz
                .and_then(parse_offset)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl TryFrom<String> for TimezoneMode {
    type Error = ParserError;

    fn try_from(value: String) -> Result<Self> {
        TimezoneMode::parse(&value)
    }
}

impl fmt::Display for TimezoneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimezoneMode::Local => write!(f, "local"),
            TimezoneMode::Event => write!(f, "event"),
            TimezoneMode::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

fn offset_regex() -> &'static Regex {
    static OFFSET: OnceLock<Regex> = OnceLock::new();
    OFFSET.get_or_init(|| Regex::new(r"^([+-])(\d{2}):(\d{2})$").expect("valid offset regex"))
}

/// Parse a `±HH:MM` offset string.
pub(crate) fn parse_offset(value: &str) -> Option<FixedOffset> {
    let caps = offset_regex().captures(value)?;
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps[3].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    let seconds = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        FixedOffset::west_opt(seconds)
    } else {
        FixedOffset::east_opt(seconds)
    }
}

/// Parser configuration.
///
/// Mirrors the options a host passes to a log parser module.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::ParserConfig;
///
/// let config: ParserConfig = serde_yaml::from_str(
///     r#"
/// debug: false
/// ecs: true
/// rsa: false
/// keep_raw: true
/// tz_offset: "+01:00"
/// strip_priority: true
/// "#,
/// )?;
/// assert!(config.keep_raw);
/// assert!(!config.rsa);
///
/// let bad = serde_yaml::from_str::<ParserConfig>("tz_offset: nowhere");
/// assert!(bad.is_err());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Emit verbose tracing for match failures, routing misses and skipped conversions.
    pub debug: bool,
    /// Project parsed fields into the common (ECS) schema.
    pub ecs: bool,
    /// Project parsed fields into the vendor (RSA) schema.
    pub rsa: bool,
    /// Keep the untouched parsed bag under `rsa.raw`.
    pub keep_raw: bool,
    /// Timezone applied to timestamps that carry none.
    pub tz_offset: TimezoneMode,
    /// Strip a leading `<N>` syslog priority and derive facility/severity.
    pub strip_priority: bool,
}

impl ParserConfig {
    /// Configuration with an explicit timezone option, validated immediately.
    pub fn with_tz_offset(tz_offset: &str) -> Result<Self> {
        Ok(Self {
            tz_offset: TimezoneMode::parse(tz_offset)?,
            ..Self::default()
        })
    }

    /// Configuration that only keeps the raw parsed bag, without projections.
    pub fn raw_only() -> Self {
        Self {
            ecs: false,
            rsa: false,
            keep_raw: true,
            ..Self::default()
        }
    }

    /// Check option combinations that can never produce useful output.
    pub fn validate(&self) -> Result<()> {
        if !self.ecs && !self.rsa && !self.keep_raw {
            return Err(ParserError::InvalidConfig(
                "at least one of ecs, rsa or keep_raw must be enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            debug: false,
            ecs: true,
            rsa: true,
            keep_raw: false,
            tz_offset: TimezoneMode::default(),
            strip_priority: true,
        }
    }
}
