//! Per-record evaluation context.

use crate::config::ParserConfig;
use chrono::{DateTime, FixedOffset, Utc};

/// Read-only state shared by every node while one record is processed.
///
/// Holds the process configuration, the instant used for year inference and
/// the offset applied to timestamps that carry no zone of their own.
///
/// # Examples
///
/// ```rust
/// use chrono::{FixedOffset, TimeZone, Utc};
/// use logparser_engine::matcher::ParseContext;
/// use logparser_engine::ParserConfig;
///
/// let config = ParserConfig::with_tz_offset("-02:00")?;
/// let ctx = ParseContext::for_event(&config, None);
/// assert_eq!(ctx.offset(), FixedOffset::west_opt(2 * 3600).unwrap());
///
/// let fixed = ParseContext::new(&config, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), ctx.offset());
/// assert_eq!(fixed.now().to_rfc3339(), "2024-01-01T00:00:00+00:00");
/// # Ok::<(), logparser_engine::ParserError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    config: &'a ParserConfig,
    now: DateTime<Utc>,
    offset: FixedOffset,
}

impl<'a> ParseContext<'a> {
    pub fn new(config: &'a ParserConfig, now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self {
            config,
            now,
            offset,
        }
    }

    /// Context for a record arriving now, with the host-supplied event timezone.
    pub fn for_event(config: &'a ParserConfig, event_tz: Option<&str>) -> Self {
        Self::new(config, Utc::now(), config.tz_offset.resolve(event_tz))
    }

    pub fn config(&self) -> &'a ParserConfig {
        self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Whether verbose tracing is enabled.
    #[inline]
    pub fn debug(&self) -> bool {
        self.config.debug
    }
}
