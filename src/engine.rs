//! Primary log parser interface.
//!
//! This module provides [`LogParser`], which drives one raw line through a
//! compiled device: syslog priority stripping, the parsing tree, schema
//! projections and output assembly.

use crate::bag::{append_path, insert_path, FieldBag};
use crate::compiler::{Compiler, DeviceParser};
use crate::config::ParserConfig;
use crate::error::Result;
use crate::matcher::ParseContext;
use rayon::prelude::*;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::debug;

/// Bag field seeded with the raw line.
pub const MESSAGE_FIELD: &str = "message";
/// Output path of the untouched parsed bag when `keep_raw` is set.
pub const RAW_PATH: &str = "rsa.raw";
/// Output list collecting per-record errors.
pub const ERROR_PATH: &str = "error.message";

fn priority_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^<(\d{1,3})>").expect("valid priority regex"))
}

/// Split a leading `<N>` syslog priority off `line`.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::engine::strip_priority;
///
/// assert_eq!(strip_priority("<134>fw01 hello"), (Some(134), "fw01 hello"));
/// assert_eq!(strip_priority("fw01 hello"), (None, "fw01 hello"));
/// assert_eq!(strip_priority("<999>x"), (None, "<999>x"));
/// ```
pub fn strip_priority(line: &str) -> (Option<u8>, &str) {
    let Some(caps) = priority_regex().captures(line) else {
        return (None, line);
    };
    let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
        return (None, line);
    };
    match number.as_str().parse::<u8>() {
        Ok(priority) if priority <= 191 => (Some(priority), &line[whole.end()..]),
        _ => (None, line),
    }
}

/// Parses raw lines of one device into structured records.
///
/// A `LogParser` is immutable once built and can be shared between threads.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::{LogParser, ParserConfig};
///
/// let yaml = r#"
/// name: demo
/// header:
///   - dissect:
///       pattern: "%{hostname} %{messageid}: %{payload}"
/// messages:
///   LOGIN:
///     msg:
///       id: LOGIN_OK
///       node:
///         dissect:
///           pattern: "user=%{username}"
/// ecs:
///   username:
///     destinations: [{ field: user.name }]
///   hostname:
///     destinations: [{ field: host.name }]
/// "#;
///
/// let parser = LogParser::from_yaml(yaml, ParserConfig::default())?;
/// let record = parser.process("<38>gw LOGIN: user=alice");
/// assert_eq!(record["user"]["name"], "alice");
/// assert_eq!(record["host"]["name"], "gw");
/// assert_eq!(record["log"]["syslog"]["facility"]["code"], 4);
/// assert_eq!(record["log"]["syslog"]["severity"]["code"], 6);
/// # Ok::<(), logparser_engine::ParserError>(())
/// ```
#[derive(Debug, Clone)]
pub struct LogParser {
    device: DeviceParser,
    config: ParserConfig,
}

impl LogParser {
    /// Create a parser, validating the configuration.
    pub fn new(device: DeviceParser, config: ParserConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { device, config })
    }

    /// Compile a YAML device definition and create a parser for it.
    pub fn from_yaml(yaml: &str, config: ParserConfig) -> Result<Self> {
        let device = Compiler::new().compile_yaml(yaml)?;
        Self::new(device, config)
    }

    pub fn device(&self) -> &DeviceParser {
        &self.device
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse one line into a structured record.
    pub fn process(&self, line: &str) -> Value {
        self.process_with_timezone(line, None)
    }

    /// Parse one line, with the timezone the host attached to it.
    ///
    /// `event_tz` is only consulted when the configured `tz_offset` is `event`.
    pub fn process_with_timezone(&self, line: &str, event_tz: Option<&str>) -> Value {
        let ctx = ParseContext::for_event(&self.config, event_tz);
        self.process_in(&ctx, line)
    }

    /// Parse many independent lines in parallel, preserving order.
    pub fn process_batch(&self, lines: &[&str]) -> Vec<Value> {
        lines.par_iter().map(|line| self.process(line)).collect()
    }

    /// Run the parsing tree only, returning the raw field bag.
    pub fn parse_fields(&self, line: &str, event_tz: Option<&str>) -> FieldBag {
        let ctx = ParseContext::for_event(&self.config, event_tz);
        let (_, message) = self.split_priority(line);
        self.run_device(&ctx, message)
    }

    /// Process a line with an explicit context, e.g. a fixed clock.
    pub fn process_in(&self, ctx: &ParseContext<'_>, line: &str) -> Value {
        let (priority, message) = self.split_priority(line);
        let bag = self.run_device(ctx, message);

        let mut record = Map::new();
        insert_path(&mut record, MESSAGE_FIELD, Value::String(message.to_string()));
        if let Some(priority) = priority {
            insert_path(&mut record, "log.syslog.priority", Value::from(priority));
            insert_path(&mut record, "log.syslog.facility.code", Value::from(priority / 8));
            insert_path(&mut record, "log.syslog.severity.code", Value::from(priority % 8));
        }

        if self.config.ecs {
            let projected = self.device.ecs_mapping().project(&bag, self.config.debug);
            for (field, value) in projected.into_entries() {
                insert_path(&mut record, &field, value);
            }
        }
        if self.config.rsa {
            let projected = self.device.rsa_mapping().project(&bag, self.config.debug);
            for (field, value) in projected.into_entries() {
                insert_path(&mut record, &field, value);
            }
        }
        if self.config.keep_raw {
            insert_path(&mut record, RAW_PATH, bag.to_json());
        }
        for error in bag.errors() {
            append_path(&mut record, ERROR_PATH, Value::String(error.clone()));
        }

        Value::Object(record)
    }

    fn split_priority<'l>(&self, line: &'l str) -> (Option<u8>, &'l str) {
        if self.config.strip_priority {
            strip_priority(line)
        } else {
            (None, line)
        }
    }

    fn run_device(&self, ctx: &ParseContext<'_>, message: &str) -> FieldBag {
        let mut bag = FieldBag::with_field(MESSAGE_FIELD, message);
        let outcome = self.device.parse(ctx, &mut bag);
        if !outcome.is_match() && ctx.debug() {
            debug!(device = %self.device.name(), message, "no message shape matched");
        }
        bag
    }
}
