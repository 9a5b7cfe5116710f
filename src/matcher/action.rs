//! Side effects run after a message shape matches.

use super::context::ParseContext;
use super::functions::CallFunction;
use crate::bag::{FieldBag, FieldValue};
use crate::datetime::{parse_date, parse_duration, DateFormat, DurationFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// An action argument: a literal or the current value of a bag field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Constant(String),
    Field(String),
}

impl ValueSource {
    /// Current text of this argument, `None` for an unset field.
    pub fn resolve(&self, bag: &FieldBag) -> Option<String> {
        match self {
            ValueSource::Constant(value) => Some(value.clone()),
            ValueSource::Field(name) => bag.get(name).map(FieldValue::to_text),
        }
    }
}

/// A named translation table from raw vendor codes to normalized values.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::matcher::LookupTable;
///
/// let table = LookupTable::from_pairs([("1", "low"), ("5", "high")]).with_default("unknown");
/// assert_eq!(table.get("5"), Some("high"));
/// assert_eq!(table.get("3"), Some("unknown"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LookupTable {
    #[serde(default)]
    entries: HashMap<String, String>,
    #[serde(default)]
    default: Option<String>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    /// Value for `key`, falling back to the table default.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .or(self.default.as_ref())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A compiled side effect.
#[derive(Debug, Clone)]
pub enum Action {
    /// Write a literal.
    SetConstant { dest: String, value: String },
    /// Copy a field as is.
    CopyField { dest: String, source: String },
    /// Write the result of a built-in function.
    Call {
        dest: String,
        function: CallFunction,
        args: Vec<ValueSource>,
    },
    /// Translate a key through a lookup table.
    Lookup {
        dest: String,
        table: Arc<LookupTable>,
        key: ValueSource,
    },
    /// Parse the joined text of `args` with the first fitting format.
    DateTime {
        dest: String,
        args: Vec<String>,
        formats: Vec<DateFormat>,
    },
    /// Parse the joined text of `args` as a duration in seconds.
    Duration {
        dest: String,
        args: Vec<String>,
        formats: Vec<DurationFormat>,
    },
    /// Drop fields.
    Remove(Vec<String>),
}

impl Action {
    pub fn set(dest: &str, value: &str) -> Self {
        Action::SetConstant {
            dest: dest.to_string(),
            value: value.to_string(),
        }
    }

    pub fn copy(dest: &str, source: &str) -> Self {
        Action::CopyField {
            dest: dest.to_string(),
            source: source.to_string(),
        }
    }

    pub fn call(dest: &str, function: CallFunction, args: Vec<ValueSource>) -> Self {
        Action::Call {
            dest: dest.to_string(),
            function,
            args,
        }
    }

    /// Apply this action to `bag`. Actions never fail the record.
    pub fn apply(&self, ctx: &ParseContext<'_>, bag: &mut FieldBag) {
        match self {
            Action::SetConstant { dest, value } => bag.set(dest, value.as_str()),
            Action::CopyField { dest, source } => {
                if let Some(value) = bag.get(source).cloned() {
                    bag.set(dest, value);
                }
            }
            Action::Call {
                dest,
                function,
                args,
            } => {
                if let CallFunction::Unimplemented(name) = function {
                    warn!(function = %name, "unimplemented function called");
                    bag.push_error(format!("unimplemented feature: {name}"));
                    return;
                }
                let resolved: Vec<Option<String>> = args.iter().map(|a| a.resolve(bag)).collect();
                match function.evaluate(&resolved) {
                    Some(value) => bag.set(dest, value),
                    None if ctx.debug() => {
                        debug!(%function, dest = %dest, "function produced no value");
                    }
                    None => {}
                }
            }
            Action::Lookup { dest, table, key } => {
                let value = key
                    .resolve(bag)
                    .and_then(|k| table.get(&k).map(str::to_string));
                if let Some(value) = value {
                    bag.set(dest, value);
                }
            }
            Action::DateTime {
                dest,
                args,
                formats,
            } => {
                let text = join_fields(bag, args);
                match parse_date(&text, formats, ctx.offset(), ctx.now()) {
                    Some(date) => bag.set(dest, date),
                    None if ctx.debug() => {
                        debug!(dest = %dest, input = %text, "no date format matched");
                    }
                    None => {}
                }
            }
            Action::Duration {
                dest,
                args,
                formats,
            } => {
                let text = join_fields(bag, args);
                match parse_duration(&text, formats) {
                    Some(seconds) => bag.set(dest, seconds),
                    None if ctx.debug() => {
                        debug!(dest = %dest, input = %text, "no duration format matched");
                    }
                    None => {}
                }
            }
            Action::Remove(fields) => {
                for field in fields {
                    bag.remove(field);
                }
            }
        }
    }
}

/// Values of the named fields joined by single spaces, unset ones skipped.
fn join_fields(bag: &FieldBag, names: &[String]) -> String {
    names
        .iter()
        .filter_map(|name| bag.get(name).map(FieldValue::to_text))
        .collect::<Vec<_>>()
        .join(" ")
}
