//! Per-record field storage.
//!
//! A [`FieldBag`] is created for each input line, filled by dissection and
//! actions, projected by the normalization engine and then dropped.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved flag written when a dissection fails.
pub const DISSECT_FAILURE: &str = "dissect_parsing_error";

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Float(f64),
    Date(DateTime<Utc>),
    List(Vec<String>),
}

impl FieldValue {
    /// Borrow the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Textual form used when a value feeds another string operation.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Str(s) => s.clone(),
            FieldValue::Int(n) => n.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Date(d) => d.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            FieldValue::List(items) => items.join(","),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::Int(n) => Value::Number((*n).into()),
            FieldValue::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Date(d) => {
                Value::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            FieldValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Date(value)
    }
}

/// The mutable store for one record.
///
/// Field names are flat dotted strings. The bag also carries the failure
/// marker used by the combinators and the record's error messages.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::{FieldBag, FieldValue};
///
/// let mut bag = FieldBag::new();
/// bag.set("hostname", "fw01");
/// assert_eq!(bag.get_str("hostname"), Some("fw01"));
///
/// bag.mark_failed();
/// assert!(bag.is_failed());
/// bag.clear_failure();
/// assert!(!bag.is_failed());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldBag {
    fields: BTreeMap<String, FieldValue>,
    failure: Option<String>,
    errors: Vec<String>,
}

impl FieldBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bag seeded with a single field, typically the raw message.
    pub fn with_field(name: &str, value: impl Into<FieldValue>) -> Self {
        let mut bag = Self::new();
        bag.set(name, value);
        bag
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_str)
    }

    /// Set a field, overwriting any previous value.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn mark_failed(&mut self) {
        self.failure = Some(DISSECT_FAILURE.to_string());
    }

    pub fn clear_failure(&mut self) {
        self.failure = None;
    }

    /// Remove and return the current failure marker.
    pub fn take_failure(&mut self) -> Option<String> {
        self.failure.take()
    }

    pub fn restore_failure(&mut self, flag: String) {
        self.failure = Some(flag);
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Record a non-fatal error for the output's `error.message` list.
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Flat JSON object of all fields, keys left dotted.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect();
        Value::Object(map)
    }
}

/// Insert `value` at a dotted `path`, creating intermediate objects.
///
/// A non-object value already sitting on the path is replaced.
pub fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut parts = path.split('.').peekable();
    let mut current = root;
    while let Some(part) = parts.next() {
        if parts.peek().is_none() {
            current.insert(part.to_string(), value);
            return;
        }
        let entry = current
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
}

/// Append `value` to the list at `path`, creating it when absent.
pub fn append_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let list = match lookup_path(root, path) {
        Some(Value::Array(items)) => {
            let mut items = items.clone();
            items.push(value);
            items
        }
        Some(other) => vec![other.clone(), value],
        None => vec![value],
    };
    insert_path(root, path, Value::Array(list));
}

/// Look up a dotted path in a nested JSON object.
pub fn lookup_path<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = root.get(first)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}
