//! Schema mapping tables for projecting parsed fields.
//!
//! This module provides the [`FieldMapping`] struct: a named table that maps
//! source field names from the parsed bag to one or more destination fields in
//! an output schema, with an optional type conversion per source.
//!
//! Tables keep their declaration order. Projection walks sources in that
//! order, so append-unique destinations list values the way the table lists
//! their sources.

use super::convert::Converter;
use super::merge::{MergeAccumulator, MergePolicy};
use crate::bag::FieldBag;
use crate::error::Result;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Deserialize a map of source field to [`MappingEntry`], keeping document order.
pub fn deserialize_ordered_entries<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<(String, MappingEntry)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct EntriesVisitor;

    impl<'de> Visitor<'de> for EntriesVisitor {
        type Value = Vec<(String, MappingEntry)>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of source field to mapping entry")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, MappingEntry>()? {
                entries.push((key, value));
            }
            Ok(entries)
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_map(EntriesVisitor)
}

/// One destination of a mapped source field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Destination {
    pub field: String,
    #[serde(default)]
    pub policy: MergePolicy,
    #[serde(default)]
    pub priority: Option<u32>,
}

impl Destination {
    pub fn new(field: &str, policy: MergePolicy) -> Self {
        Self {
            field: field.to_string(),
            policy,
            priority: None,
        }
    }

    pub fn with_priority(field: &str, priority: u32) -> Self {
        Self {
            field: field.to_string(),
            policy: MergePolicy::Priority,
            priority: Some(priority),
        }
    }
}

/// Mapping for one source field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MappingEntry {
    #[serde(default)]
    pub convert: Option<Converter>,
    #[serde(alias = "to")]
    pub destinations: Vec<Destination>,
}

impl MappingEntry {
    pub fn new(destinations: Vec<Destination>) -> Self {
        Self {
            convert: None,
            destinations,
        }
    }

    pub fn converted(convert: Converter, destinations: Vec<Destination>) -> Self {
        Self {
            convert: Some(convert),
            destinations,
        }
    }
}

/// Mapping table for one output schema.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::normalize::{Converter, Destination, FieldMapping, MappingEntry, MergePolicy};
/// use logparser_engine::FieldBag;
///
/// let mut mapping = FieldMapping::with_schema("ecs");
/// mapping.add_mapping(
///     "saddr",
///     MappingEntry::converted(
///         Converter::Ip,
///         vec![
///             Destination::new("source.ip", MergePolicy::Overwrite),
///             Destination::new("related.ip", MergePolicy::AppendUnique),
///         ],
///     ),
/// );
///
/// let mut bag = FieldBag::new();
/// bag.set("saddr", "10.1.1.1");
/// let projected = mapping.project(&bag, false);
/// assert_eq!(projected.get("source.ip"), Some(serde_json::json!("10.1.1.1")));
/// assert_eq!(projected.get("related.ip"), Some(serde_json::json!(["10.1.1.1"])));
/// ```
#[derive(Debug, Clone)]
pub struct FieldMapping {
    entries: Vec<(String, MappingEntry)>,
    index: HashMap<String, usize>,
    schema: String,
}

impl FieldMapping {
    /// Create an empty mapping for the common schema.
    pub fn new() -> Self {
        Self::with_schema("ecs")
    }

    pub fn with_schema(schema: &str) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            schema: schema.to_string(),
        }
    }

    /// Load a table from YAML: a map of source field to [`MappingEntry`].
    ///
    /// ```rust
    /// use logparser_engine::normalize::FieldMapping;
    ///
    /// let mapping = FieldMapping::from_yaml(
    ///     "rsa",
    ///     r#"
    /// action:
    ///   destinations:
    ///     - { field: rsa.misc.action, policy: append_unique }
    /// sport:
    ///   convert: to_long
    ///   destinations:
    ///     - { field: rsa.network.sport }
    /// "#,
    /// )?;
    /// assert_eq!(mapping.len(), 2);
    /// assert_eq!(mapping.schema(), "rsa");
    /// # Ok::<(), logparser_engine::ParserError>(())
    /// ```
    pub fn from_yaml(schema: &str, yaml: &str) -> Result<Self> {
        let entries = deserialize_ordered_entries(serde_yaml::Deserializer::from_str(yaml))?;
        let mut mapping = Self::with_schema(schema);
        mapping.load_mappings(entries);
        Ok(mapping)
    }

    pub fn load_mappings(&mut self, mappings: impl IntoIterator<Item = (String, MappingEntry)>) {
        for (source_field, entry) in mappings {
            self.add_mapping(&source_field, entry);
        }
    }

    /// Add a source mapping. Redefining a source keeps its original position.
    pub fn add_mapping(&mut self, source_field: &str, entry: MappingEntry) {
        match self.index.get(source_field) {
            Some(&position) => self.entries[position].1 = entry,
            None => {
                self.index.insert(source_field.to_string(), self.entries.len());
                self.entries.push((source_field.to_string(), entry));
            }
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn has_mapping(&self, field_name: &str) -> bool {
        self.index.contains_key(field_name)
    }

    pub fn entry(&self, field_name: &str) -> Option<&MappingEntry> {
        self.index.get(field_name).map(|&position| &self.entries[position].1)
    }

    /// Source mappings in declaration order.
    pub fn mappings(&self) -> impl Iterator<Item = (&str, &MappingEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Project every mapped field of `bag` into a fresh accumulator.
    ///
    /// Sources are visited in declaration order. A value whose conversion
    /// fails is skipped for all of its destinations.
    pub fn project(&self, bag: &FieldBag, trace: bool) -> MergeAccumulator {
        let mut acc = MergeAccumulator::new();
        for (name, entry) in &self.entries {
            let Some(value) = bag.get(name) else {
                continue;
            };
            let value = match entry.convert {
                Some(converter) => match converter.apply(value) {
                    Some(converted) => converted,
                    None => {
                        if trace {
                            debug!(
                                schema = %self.schema,
                                field = %name,
                                %converter,
                                value = %value,
                                "conversion failed, field skipped"
                            );
                        }
                        continue;
                    }
                },
                None => value.clone(),
            };
            for destination in &entry.destinations {
                acc.merge(
                    &destination.field,
                    destination.policy,
                    destination.priority,
                    value.clone(),
                );
            }
        }
        acc
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::new()
    }
}
