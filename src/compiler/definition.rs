//! Serialized shape of a device definition.
//!
//! These types mirror the YAML/JSON tables one to one and carry no behavior;
//! [`Compiler`](super::Compiler) validates them and builds the runtime tree.

use crate::datetime::{DateFormat, DurationFormat};
use crate::matcher::{LookupTable, ValueSource};
use crate::normalize::mapping::deserialize_ordered_entries;
use crate::normalize::MappingEntry;
use serde::Deserialize;
use std::collections::HashMap;

/// A complete device: header stage, message routes, lookups and mappings.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceDefinition {
    pub name: String,
    /// Bag field holding the message identifier, `messageid` when omitted.
    #[serde(default)]
    pub discriminator: Option<String>,
    /// Header shapes, tried in order against the raw message.
    pub header: Vec<NodeSpec>,
    /// Message identifier to message node.
    #[serde(default)]
    pub messages: HashMap<String, NodeSpec>,
    #[serde(default)]
    pub lookups: HashMap<String, LookupTable>,
    /// Common schema projection table, in declaration order.
    #[serde(default, deserialize_with = "deserialize_ordered_entries")]
    pub ecs: Vec<(String, MappingEntry)>,
    /// Vendor schema projection table, in declaration order.
    #[serde(default, deserialize_with = "deserialize_ordered_entries")]
    pub rsa: Vec<(String, MappingEntry)>,
}

/// A node of the parsing tree as written in a table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeSpec {
    Dissect {
        pattern: String,
        /// Field to dissect; defaults to `message` in the header and
        /// `payload` inside messages.
        #[serde(default)]
        source: Option<String>,
        #[serde(default)]
        on_success: Vec<ActionSpec>,
    },
    Copy {
        source: String,
        dest: String,
    },
    All {
        nodes: Vec<NodeSpec>,
        #[serde(default)]
        on_success: Vec<ActionSpec>,
        #[serde(default)]
        on_failure: Vec<ActionSpec>,
    },
    Any(Vec<NodeSpec>),
    /// Branch on a field: set, or equal to `equals` when given.
    If {
        field: String,
        #[serde(default)]
        equals: Option<String>,
        then: Box<NodeSpec>,
        #[serde(default, rename = "else")]
        otherwise: Option<Box<NodeSpec>>,
    },
    Msg {
        id: String,
        node: Box<NodeSpec>,
        #[serde(default)]
        on_success: Vec<ActionSpec>,
    },
    Router {
        #[serde(default)]
        discriminator: Option<String>,
        routes: HashMap<String, NodeSpec>,
    },
}

/// An action as written in a table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSpec {
    Set {
        dest: String,
        value: String,
    },
    Copy {
        dest: String,
        source: String,
    },
    Call {
        dest: String,
        function: String,
        #[serde(default)]
        args: Vec<ValueSource>,
    },
    Lookup {
        dest: String,
        table: String,
        key: ValueSource,
    },
    Date {
        dest: String,
        args: Vec<String>,
        formats: Vec<DateFormat>,
    },
    Duration {
        dest: String,
        args: Vec<String>,
        formats: Vec<DurationFormat>,
    },
    Remove(Vec<String>),
}
