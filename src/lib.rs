//! # Log Parser Engine
//!
//! A runtime for declarative log parsing tables: literal dissect templates,
//! ordered alternatives and sequences of them, message routing by a parsed
//! identifier, a compact date/duration format language and a two-stage
//! field normalization pass into a common (ECS) and a vendor (RSA) schema.
//!
//! Device tables are data. They are compiled once into an immutable tree
//! ([`DeviceParser`]) which a [`LogParser`] evaluates per line.
//!
//! ## Quick Start
//!
//! ```rust
//! use logparser_engine::{LogParser, ParserConfig};
//!
//! let yaml = r#"
//! name: firewall
//! header:
//!   - dissect:
//!       pattern: "%{hostname} %{messageid}: %{payload}"
//! messages:
//!   DENY:
//!     msg:
//!       id: DENY_01
//!       node:
//!         dissect:
//!           pattern: "src=%{saddr} dst=%{daddr} port=%{dport}"
//!       on_success:
//!         - set: { dest: action, value: deny }
//! ecs:
//!   saddr:
//!     convert: to_ip
//!     destinations:
//!       - { field: source.ip }
//!       - { field: related.ip, policy: append_unique }
//!   daddr:
//!     convert: to_ip
//!     destinations:
//!       - { field: destination.ip }
//!       - { field: related.ip, policy: append_unique }
//!   dport:
//!     convert: to_long
//!     destinations: [{ field: destination.port }]
//! rsa:
//!   action:
//!     destinations: [{ field: rsa.misc.action, policy: append_unique }]
//! "#;
//!
//! let parser = LogParser::from_yaml(yaml, ParserConfig::default())?;
//! let record = parser.process("<134>fw01 DENY: src=10.0.0.1 dst=8.8.8.8 port=53");
//!
//! assert_eq!(record["destination"]["port"], 53);
//! assert_eq!(record["related"]["ip"], serde_json::json!(["10.0.0.1", "8.8.8.8"]));
//! assert_eq!(record["rsa"]["misc"]["action"], serde_json::json!(["deny"]));
//! # Ok::<(), logparser_engine::ParserError>(())
//! ```
//!
//! ### Batch Processing
//!
//! ```rust,ignore
//! let records = parser.process_batch(&lines);
//! ```
//!
//! ## Modules
//!
//! - [`dissect`] - template compilation and matching
//! - [`matcher`] - combinator nodes, router, actions and functions
//! - [`datetime`] - date and duration formats
//! - [`normalize`] - type conversion, mapping tables and merge policies
//! - [`compiler`] - device definitions to parsing trees
//! - [`engine`] - per-line processing and output assembly

pub mod bag;
pub mod compiler;
pub mod config;
pub mod datetime;
pub mod dissect;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod normalize;

pub use bag::{FieldBag, FieldValue, DISSECT_FAILURE};
pub use compiler::{Compiler, DeviceDefinition, DeviceParser};
pub use config::{ParserConfig, TimezoneMode};
pub use dissect::DissectPattern;
pub use engine::LogParser;
pub use error::{ParserError, Result};
pub use matcher::{MatchOutcome, Node, ParseContext};
pub use normalize::{FieldMapping, MergePolicy};
