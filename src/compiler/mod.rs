//! Device definition compiler.
//!
//! This module turns declarative device tables into an immutable parsing
//! tree. Compilation validates everything that can be checked up front
//! (dissect templates, date formats, function names and arities, lookup
//! references, converter and policy names) so that processing a record can
//! never hit a malformed table.
//!
//! - [`definition`] - serde shapes of the YAML/JSON tables
//!
//! # Examples
//!
//! ```rust
//! use logparser_engine::Compiler;
//!
//! let yaml = r#"
//! name: demo
//! header:
//!   - dissect:
//!       pattern: "%{hostname} %{messageid}: %{payload}"
//! messages:
//!   LOGIN:
//!     msg:
//!       id: LOGIN_OK
//!       node:
//!         dissect:
//!           pattern: "user=%{username}"
//! "#;
//!
//! let mut compiler = Compiler::new();
//! let device = compiler.compile_yaml(yaml)?;
//! assert_eq!(device.name(), "demo");
//! assert_eq!(device.route_count(), 1);
//! # Ok::<(), logparser_engine::ParserError>(())
//! ```

pub mod definition;

pub use definition::{ActionSpec, DeviceDefinition, NodeSpec};

use crate::bag::FieldBag;
use crate::dissect::DissectPattern;
use crate::error::{ParserError, Result};
use crate::matcher::{
    Action, CallFunction, Condition, LookupTable, MatchOutcome, MessageRouter, Node, ParseContext,
};
use crate::normalize::FieldMapping;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const HEADER_SOURCE: &str = "message";
const MESSAGE_SOURCE: &str = "payload";

/// A compiled device, ready to be shared across threads.
#[derive(Debug, Clone)]
pub struct DeviceParser {
    name: String,
    root: Node,
    route_count: usize,
    ecs: FieldMapping,
    rsa: FieldMapping,
}

impl DeviceParser {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header alternative followed by the message router.
    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn route_count(&self) -> usize {
        self.route_count
    }

    pub fn ecs_mapping(&self) -> &FieldMapping {
        &self.ecs
    }

    pub fn rsa_mapping(&self) -> &FieldMapping {
        &self.rsa
    }

    /// Run the device tree over a bag seeded with the raw message.
    pub fn parse(&self, ctx: &ParseContext<'_>, bag: &mut FieldBag) -> MatchOutcome {
        bag.clear_failure();
        self.root.attempt(ctx, bag)
    }
}

/// Compiles [`DeviceDefinition`]s into [`DeviceParser`]s.
///
/// Lookup tables registered on the compiler are visible to every definition
/// it compiles; a definition's own tables shadow them by name.
#[derive(Debug, Default)]
pub struct Compiler {
    shared_lookups: HashMap<String, Arc<LookupTable>>,
    lookups: HashMap<String, Arc<LookupTable>>,
    node_count: usize,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a lookup table shared by all definitions.
    pub fn add_lookup(&mut self, name: &str, table: LookupTable) {
        self.shared_lookups
            .insert(name.to_string(), Arc::new(table));
    }

    /// Number of nodes built by the last compilation.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn compile_yaml(&mut self, yaml: &str) -> Result<DeviceParser> {
        let definition: DeviceDefinition = serde_yaml::from_str(yaml)?;
        self.compile_definition(definition)
    }

    pub fn compile_json(&mut self, json: &str) -> Result<DeviceParser> {
        let definition: DeviceDefinition = serde_json::from_str(json)?;
        self.compile_definition(definition)
    }

    /// Read and compile a definition file; `.json` files are read as JSON,
    /// anything else as YAML.
    pub fn compile_file(&mut self, path: impl AsRef<Path>) -> Result<DeviceParser> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => self.compile_json(&content),
            _ => self.compile_yaml(&content),
        }
    }

    pub fn compile_definition(&mut self, definition: DeviceDefinition) -> Result<DeviceParser> {
        self.node_count = 0;
        self.lookups = self.shared_lookups.clone();
        for (name, table) in definition.lookups {
            self.lookups.insert(name, Arc::new(table));
        }

        if definition.header.is_empty() {
            return Err(ParserError::CompilationError(format!(
                "device '{}' has no header patterns",
                definition.name
            )));
        }
        let header = definition
            .header
            .iter()
            .map(|spec| self.compile_node(spec, HEADER_SOURCE))
            .collect::<Result<Vec<_>>>()?;

        let mut router = match &definition.discriminator {
            Some(field) => MessageRouter::with_discriminator(field),
            None => MessageRouter::new(),
        };
        for (id, spec) in &definition.messages {
            let node = self.compile_node(spec, MESSAGE_SOURCE)?;
            router.add_route(id, node);
        }
        let route_count = router.len();

        let root = Node::sequence(vec![Node::alternative(header), Node::Router(router)]);
        self.node_count += 3;

        let mut ecs = FieldMapping::with_schema("ecs");
        ecs.load_mappings(definition.ecs);
        let mut rsa = FieldMapping::with_schema("rsa");
        rsa.load_mappings(definition.rsa);

        Ok(DeviceParser {
            name: definition.name,
            root,
            route_count,
            ecs,
            rsa,
        })
    }

    fn compile_node(&mut self, spec: &NodeSpec, default_source: &str) -> Result<Node> {
        self.node_count += 1;
        let node = match spec {
            NodeSpec::Dissect {
                pattern,
                source,
                on_success,
            } => Node::Dissect {
                source: source.as_deref().unwrap_or(default_source).to_string(),
                pattern: DissectPattern::compile(pattern)?,
                on_success: self.compile_actions(on_success)?,
            },
            NodeSpec::Copy { source, dest } => Node::copy(source, dest),
            NodeSpec::All {
                nodes,
                on_success,
                on_failure,
            } => Node::Sequence {
                children: self.compile_children(nodes, default_source)?,
                on_success: self.compile_actions(on_success)?,
                on_failure: self.compile_actions(on_failure)?,
            },
            NodeSpec::Any(nodes) => {
                if nodes.is_empty() {
                    return Err(ParserError::CompilationError(
                        "alternative without children".to_string(),
                    ));
                }
                Node::Alternative(self.compile_children(nodes, default_source)?)
            }
            NodeSpec::If {
                field,
                equals,
                then,
                otherwise,
            } => {
                let test = match equals {
                    Some(value) => Condition::equals(field, value),
                    None => Condition::exists(field),
                };
                let then = self.compile_node(then, default_source)?;
                let otherwise = match otherwise {
                    Some(spec) => Some(self.compile_node(spec, default_source)?),
                    None => None,
                };
                Node::conditional(test, then, otherwise)
            }
            NodeSpec::Msg {
                id,
                node,
                on_success,
            } => {
                let child = self.compile_node(node, default_source)?;
                let actions = self.compile_actions(on_success)?;
                let child = if actions.is_empty() {
                    child
                } else {
                    child.then(actions)
                };
                Node::msg(id, child)
            }
            NodeSpec::Router {
                discriminator,
                routes,
            } => {
                let mut router = match discriminator {
                    Some(field) => MessageRouter::with_discriminator(field),
                    None => MessageRouter::new(),
                };
                for (id, route) in routes {
                    router.add_route(id, self.compile_node(route, default_source)?);
                }
                Node::Router(router)
            }
        };
        Ok(node)
    }

    fn compile_children(&mut self, specs: &[NodeSpec], default_source: &str) -> Result<Vec<Node>> {
        specs
            .iter()
            .map(|spec| self.compile_node(spec, default_source))
            .collect()
    }

    fn compile_actions(&self, specs: &[ActionSpec]) -> Result<Vec<Action>> {
        specs.iter().map(|spec| self.compile_action(spec)).collect()
    }

    fn compile_action(&self, spec: &ActionSpec) -> Result<Action> {
        let action = match spec {
            ActionSpec::Set { dest, value } => Action::set(dest, value),
            ActionSpec::Copy { dest, source } => Action::copy(dest, source),
            ActionSpec::Call {
                dest,
                function,
                args,
            } => {
                let function = CallFunction::from_name(function)?;
                function.check_arity(args.len())?;
                Action::call(dest, function, args.clone())
            }
            ActionSpec::Lookup { dest, table, key } => {
                let resolved = self
                    .lookups
                    .get(table)
                    .ok_or_else(|| ParserError::UnknownLookup(table.clone()))?;
                Action::Lookup {
                    dest: dest.clone(),
                    table: Arc::clone(resolved),
                    key: key.clone(),
                }
            }
            ActionSpec::Date {
                dest,
                args,
                formats,
            } => {
                ensure_formats(dest, formats.len())?;
                Action::DateTime {
                    dest: dest.clone(),
                    args: args.clone(),
                    formats: formats.clone(),
                }
            }
            ActionSpec::Duration {
                dest,
                args,
                formats,
            } => {
                ensure_formats(dest, formats.len())?;
                Action::Duration {
                    dest: dest.clone(),
                    args: args.clone(),
                    formats: formats.clone(),
                }
            }
            ActionSpec::Remove(fields) => Action::Remove(fields.clone()),
        };
        Ok(action)
    }
}

fn ensure_formats(dest: &str, count: usize) -> Result<()> {
    if count == 0 {
        return Err(ParserError::CompilationError(format!(
            "no formats given for '{dest}'"
        )));
    }
    Ok(())
}
