//! Dispatch on a parsed message identifier.

use super::context::ParseContext;
use super::node::{MatchOutcome, Node};
use crate::bag::{FieldBag, FieldValue};
use std::collections::HashMap;
use tracing::debug;

/// Bag field read by a router unless configured otherwise.
pub const DEFAULT_DISCRIMINATOR: &str = "messageid";

/// Selects the node for a record by the value of a discriminator field.
///
/// A missing discriminator or an id with no route leaves the bag untouched.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::matcher::{MessageRouter, Node, ParseContext};
/// use logparser_engine::{DissectPattern, FieldBag, ParserConfig};
///
/// let mut router = MessageRouter::new();
/// router.add_route(
///     "LOGIN",
///     Node::dissect("payload", DissectPattern::compile("user=%{username}")?),
/// );
///
/// let config = ParserConfig::default();
/// let ctx = ParseContext::for_event(&config, None);
/// let mut bag = FieldBag::new();
/// bag.set("messageid", "LOGIN");
/// bag.set("payload", "user=alice");
/// assert!(router.attempt(&ctx, &mut bag).is_match());
/// assert_eq!(bag.get_str("username"), Some("alice"));
/// # Ok::<(), logparser_engine::ParserError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MessageRouter {
    discriminator: String,
    routes: HashMap<String, Node>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::with_discriminator(DEFAULT_DISCRIMINATOR)
    }

    pub fn with_discriminator(discriminator: &str) -> Self {
        Self {
            discriminator: discriminator.to_string(),
            routes: HashMap::new(),
        }
    }

    /// Register `node` for `id`, replacing any earlier route.
    pub fn add_route(&mut self, id: &str, node: Node) {
        self.routes.insert(id.to_string(), node);
    }

    pub fn route(&self, id: &str) -> Option<&Node> {
        self.routes.get(id)
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn attempt(&self, ctx: &ParseContext<'_>, bag: &mut FieldBag) -> MatchOutcome {
        let id = match bag.get(&self.discriminator).map(FieldValue::to_text) {
            Some(id) => id,
            None => {
                if ctx.debug() {
                    debug!(field = %self.discriminator, "no message id in record");
                }
                return MatchOutcome::from_bag(bag);
            }
        };
        match self.route(&id) {
            Some(node) => node.attempt(ctx, bag),
            None => {
                if ctx.debug() {
                    debug!(field = %self.discriminator, id = %id, "no route for message id");
                }
                MatchOutcome::from_bag(bag)
            }
        }
    }
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}
