//! Combinator tree nodes.
//!
//! A device's parsing logic is a tree of [`Node`]s built once and evaluated
//! per record. Leaves dissect or copy bag fields; inner nodes sequence,
//! alternate, branch on a field, label or route. Failure is reported twice: as the returned
//! [`MatchOutcome`] and as the reserved marker in the [`FieldBag`]. The
//! alternative combinator relies on the marker to carry a failure from before
//! it through to its caller.

use super::action::Action;
use super::context::ParseContext;
use super::router::MessageRouter;
use crate::bag::FieldBag;
use crate::dissect::DissectPattern;
use tracing::{debug, trace};

/// Field stamped with the identifier of the matching message node.
pub const MSG_ID_FIELD: &str = "msg_id1";

/// Result of attempting a node against a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched,
    Failed,
}

impl MatchOutcome {
    /// Outcome as currently signalled by the bag's failure marker.
    pub fn from_bag(bag: &FieldBag) -> Self {
        if bag.is_failed() {
            MatchOutcome::Failed
        } else {
            MatchOutcome::Matched
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched)
    }
}

/// Field test guarding a conditional node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    field: String,
    equals: Option<String>,
}

impl Condition {
    /// Holds when `field` is set.
    pub fn exists(field: &str) -> Self {
        Self {
            field: field.to_string(),
            equals: None,
        }
    }

    /// Holds when `field` is set and its text equals `value`.
    pub fn equals(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            equals: Some(value.to_string()),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn holds(&self, bag: &FieldBag) -> bool {
        match (bag.get(&self.field), &self.equals) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(value), Some(expected)) => value.to_text() == *expected,
        }
    }
}

/// One node of a compiled parsing tree.
#[derive(Debug, Clone)]
pub enum Node {
    /// Dissect the value of `source`, then run `on_success`.
    Dissect {
        source: String,
        pattern: DissectPattern,
        on_success: Vec<Action>,
    },
    /// Copy `source` to `dest`; fails when `source` is unset.
    Copy { source: String, dest: String },
    /// Every child must match, in order.
    Sequence {
        children: Vec<Node>,
        on_success: Vec<Action>,
        on_failure: Vec<Action>,
    },
    /// First matching child wins.
    Alternative(Vec<Node>),
    /// Runs `then` when the test holds, otherwise `otherwise`. Without an
    /// `otherwise` branch a false test leaves the bag untouched.
    Conditional {
        test: Condition,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
    /// Labels a message shape and stamps its id on success.
    Msg { id: String, child: Box<Node> },
    /// Dispatch on a discriminator field.
    Router(MessageRouter),
}

impl Node {
    pub fn dissect(source: &str, pattern: DissectPattern) -> Self {
        Node::Dissect {
            source: source.to_string(),
            pattern,
            on_success: Vec::new(),
        }
    }

    pub fn copy(source: &str, dest: &str) -> Self {
        Node::Copy {
            source: source.to_string(),
            dest: dest.to_string(),
        }
    }

    pub fn sequence(children: Vec<Node>) -> Self {
        Node::Sequence {
            children,
            on_success: Vec::new(),
            on_failure: Vec::new(),
        }
    }

    pub fn alternative(children: Vec<Node>) -> Self {
        Node::Alternative(children)
    }

    pub fn conditional(test: Condition, then: Node, otherwise: Option<Node>) -> Self {
        Node::Conditional {
            test,
            then: Box::new(then),
            otherwise: otherwise.map(Box::new),
        }
    }

    pub fn msg(id: &str, child: Node) -> Self {
        Node::Msg {
            id: id.to_string(),
            child: Box::new(child),
        }
    }

    /// Attach actions run when this node matches.
    ///
    /// Only dissect and sequence nodes carry actions; other nodes are
    /// wrapped in a single-child sequence.
    pub fn then(self, actions: Vec<Action>) -> Self {
        match self {
            Node::Dissect {
                source,
                pattern,
                mut on_success,
            } => {
                on_success.extend(actions);
                Node::Dissect {
                    source,
                    pattern,
                    on_success,
                }
            }
            Node::Sequence {
                children,
                mut on_success,
                on_failure,
            } => {
                on_success.extend(actions);
                Node::Sequence {
                    children,
                    on_success,
                    on_failure,
                }
            }
            other => Node::Sequence {
                children: vec![other],
                on_success: actions,
                on_failure: Vec::new(),
            },
        }
    }

    /// Evaluate this node against `bag`.
    pub fn attempt(&self, ctx: &ParseContext<'_>, bag: &mut FieldBag) -> MatchOutcome {
        match self {
            Node::Dissect {
                source,
                pattern,
                on_success,
            } => attempt_dissect(ctx, bag, source, pattern, on_success),
            Node::Copy { source, dest } => match bag.get(source).cloned() {
                Some(value) => {
                    bag.set(dest, value);
                    MatchOutcome::Matched
                }
                None => {
                    if ctx.debug() {
                        debug!(source = %source, "copy source not set");
                    }
                    bag.mark_failed();
                    MatchOutcome::Failed
                }
            },
            Node::Sequence {
                children,
                on_success,
                on_failure,
            } => {
                for child in children {
                    bag.clear_failure();
                    child.attempt(ctx, bag);
                    if bag.is_failed() {
                        run_actions(ctx, bag, on_failure);
                        return MatchOutcome::Failed;
                    }
                }
                run_actions(ctx, bag, on_success);
                MatchOutcome::Matched
            }
            Node::Alternative(children) => {
                let saved = bag.take_failure();
                for (index, child) in children.iter().enumerate() {
                    bag.clear_failure();
                    child.attempt(ctx, bag);
                    if !bag.is_failed() {
                        if ctx.debug() {
                            trace!(index, "alternative matched");
                        }
                        break;
                    }
                }
                if let Some(flag) = saved {
                    bag.restore_failure(flag);
                }
                MatchOutcome::from_bag(bag)
            }
            Node::Conditional {
                test,
                then,
                otherwise,
            } => {
                let holds = test.holds(bag);
                if ctx.debug() {
                    trace!(field = %test.field(), holds, "condition evaluated");
                }
                let branch = if holds { Some(then) } else { otherwise.as_ref() };
                if let Some(branch) = branch {
                    branch.attempt(ctx, bag);
                }
                MatchOutcome::from_bag(bag)
            }
            Node::Msg { id, child } => {
                child.attempt(ctx, bag);
                if bag.is_failed() {
                    return MatchOutcome::Failed;
                }
                bag.set(MSG_ID_FIELD, id.as_str());
                MatchOutcome::Matched
            }
            Node::Router(router) => router.attempt(ctx, bag),
        }
    }
}

fn attempt_dissect(
    ctx: &ParseContext<'_>,
    bag: &mut FieldBag,
    source: &str,
    pattern: &DissectPattern,
    on_success: &[Action],
) -> MatchOutcome {
    let captured: Option<Vec<(String, String)>> = bag.get_str(source).and_then(|input| {
        pattern.dissect(input).map(|pairs| {
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
    });

    match captured {
        Some(pairs) => {
            for (name, value) in pairs {
                bag.set(&name, value);
            }
            run_actions(ctx, bag, on_success);
            MatchOutcome::Matched
        }
        None => {
            if ctx.debug() {
                debug!(
                    source = %source,
                    pattern = %pattern,
                    input = bag.get_str(source).unwrap_or_default(),
                    "dissect failed"
                );
            }
            bag.mark_failed();
            MatchOutcome::Failed
        }
    }
}

fn run_actions(ctx: &ParseContext<'_>, bag: &mut FieldBag, actions: &[Action]) {
    for action in actions {
        action.apply(ctx, bag);
    }
}
