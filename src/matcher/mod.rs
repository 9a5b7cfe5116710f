//! Combinator runtime for declarative parsing trees.
//!
//! ## Core Components
//!
//! - [`Node`] - dissect/copy leaves, sequence, alternative, conditional, msg and router nodes
//! - [`MessageRouter`] - dispatch by message identifier
//! - [`Action`] - side effects run after a match
//! - [`CallFunction`] - built-in functions available to actions
//! - [`ParseContext`] - configuration, clock and offset for one record
//!
//! Trees hold no per-record state and are shared read-only between threads.

pub mod action;
pub mod context;
pub mod functions;
pub mod node;
pub mod router;

pub use action::{Action, LookupTable, ValueSource};
pub use context::ParseContext;
pub use functions::CallFunction;
pub use node::{Condition, MatchOutcome, Node, MSG_ID_FIELD};
pub use router::{MessageRouter, DEFAULT_DISCRIMINATOR};
