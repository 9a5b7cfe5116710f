//! Conflict resolution when several source fields target one destination.

use crate::bag::FieldValue;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Values accepted by [`MergePolicy::Outcome`].
const OUTCOMES: [&str; 3] = ["success", "failure", "unknown"];
const UNKNOWN_OUTCOME: &str = "unknown";

/// How a value is combined with what a destination already holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Last write wins.
    #[default]
    Overwrite,
    /// Ordered list, values added once in first-seen order.
    AppendUnique,
    /// Lower priority numbers replace higher ones.
    Priority,
    /// `success`/`failure`/`unknown`; a definite outcome is never replaced.
    Outcome,
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Single {
        value: FieldValue,
        priority: Option<u32>,
    },
    List(Vec<FieldValue>),
}

impl Slot {
    fn to_json(&self) -> Value {
        match self {
            Slot::Single { value, .. } => value.to_json(),
            Slot::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
        }
    }
}

/// Intermediate destination bag for one projection pass.
///
/// # Examples
///
/// ```rust
/// use logparser_engine::normalize::{MergeAccumulator, MergePolicy};
/// use logparser_engine::FieldValue;
///
/// let mut acc = MergeAccumulator::new();
/// acc.merge("event.action", MergePolicy::Priority, Some(5), FieldValue::from("generic"));
/// acc.merge("event.action", MergePolicy::Priority, Some(2), FieldValue::from("specific"));
/// acc.merge("event.action", MergePolicy::Priority, Some(7), FieldValue::from("vague"));
/// assert_eq!(acc.get("event.action"), Some(serde_json::json!("specific")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeAccumulator {
    slots: BTreeMap<String, Slot>,
}

impl MergeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `value` into `field` under `policy`.
    ///
    /// A missing priority ranks after every explicit one.
    pub fn merge(
        &mut self,
        field: &str,
        policy: MergePolicy,
        priority: Option<u32>,
        value: FieldValue,
    ) {
        match policy {
            MergePolicy::Overwrite => {
                self.slots.insert(
                    field.to_string(),
                    Slot::Single {
                        value,
                        priority: None,
                    },
                );
            }
            MergePolicy::AppendUnique => {
                let slot = self
                    .slots
                    .entry(field.to_string())
                    .or_insert_with(|| Slot::List(Vec::new()));
                match slot {
                    Slot::List(items) => {
                        if !items.contains(&value) {
                            items.push(value);
                        }
                    }
                    Slot::Single { value: existing, .. } => {
                        if *existing != value {
                            let first = existing.clone();
                            *slot = Slot::List(vec![first, value]);
                        }
                    }
                }
            }
            MergePolicy::Priority => {
                let incoming = priority.unwrap_or(u32::MAX);
                let wins = match self.slots.get(field) {
                    Some(Slot::Single { priority, .. }) => incoming < priority.unwrap_or(u32::MAX),
                    Some(Slot::List(_)) => false,
                    None => true,
                };
                if wins {
                    self.slots.insert(
                        field.to_string(),
                        Slot::Single {
                            value,
                            priority: Some(incoming),
                        },
                    );
                }
            }
            MergePolicy::Outcome => {
                let mut outcome = value.to_text().to_lowercase();
                if !OUTCOMES.contains(&outcome.as_str()) {
                    outcome = UNKNOWN_OUTCOME.to_string();
                }
                let replace = match self.slots.get(field) {
                    Some(Slot::Single { value, .. }) => value.as_str() == Some(UNKNOWN_OUTCOME),
                    Some(Slot::List(_)) => false,
                    None => true,
                };
                if replace {
                    self.slots.insert(
                        field.to_string(),
                        Slot::Single {
                            value: FieldValue::Str(outcome),
                            priority: None,
                        },
                    );
                }
            }
        }
    }

    /// Current JSON value of a destination.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.slots.get(field).map(Slot::to_json)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drain the accumulated destinations as `(field, json)` pairs.
    pub fn into_entries(self) -> impl Iterator<Item = (String, Value)> {
        self.slots
            .into_iter()
            .map(|(field, slot)| (field, slot.to_json()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_policy() {
        assert_eq!(MergePolicy::default(), MergePolicy::Overwrite);
        let policy: MergePolicy = serde_yaml::from_str("append_unique").unwrap();
        assert_eq!(policy, MergePolicy::AppendUnique);
    }

    #[test]
    fn test_overwrite_last_wins() {
        let mut acc = MergeAccumulator::new();
        acc.merge("a", MergePolicy::Overwrite, None, "1".into());
        acc.merge("a", MergePolicy::Overwrite, None, "2".into());
        assert_eq!(acc.get("a"), Some(json!("2")));
    }

    #[test]
    fn test_priority_independent_of_order() {
        for order in [[5u32, 2], [2, 5]] {
            let mut acc = MergeAccumulator::new();
            for prio in order {
                acc.merge(
                    "dst",
                    MergePolicy::Priority,
                    Some(prio),
                    FieldValue::from(format!("p{prio}")),
                );
            }
            assert_eq!(acc.get("dst"), Some(json!("p2")));
        }
    }

    #[test]
    fn test_priority_ties_keep_first() {
        let mut acc = MergeAccumulator::new();
        acc.merge("dst", MergePolicy::Priority, Some(3), "first".into());
        acc.merge("dst", MergePolicy::Priority, Some(3), "second".into());
        assert_eq!(acc.get("dst"), Some(json!("first")));
    }

    #[test]
    fn test_priority_missing_ranks_last() {
        let mut acc = MergeAccumulator::new();
        acc.merge("dst", MergePolicy::Priority, None, "none".into());
        acc.merge("dst", MergePolicy::Priority, Some(100), "explicit".into());
        assert_eq!(acc.get("dst"), Some(json!("explicit")));
    }

    #[test]
    fn test_append_unique() {
        let mut acc = MergeAccumulator::new();
        acc.merge("related.ip", MergePolicy::AppendUnique, None, "10.0.0.1".into());
        acc.merge("related.ip", MergePolicy::AppendUnique, None, "10.0.0.2".into());
        acc.merge("related.ip", MergePolicy::AppendUnique, None, "10.0.0.1".into());
        assert_eq!(acc.get("related.ip"), Some(json!(["10.0.0.1", "10.0.0.2"])));
    }

    #[test]
    fn test_append_onto_single_value() {
        let mut acc = MergeAccumulator::new();
        acc.merge("tags", MergePolicy::Overwrite, None, "a".into());
        acc.merge("tags", MergePolicy::AppendUnique, None, "a".into());
        assert_eq!(acc.get("tags"), Some(json!("a")));
        acc.merge("tags", MergePolicy::AppendUnique, None, "b".into());
        assert_eq!(acc.get("tags"), Some(json!(["a", "b"])));
    }

    #[test]
    fn test_outcome_vocabulary() {
        let mut acc = MergeAccumulator::new();
        acc.merge("event.outcome", MergePolicy::Outcome, None, "Maybe".into());
        assert_eq!(acc.get("event.outcome"), Some(json!("unknown")));

        acc.merge("event.outcome", MergePolicy::Outcome, None, "SUCCESS".into());
        assert_eq!(acc.get("event.outcome"), Some(json!("success")));

        acc.merge("event.outcome", MergePolicy::Outcome, None, "failure".into());
        assert_eq!(acc.get("event.outcome"), Some(json!("success")));
    }

    #[test]
    fn test_into_entries_sorted() {
        let mut acc = MergeAccumulator::new();
        acc.merge("b", MergePolicy::Overwrite, None, FieldValue::Int(2));
        acc.merge("a", MergePolicy::Overwrite, None, FieldValue::Int(1));
        let entries: Vec<_> = acc.into_entries().collect();
        assert_eq!(entries, vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))]);
    }
}
