//! Advice phases, join point kinds, and the per-declaration advice set.
//!
//! An [`AdviceSet`] is computed fresh for every declaration during a
//! weaving pass. Its advisor sequences are flattened and sorted once per
//! pass so the generated proxy code is deterministic across repeated runs
//! on identical input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// When a piece of advice runs relative to the intercepted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvicePhase {
    /// Runs before the original executes; cannot replace the result.
    Before,
    /// Fully controls execution; must invoke the proceed chain to reach
    /// the wrapped body.
    Around,
    /// Runs after the original returned; may observe or replace the
    /// result. An exception raised by the advice itself propagates, it is
    /// never suppressed in favour of the original result.
    AfterReturning,
    /// Runs only when the original raised; cannot replace the result.
    AfterThrowing,
}

impl AdvicePhase {
    /// Returns the lower-case identifier used in serialised artefacts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::Around => "around",
            Self::AfterReturning => "after_returning",
            Self::AfterThrowing => "after_throwing",
        }
    }
}

/// The kind of interceptable event a piece of advice attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JoinPointKind {
    /// Construction of a matched class.
    Constructor,
    /// A dynamic (instance) method call.
    Method,
    /// A static method call.
    StaticMethod,
    /// A free function call resolved from a namespace.
    Function,
}

impl JoinPointKind {
    /// Returns the key prefix used for this kind in generated artefacts.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Constructor => "init",
            Self::Method => "method",
            Self::StaticMethod => "static",
            Self::Function => "func",
        }
    }
}

/// One advisor matched against a concrete member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedAdvisor {
    /// The advisor's registry identifier.
    pub id: String,
    /// The advice phase.
    pub phase: AdvicePhase,
    /// Ordering priority; lower runs earlier.
    pub priority: i32,
    /// Registration order, used as the tie-breaker.
    pub order: usize,
}

/// The advice matched against one declaration, keyed by join point kind
/// and member name.
///
/// An empty set means the declaration abstains from weaving.
#[derive(Debug, Clone, Default)]
pub struct AdviceSet {
    entries: BTreeMap<JoinPointKind, BTreeMap<String, Vec<MatchedAdvisor>>>,
}

impl AdviceSet {
    /// Creates an empty advice set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a matched advisor for a member under a join point kind.
    pub fn add(&mut self, kind: JoinPointKind, member: &str, advisor: MatchedAdvisor) {
        self.entries
            .entry(kind)
            .or_default()
            .entry(member.to_owned())
            .or_default()
            .push(advisor);
    }

    /// Returns whether no advisor matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeMap::is_empty)
    }

    /// Returns the members advised under a join point kind, in name order.
    pub fn members(&self, kind: JoinPointKind) -> impl Iterator<Item = (&str, &[MatchedAdvisor])> {
        self.entries
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|(name, advisors)| (name.as_str(), advisors.as_slice()))
    }

    /// Returns the advisors matched for one member, if any.
    #[must_use]
    pub fn for_member(&self, kind: JoinPointKind, member: &str) -> Option<&[MatchedAdvisor]> {
        self.entries
            .get(&kind)
            .and_then(|members| members.get(member))
            .map(Vec::as_slice)
    }

    /// Returns whether a member carries advice under a join point kind.
    #[must_use]
    pub fn has_member(&self, kind: JoinPointKind, member: &str) -> bool {
        self.for_member(kind, member).is_some_and(|a| !a.is_empty())
    }

    /// Iterates over all (kind, member map) groups in deterministic order.
    pub fn groups(
        &self,
    ) -> impl Iterator<Item = (JoinPointKind, &BTreeMap<String, Vec<MatchedAdvisor>>)> {
        self.entries.iter().map(|(kind, members)| (*kind, members))
    }

    /// Flattens and sorts every advisor sequence once per weaving pass.
    ///
    /// The sort is stable by priority with registration order as the tie
    /// breaker, so generated code and any persisted representation are
    /// identical across repeated runs on the same input.
    pub fn flatten_and_sort(&mut self) {
        for members in self.entries.values_mut() {
            for advisors in members.values_mut() {
                advisors.sort_by(|a, b| {
                    a.priority
                        .cmp(&b.priority)
                        .then_with(|| a.order.cmp(&b.order))
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advisor(id: &str, priority: i32, order: usize) -> MatchedAdvisor {
        MatchedAdvisor {
            id: id.to_owned(),
            phase: AdvicePhase::Around,
            priority,
            order,
        }
    }

    #[test]
    fn empty_set_abstains() {
        let set = AdviceSet::new();
        assert!(set.is_empty());
    }

    #[test]
    fn sort_is_stable_by_priority_then_registration_order() {
        let mut set = AdviceSet::new();
        // A(priority 1), B(priority 2), C(priority 1, registered after A).
        set.add(JoinPointKind::Method, "hello", advisor("A", 1, 0));
        set.add(JoinPointKind::Method, "hello", advisor("B", 2, 1));
        set.add(JoinPointKind::Method, "hello", advisor("C", 1, 2));
        set.flatten_and_sort();

        let ids: Vec<&str> = set
            .for_member(JoinPointKind::Method, "hello")
            .expect("advisors")
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(ids, vec!["A", "C", "B"]);
    }

    #[test]
    fn members_are_iterated_in_name_order() {
        let mut set = AdviceSet::new();
        set.add(JoinPointKind::Method, "zeta", advisor("A", 1, 0));
        set.add(JoinPointKind::Method, "alpha", advisor("A", 1, 0));

        let names: Vec<&str> = set
            .members(JoinPointKind::Method)
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn kinds_partition_members() {
        let mut set = AdviceSet::new();
        set.add(JoinPointKind::Method, "hello", advisor("A", 1, 0));
        set.add(JoinPointKind::StaticMethod, "hello", advisor("B", 1, 1));

        assert!(set.has_member(JoinPointKind::Method, "hello"));
        assert!(set.has_member(JoinPointKind::StaticMethod, "hello"));
        assert!(!set.has_member(JoinPointKind::Constructor, "hello"));
    }
}
