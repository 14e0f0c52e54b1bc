//! The record stored for each rule.

use std::collections::HashSet;

use kiln_common::ContentHash;
use serde::{Deserialize, Serialize};

/// The last computed result of a rule, plus what the scheduler needs to
/// judge whether it is still valid.
///
/// The database stores and returns this verbatim (up to dependency
/// deduplication); it never interprets the fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    /// The computed value, opaque to the database.
    pub value: Vec<u8>,

    /// Signature of the inputs the value was computed from.
    pub signature: ContentHash,

    /// Iteration at which the result was last computed or confirmed valid.
    pub computed_at: u64,

    /// Iteration at which the value last changed.
    pub built_at: u64,

    /// Keys of the rules this result was computed from.
    pub dependencies: Vec<String>,
}

impl RuleResult {
    /// Creates a result computed and built at `iteration`, with no
    /// dependencies.
    pub fn new(value: impl Into<Vec<u8>>, signature: ContentHash, iteration: u64) -> Self {
        Self {
            value: value.into(),
            signature,
            computed_at: iteration,
            built_at: iteration,
            dependencies: Vec::new(),
        }
    }

    /// Replaces the dependency list.
    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if the result records any dependency.
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    /// Removes repeated dependencies, keeping the first occurrence of each.
    ///
    /// Returns how many entries were removed.
    pub fn dedup_dependencies(&mut self) -> usize {
        let before = self.dependencies.len();
        let mut seen = HashSet::with_capacity(before);
        self.dependencies.retain(|dep| seen.insert(dep.clone()));
        before - self.dependencies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_both_iterations() {
        let r = RuleResult::new(b"ok".to_vec(), ContentHash::from_bytes(b"cc"), 4);
        assert_eq!(r.computed_at, 4);
        assert_eq!(r.built_at, 4);
        assert!(!r.has_dependencies());
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let mut r = RuleResult::default().with_dependencies(["b", "a", "b", "c", "a"]);
        assert_eq!(r.dedup_dependencies(), 2);
        assert_eq!(r.dependencies, vec!["b", "a", "c"]);
    }

    #[test]
    fn dedup_without_repeats_is_noop() {
        let mut r = RuleResult::default().with_dependencies(["x", "y"]);
        assert_eq!(r.dedup_dependencies(), 0);
        assert_eq!(r.dependencies.len(), 2);
    }

    #[test]
    fn empty_and_nonempty_dependencies_differ() {
        let none = RuleResult::default();
        let some = RuleResult::default().with_dependencies(["dep"]);
        assert_ne!(none, some);
        assert!(some.has_dependencies());
    }
}
