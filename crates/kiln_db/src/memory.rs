//! In-memory build database for tests and dry runs.

use std::collections::HashMap;

use kiln_manifest::Rule;

use crate::db::{BuildDb, BuildWindow};
use crate::error::DbError;
use crate::result::RuleResult;

/// A [`BuildDb`] that keeps everything in process memory.
///
/// Results are stored exactly as given, duplicate dependencies included.
/// Nothing survives the value being dropped.
#[derive(Debug, Default)]
pub struct MemoryBuildDb {
    iteration: u64,
    results: HashMap<String, RuleResult>,
    window: BuildWindow,
}

impl MemoryBuildDb {
    /// Creates an empty database at iteration 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored results.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if no results are stored.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl BuildDb for MemoryBuildDb {
    fn current_iteration(&self) -> Result<u64, DbError> {
        Ok(self.iteration)
    }

    fn set_current_iteration(&mut self, value: u64) -> Result<(), DbError> {
        self.window.require("set_current_iteration");
        self.iteration = value;
        Ok(())
    }

    fn lookup_rule_result(&self, rule: &Rule) -> Result<Option<RuleResult>, DbError> {
        Ok(self.results.get(rule.name()).cloned())
    }

    fn set_rule_result(&mut self, rule: &Rule, result: &RuleResult) -> Result<(), DbError> {
        self.window.require("set_rule_result");
        self.results.insert(rule.name().to_string(), result.clone());
        Ok(())
    }

    fn build_started(&mut self) {
        self.window.start();
    }

    fn build_complete(&mut self) {
        self.window.finish();
    }

    fn is_building(&self) -> bool {
        self.window.is_active()
    }

    fn rule_keys(&self) -> Result<Vec<String>, DbError> {
        let mut keys: Vec<String> = self.results.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
