//! The build database interface shared by all backends.

use kiln_manifest::Rule;

use crate::error::DbError;
use crate::result::RuleResult;

/// Storage of rule results and the build iteration counter.
///
/// The build engine drives a database through a state machine:
///
/// ```text
/// idle --build_started()--> in-build --build_complete()--> idle
/// ```
///
/// Reads are valid in both states. Mutations ([`set_current_iteration`],
/// [`set_rule_result`]) are only valid in-build; calling them while idle, or
/// nesting/unbalancing the window calls, is a driver bug and panics.
///
/// Results are keyed by [`Rule::name`]. The database does not check the rule
/// against any manifest, so results for rules that no longer exist remain
/// readable until overwritten or the schema version changes.
///
/// Mutations take `&mut self`, so the borrow checker confines writes to the
/// single build driver; read-only inspection can share `&self` between
/// builds.
///
/// [`set_current_iteration`]: BuildDb::set_current_iteration
/// [`set_rule_result`]: BuildDb::set_rule_result
pub trait BuildDb {
    /// The current build iteration; 0 for a fresh database.
    fn current_iteration(&self) -> Result<u64, DbError>;

    /// Overwrites the build iteration.
    ///
    /// Monotonicity is the caller's responsibility; any value is persisted.
    ///
    /// # Panics
    ///
    /// Panics if no build is in progress.
    fn set_current_iteration(&mut self, value: u64) -> Result<(), DbError>;

    /// Looks up the stored result for `rule`. A miss is `Ok(None)`.
    fn lookup_rule_result(&self, rule: &Rule) -> Result<Option<RuleResult>, DbError>;

    /// Inserts or replaces the result for `rule`.
    ///
    /// A backend may drop repeated dependencies before storing; the set of
    /// distinct dependencies is always preserved.
    ///
    /// # Panics
    ///
    /// Panics if no build is in progress.
    fn set_rule_result(&mut self, rule: &Rule, result: &RuleResult) -> Result<(), DbError>;

    /// Opens the mutation window.
    ///
    /// # Panics
    ///
    /// Panics if a build is already in progress.
    fn build_started(&mut self);

    /// Closes the mutation window; pending writes are committed here.
    ///
    /// # Panics
    ///
    /// Panics if no build is in progress.
    fn build_complete(&mut self);

    /// Returns `true` between `build_started` and `build_complete`.
    fn is_building(&self) -> bool;

    /// Keys of every stored result, sorted.
    fn rule_keys(&self) -> Result<Vec<String>, DbError>;
}

/// Tracks the idle/in-build state and enforces the window contract.
#[derive(Debug, Default)]
pub(crate) struct BuildWindow {
    active: bool,
}

impl BuildWindow {
    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn start(&mut self) {
        assert!(
            !self.active,
            "build_started called while a build is already in progress"
        );
        self.active = true;
    }

    pub(crate) fn finish(&mut self) {
        assert!(
            self.active,
            "build_complete called without a matching build_started"
        );
        self.active = false;
    }

    pub(crate) fn require(&self, operation: &str) {
        assert!(
            self.active,
            "{operation} called outside of a build; call build_started first"
        );
    }
}
