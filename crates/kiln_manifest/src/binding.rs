//! Scoped variable bindings.
//!
//! Binding sets form a tree rooted at the manifest's top-level bindings. Each
//! set knows its parent only by [`ScopeId`], an index into the [`ScopeArena`]
//! that owns every set, so a child never owns (or outlives) its parent.
//! Lookups walk from a scope towards the root and fall back to the empty
//! string, the way make and shell variables behave.

use std::collections::BTreeMap;

/// Handle to a binding set inside a [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The top-level scope every arena starts with.
    pub const ROOT: ScopeId = ScopeId(0);

    /// Returns the raw index of this scope.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single scope's name to value bindings plus a link to its parent.
#[derive(Debug, Clone, Default)]
pub struct BindingSet {
    parent: Option<ScopeId>,
    entries: BTreeMap<String, String>,
}

impl BindingSet {
    /// The enclosing scope, or `None` for the root.
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// This scope's own bindings, excluding anything inherited.
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Looks a name up in this scope only.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    /// Binds `name` in this scope, replacing any previous value here.
    ///
    /// Parent and child scopes are unaffected.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }
}

/// Owner of every binding set of a manifest.
///
/// Scopes are append-only and a scope's parent must already exist when the
/// scope is created, so a parent's index is always smaller than its child's
/// and the chain cannot cycle.
#[derive(Debug, Clone)]
pub struct ScopeArena {
    scopes: Vec<BindingSet>,
}

impl ScopeArena {
    /// Creates an arena holding only an empty root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![BindingSet::default()],
        }
    }

    /// Creates an empty child scope of `parent`.
    ///
    /// Returns `None` if `parent` was not issued by this arena.
    pub fn new_scope(&mut self, parent: ScopeId) -> Option<ScopeId> {
        if !self.contains(parent) {
            return None;
        }
        let id = ScopeId(u32::try_from(self.scopes.len()).ok()?);
        self.scopes.push(BindingSet {
            parent: Some(parent),
            entries: BTreeMap::new(),
        });
        Some(id)
    }

    /// Returns `true` if `id` names a scope of this arena.
    pub fn contains(&self, id: ScopeId) -> bool {
        id.index() < self.scopes.len()
    }

    /// Number of scopes, including the root.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Always `false`: the root scope exists from construction.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Returns the binding set for `id`.
    pub fn get(&self, id: ScopeId) -> Option<&BindingSet> {
        self.scopes.get(id.index())
    }

    /// Returns the binding set for `id` for insertion.
    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut BindingSet> {
        self.scopes.get_mut(id.index())
    }

    /// Returns a read-only view of the scope `id`.
    pub fn scope(&self, id: ScopeId) -> Option<Scope<'_>> {
        self.contains(id).then_some(Scope { arena: self, id })
    }

    /// Returns a read-only view of the root scope.
    pub fn root(&self) -> Scope<'_> {
        Scope {
            arena: self,
            id: ScopeId::ROOT,
        }
    }

    /// The root scope's bindings, for insertion.
    pub fn root_mut(&mut self) -> &mut BindingSet {
        &mut self.scopes[ScopeId::ROOT.index()]
    }

    /// Resolves `name` starting at `id` and walking towards the root.
    ///
    /// Unbound names (and unknown scopes) resolve to the empty string.
    pub fn lookup(&self, id: ScopeId, name: &str) -> &str {
        let mut current = Some(id);
        while let Some(scope_id) = current {
            let Some(set) = self.get(scope_id) else {
                break;
            };
            if let Some(value) = set.get(name) {
                return value;
            }
            current = set.parent;
        }
        ""
    }
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

/// A borrowed view of one scope that resolves through its parents.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    arena: &'a ScopeArena,
    id: ScopeId,
}

impl<'a> Scope<'a> {
    /// The handle of this scope.
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Resolves `name` here or in the nearest enclosing scope, or `""`.
    pub fn lookup(&self, name: &str) -> &'a str {
        self.arena.lookup(self.id, name)
    }

    /// This scope's own bindings.
    pub fn entries(&self) -> &'a BTreeMap<String, String> {
        &self.arena.scopes[self.id.index()].entries
    }

    /// The enclosing scope, or `None` at the root.
    pub fn parent(&self) -> Option<Scope<'a>> {
        let parent = self.arena.scopes[self.id.index()].parent?;
        Some(Scope {
            arena: self.arena,
            id: parent,
        })
    }
}
