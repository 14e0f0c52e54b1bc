//! The manifest: owner of every entity parsed from a build description.

use std::collections::HashMap;

use tracing::debug;

use crate::binding::{BindingSet, Scope, ScopeArena, ScopeId};
use crate::command::{Command, CommandId};
use crate::error::{DefinitionKind, ManifestError};
use crate::node::{Node, NodeId};
use crate::pool::{Pool, CONSOLE_POOL};
use crate::rule::{Rule, PHONY_RULE};

/// The complete description of a build.
///
/// Nodes, pools and rules are each unique by name. The manifest owns all of
/// them (and all binding scopes) for its whole lifetime; everything else
/// refers to them through [`NodeId`], [`ScopeId`], [`CommandId`] or by name.
/// A manifest is assembled once by a parser and then only read.
#[derive(Debug, Clone)]
pub struct Manifest {
    scopes: ScopeArena,
    nodes: Vec<Node>,
    node_ids: HashMap<String, NodeId>,
    pools: HashMap<String, Pool>,
    rules: HashMap<String, Rule>,
    commands: Vec<Command>,
    default_targets: Vec<NodeId>,
}

impl Manifest {
    /// Creates a manifest holding only the built-in `console` pool (depth 1)
    /// and the built-in `phony` rule.
    pub fn new() -> Self {
        let mut pools = HashMap::new();
        pools.insert(CONSOLE_POOL.to_string(), Pool::with_depth(CONSOLE_POOL, 1));
        let mut rules = HashMap::new();
        rules.insert(PHONY_RULE.to_string(), Rule::new(PHONY_RULE));

        Self {
            scopes: ScopeArena::new(),
            nodes: Vec::new(),
            node_ids: HashMap::new(),
            pools,
            rules,
            commands: Vec::new(),
            default_targets: Vec::new(),
        }
    }

    // -- bindings ----------------------------------------------------------

    /// The top-level bindings.
    pub fn bindings(&self) -> Scope<'_> {
        self.scopes.root()
    }

    /// The top-level bindings, for insertion.
    pub fn bindings_mut(&mut self) -> &mut BindingSet {
        self.scopes.root_mut()
    }

    /// All binding scopes of this manifest.
    pub fn scopes(&self) -> &ScopeArena {
        &self.scopes
    }

    /// Creates a nested scope under `parent`.
    pub fn new_scope(&mut self, parent: ScopeId) -> Result<ScopeId, ManifestError> {
        self.scopes
            .new_scope(parent)
            .ok_or(ManifestError::ForeignHandle {
                kind: "scope",
                index: parent.as_raw(),
            })
    }

    /// A read-only view of a scope.
    pub fn scope(&self, id: ScopeId) -> Option<Scope<'_>> {
        self.scopes.scope(id)
    }

    /// Mutable access to a scope's own bindings.
    pub fn scope_mut(&mut self, id: ScopeId) -> Option<&mut BindingSet> {
        self.scopes.get_mut(id)
    }

    // -- nodes -------------------------------------------------------------

    /// Adds a node, failing if the path is empty or already present.
    pub fn add_node(&mut self, path: impl Into<String>) -> Result<NodeId, ManifestError> {
        let node = Node::new(path)?;
        if self.node_ids.contains_key(node.path()) {
            debug!(path = node.path(), "rejected duplicate node");
            return Err(ManifestError::Duplicate {
                kind: DefinitionKind::Node,
                name: node.path().to_string(),
            });
        }
        self.push_node(node)
    }

    /// Returns the node for `path`, creating it on first reference.
    ///
    /// This is how a parser interns the paths named by build statements.
    pub fn get_or_insert_node(&mut self, path: &str) -> Result<NodeId, ManifestError> {
        if let Some(&id) = self.node_ids.get(path) {
            return Ok(id);
        }
        let node = Node::new(path)?;
        self.push_node(node)
    }

    fn push_node(&mut self, node: Node) -> Result<NodeId, ManifestError> {
        let index = u32::try_from(self.nodes.len())
            .map_err(|_| ManifestError::TooMany { kind: "node" })?;
        let id = NodeId(index);
        self.node_ids.insert(node.path().to_string(), id);
        self.nodes.push(node);
        Ok(id)
    }

    /// Returns the node behind a handle.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    /// Looks up a node's handle by path.
    pub fn node_id(&self, path: &str) -> Option<NodeId> {
        self.node_ids.get(path).copied()
    }

    /// Looks up a node by path.
    pub fn find_node(&self, path: &str) -> Option<&Node> {
        self.node_id(path).and_then(|id| self.node(id))
    }

    /// All nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            // push_node keeps every index within u32.
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // -- pools -------------------------------------------------------------

    /// Adds a pool, failing if one with the same name exists.
    pub fn add_pool(&mut self, pool: Pool) -> Result<(), ManifestError> {
        if self.pools.contains_key(pool.name()) {
            debug!(name = pool.name(), "rejected duplicate pool");
            return Err(ManifestError::Duplicate {
                kind: DefinitionKind::Pool,
                name: pool.name().to_string(),
            });
        }
        self.pools.insert(pool.name().to_string(), pool);
        Ok(())
    }

    /// Looks up a pool by name.
    pub fn pool(&self, name: &str) -> Option<&Pool> {
        self.pools.get(name)
    }

    /// Looks up a pool by name for modification.
    pub fn pool_mut(&mut self, name: &str) -> Option<&mut Pool> {
        self.pools.get_mut(name)
    }

    /// All pools, keyed by name.
    pub fn pools(&self) -> &HashMap<String, Pool> {
        &self.pools
    }

    // -- rules -------------------------------------------------------------

    /// Adds a rule after checking its name is unused and that every
    /// parameter is a recognized one.
    pub fn add_rule(&mut self, rule: Rule) -> Result<(), ManifestError> {
        if self.rules.contains_key(rule.name()) {
            debug!(name = rule.name(), "rejected duplicate rule");
            return Err(ManifestError::Duplicate {
                kind: DefinitionKind::Rule,
                name: rule.name().to_string(),
            });
        }
        if let Some(parameter) = rule.first_invalid_parameter() {
            return Err(ManifestError::InvalidRuleParameter {
                rule: rule.name().to_string(),
                parameter: parameter.to_string(),
            });
        }
        self.rules.insert(rule.name().to_string(), rule);
        Ok(())
    }

    /// Looks up a rule by name.
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    /// Sets a parameter on an already added rule.
    ///
    /// Names outside the recognized parameter set are refused here just as
    /// [`add_rule`](Self::add_rule) refuses them, so a rule held by the
    /// manifest never carries one.
    pub fn set_rule_parameter(
        &mut self,
        rule_name: &str,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), ManifestError> {
        let rule = self
            .rules
            .get_mut(rule_name)
            .ok_or_else(|| ManifestError::UnknownRule {
                name: rule_name.to_string(),
            })?;
        if !Rule::is_valid_parameter_name(name) {
            return Err(ManifestError::InvalidRuleParameter {
                rule: rule_name.to_string(),
                parameter: name.to_string(),
            });
        }
        rule.set_parameter(name, value);
        Ok(())
    }

    /// All rules, keyed by name.
    pub fn rules(&self) -> &HashMap<String, Rule> {
        &self.rules
    }

    /// The pool named by a rule's `pool` parameter, if it has one.
    pub fn rule_pool(&self, rule_name: &str) -> Result<Option<&Pool>, ManifestError> {
        let rule = self.rule(rule_name).ok_or_else(|| ManifestError::UnknownRule {
            name: rule_name.to_string(),
        })?;
        match rule.parameter("pool") {
            None | Some("") => Ok(None),
            Some(name) => self
                .pool(name)
                .map(Some)
                .ok_or_else(|| ManifestError::UnknownPool {
                    name: name.to_string(),
                }),
        }
    }

    // -- commands ----------------------------------------------------------

    /// Adds a build command.
    ///
    /// The rule must already be defined, and every node handle and the scope
    /// must belong to this manifest.
    pub fn add_command(&mut self, command: Command) -> Result<CommandId, ManifestError> {
        if !self.rules.contains_key(&command.rule) {
            return Err(ManifestError::UnknownRule {
                name: command.rule.clone(),
            });
        }
        if let Some(bad) = command.all_nodes().find(|id| self.node(*id).is_none()) {
            return Err(ManifestError::ForeignHandle {
                kind: "node",
                index: bad.as_raw(),
            });
        }
        if !self.scopes.contains(command.scope) {
            return Err(ManifestError::ForeignHandle {
                kind: "scope",
                index: command.scope.as_raw(),
            });
        }
        let index = u32::try_from(self.commands.len())
            .map_err(|_| ManifestError::TooMany { kind: "command" })?;
        let id = CommandId(index);
        self.commands.push(command);
        Ok(id)
    }

    /// Returns the command behind a handle.
    pub fn command(&self, id: CommandId) -> Option<&Command> {
        self.commands.get(id.0 as usize)
    }

    /// All commands in insertion order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Resolves a variable as seen by a command.
    ///
    /// Bindings local to the command win, then the rule's own (unexpanded)
    /// parameter of that name, then the scopes enclosing the command. A
    /// command whose scope is the root has no local bindings. Unknown names
    /// and unknown commands resolve to `""`.
    pub fn lookup_command_variable(&self, id: CommandId, name: &str) -> &str {
        let Some(command) = self.command(id) else {
            return "";
        };

        let mut outer = Some(command.scope);
        if command.scope != ScopeId::ROOT {
            if let Some(local) = self.scopes.get(command.scope) {
                if let Some(value) = local.get(name) {
                    return value;
                }
                outer = local.parent();
            }
        }

        if let Some(value) = self.rule(&command.rule).and_then(|r| r.parameter(name)) {
            return value;
        }

        match outer {
            Some(scope) => self.scopes.lookup(scope, name),
            None => "",
        }
    }

    // -- default targets ---------------------------------------------------

    /// Marks an existing node as a default target.
    pub fn add_default_target(&mut self, path: &str) -> Result<(), ManifestError> {
        let id = self.node_id(path).ok_or_else(|| ManifestError::UnknownNode {
            path: path.to_string(),
        })?;
        self.default_targets.push(id);
        Ok(())
    }

    /// The default targets, in declaration order.
    pub fn default_targets(&self) -> &[NodeId] {
        &self.default_targets
    }

    /// The default target nodes, in declaration order.
    pub fn default_target_nodes(&self) -> impl Iterator<Item = &Node> {
        self.default_targets.iter().filter_map(|id| self.node(*id))
    }
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}
