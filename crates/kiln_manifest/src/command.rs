//! Build commands: instantiations of a rule over concrete nodes.

use crate::binding::ScopeId;
use crate::node::NodeId;

/// Handle to a command owned by a [`Manifest`](crate::Manifest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub(crate) u32);

impl CommandId {
    /// Returns the raw index of this command.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// One build statement: a rule applied to inputs to produce outputs.
///
/// The node handles and the scope must come from the manifest the command is
/// added to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Name of the rule this command instantiates.
    pub rule: String,

    /// Nodes produced by the command.
    pub outputs: Vec<NodeId>,

    /// Explicit inputs, visible to the command as `$in`.
    pub inputs: Vec<NodeId>,

    /// Inputs that trigger a rebuild but are not passed to the command.
    pub implicit_inputs: Vec<NodeId>,

    /// Inputs that must exist before the command runs but never trigger it.
    pub order_only_inputs: Vec<NodeId>,

    /// The command-local bindings; its parent is the enclosing file scope.
    pub scope: ScopeId,
}

impl Command {
    /// Creates a command with no inputs or outputs.
    pub fn new(rule: impl Into<String>, scope: ScopeId) -> Self {
        Self {
            rule: rule.into(),
            outputs: Vec::new(),
            inputs: Vec::new(),
            implicit_inputs: Vec::new(),
            order_only_inputs: Vec::new(),
            scope,
        }
    }

    /// Every node this command reads, explicit inputs first.
    pub fn all_inputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs
            .iter()
            .chain(&self.implicit_inputs)
            .chain(&self.order_only_inputs)
            .copied()
    }

    /// Every node handle the command refers to.
    pub(crate) fn all_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.outputs.iter().copied().chain(self.all_inputs())
    }
}
