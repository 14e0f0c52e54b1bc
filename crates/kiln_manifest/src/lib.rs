//! The build manifest data model.
//!
//! A [`Manifest`] owns everything a parser produced from a build description:
//! the scoped variable bindings, the nodes (paths) of the build graph, the
//! pools that limit concurrency, the rule templates, the build commands that
//! instantiate them, and the default targets. It is built once per build and
//! then only read by the scheduler.

#![warn(missing_docs)]

pub mod binding;
pub mod command;
pub mod error;
pub mod manifest;
pub mod node;
pub mod pool;
pub mod rule;

pub use binding::{BindingSet, Scope, ScopeArena, ScopeId};
pub use command::{Command, CommandId};
pub use error::{DefinitionKind, ManifestError};
pub use manifest::Manifest;
pub use node::{Node, NodeId};
pub use pool::{Pool, CONSOLE_POOL};
pub use rule::{Rule, PHONY_RULE, RULE_PARAMETERS};
