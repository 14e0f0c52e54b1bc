//! Validation errors raised while assembling a manifest.

use std::fmt;

/// The kind of named entity a manifest keeps a unique table of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    /// A build graph node (path).
    Node,
    /// A concurrency pool.
    Pool,
    /// A rule template.
    Rule,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DefinitionKind::Node => "node",
            DefinitionKind::Pool => "pool",
            DefinitionKind::Rule => "rule",
        };
        f.write_str(s)
    }
}

/// Errors that indicate a malformed manifest.
///
/// These are distinct from store I/O errors: they describe the build
/// description itself and are fatal to the build that produced them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    /// A node, pool or rule with this name is already defined.
    #[error("duplicate {kind} '{name}'")]
    Duplicate {
        /// Which table the name collided in.
        kind: DefinitionKind,
        /// The colliding name.
        name: String,
    },

    /// A node was constructed from an empty path.
    #[error("node path must not be empty")]
    EmptyNodePath,

    /// A rule carries a parameter outside the recognized set.
    #[error("unexpected parameter '{parameter}' in rule '{rule}'")]
    InvalidRuleParameter {
        /// The rule being validated.
        rule: String,
        /// The unrecognized parameter name.
        parameter: String,
    },

    /// A path was referenced that is not a node of this manifest.
    #[error("unknown node '{path}'")]
    UnknownNode {
        /// The referenced path.
        path: String,
    },

    /// A command names a rule that is not defined.
    #[error("unknown rule '{name}'")]
    UnknownRule {
        /// The referenced rule name.
        name: String,
    },

    /// A rule names a pool that is not defined.
    #[error("unknown pool '{name}'")]
    UnknownPool {
        /// The referenced pool name.
        name: String,
    },

    /// A handle was passed that was not issued by this manifest.
    #[error("{kind} handle #{index} does not belong to this manifest")]
    ForeignHandle {
        /// What the handle refers to ("node", "scope", ...).
        kind: &'static str,
        /// The raw handle index.
        index: u32,
    },

    /// A table outgrew the range of its 32-bit handles.
    #[error("too many {kind}s in one manifest")]
    TooMany {
        /// What overflowed ("node", "command").
        kind: &'static str,
    },
}
