//! Build graph nodes.

use crate::error::ManifestError;

/// Handle to a node owned by a [`Manifest`](crate::Manifest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the raw index of this node.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// A unique path as it appears in the manifest.
///
/// The path is taken verbatim; no normalization is applied, so `a/b` and
/// `./a/b` are distinct nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    path: String,
}

impl Node {
    /// Creates a node for `path`, which must not be empty.
    pub fn new(path: impl Into<String>) -> Result<Self, ManifestError> {
        let path = path.into();
        if path.is_empty() {
            return Err(ManifestError::EmptyNodePath);
        }
        Ok(Self { path })
    }

    /// The node's path.
    pub fn path(&self) -> &str {
        &self.path
    }
}
