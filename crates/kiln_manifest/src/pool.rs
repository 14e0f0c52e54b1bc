//! Concurrency pools.

/// Name of the built-in pool that serializes commands needing the terminal.
pub const CONSOLE_POOL: &str = "console";

/// A named bucket limiting how many commands assigned to it run at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    name: String,
    /// 0 means unspecified (unbounded).
    depth: u32,
}

impl Pool {
    /// Creates a pool with an unspecified depth.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depth: 0,
        }
    }

    /// Creates a pool with the given depth.
    pub fn with_depth(name: impl Into<String>, depth: u32) -> Self {
        Self {
            name: name.into(),
            depth,
        }
    }

    /// The pool's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The concurrency limit, or 0 if unbounded.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Sets the concurrency limit.
    pub fn set_depth(&mut self, value: u32) {
        self.depth = value;
    }

    /// Returns `true` if no depth was specified.
    pub fn is_unbounded(&self) -> bool {
        self.depth == 0
    }
}
