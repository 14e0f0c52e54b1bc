//! Shared foundational types used across the kiln build engine.
//!
//! Currently this is the content signature type that both the manifest model
//! and the result store agree on.

#![warn(missing_docs)]

pub mod hash;

pub use hash::ContentHash;
