//! Parsing and validation of `kiln.toml` project configuration files.
//!
//! The configuration currently covers how the build result database is
//! opened: where it lives, which client schema version the build engine
//! expects, and the SQLite durability settings.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use types::*;
