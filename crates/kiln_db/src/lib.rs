//! Durable storage of per-rule build results.
//!
//! The build engine asks this crate one question per rule: "what did you
//! compute for this rule last time, and in which build?" Results are keyed
//! by rule name and stored alongside a global build iteration counter.
//! Mutations happen inside a build window opened by
//! [`BuildDb::build_started`] and closed by [`BuildDb::build_complete`].
//!
//! Two backends implement [`BuildDb`]: [`SqliteBuildDb`] for real builds and
//! [`MemoryBuildDb`] for tests.

#![warn(missing_docs)]

pub mod db;
pub mod error;
pub mod memory;
pub mod record;
pub mod result;
pub mod sqlite;

use std::path::Path;

pub use db::BuildDb;
pub use error::DbError;
pub use memory::MemoryBuildDb;
pub use result::RuleResult;
pub use sqlite::SqliteBuildDb;

/// Opens (creating if needed) the SQLite build database at `path`.
///
/// If the database was written with a different `client_schema_version`, all
/// stored results are discarded and the iteration counter restarts at 0.
pub fn open(path: &Path, client_schema_version: u32) -> Result<SqliteBuildDb, DbError> {
    SqliteBuildDb::open(path, client_schema_version)
}
