//! Configuration types deserialized from `kiln.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// The top-level configuration parsed from `kiln.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct KilnConfig {
    /// Build result database settings.
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Where and how the build result database is opened.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file, relative to the project directory unless absolute.
    pub path: String,
    /// Version of the stored result layout. Changing it discards all results.
    pub schema_version: u32,
    /// SQLite journal mode.
    pub journal_mode: JournalMode,
    /// SQLite synchronous level.
    pub synchronous: Synchronous,
    /// How long to wait on a locked database before failing, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Default database location within a project.
    pub const DEFAULT_PATH: &'static str = ".kiln/build.db";

    /// Resolves [`path`](Self::path) against the project directory.
    pub fn resolve_path(&self, project_dir: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_dir.join(path)
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: Self::DEFAULT_PATH.to_string(),
            schema_version: 1,
            journal_mode: JournalMode::default(),
            synchronous: Synchronous::default(),
            busy_timeout_ms: 5000,
        }
    }
}

/// SQLite `journal_mode` setting.
///
/// Only modes that keep a crash mid-transaction atomic are accepted, so
/// `memory` and `off` are not offered.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    /// Write-ahead log (default).
    #[default]
    Wal,
    /// Rollback journal deleted after each transaction.
    Delete,
    /// Rollback journal truncated after each transaction.
    Truncate,
}

impl JournalMode {
    /// The value as SQLite spells it in a `PRAGMA`.
    pub fn as_pragma(self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
        }
    }
}

/// SQLite `synchronous` setting.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Synchronous {
    /// No syncing; fastest, not crash safe against OS failure.
    Off,
    /// Sync at critical moments (default).
    #[default]
    Normal,
    /// Sync on every commit.
    Full,
}

impl Synchronous {
    /// The value as SQLite spells it in a `PRAGMA`.
    pub fn as_pragma(self) -> &'static str {
        match self {
            Synchronous::Off => "OFF",
            Synchronous::Normal => "NORMAL",
            Synchronous::Full => "FULL",
        }
    }
}
