//! Contract tests for every `BuildDb` backend.
//!
//! Each property is written once against `&mut dyn BuildDb` and run on both
//! the in-memory and the SQLite backend. Properties that need a second
//! session on the same file use the SQLite backend directly.

use std::path::Path;
use std::process::Stdio;

use kiln_common::ContentHash;
use kiln_db::{BuildDb, DbError, MemoryBuildDb, RuleResult, SqliteBuildDb};
use kiln_manifest::{Command, Manifest, Rule, ScopeId};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sqlite_db() -> (TempDir, SqliteBuildDb) {
    let dir = tempfile::tempdir().unwrap();
    let db = kiln_db::open(&dir.path().join(".kiln/build.db"), 1).unwrap();
    (dir, db)
}

/// Runs `check` against a fresh database of each backend.
fn for_each_backend(check: impl Fn(&mut dyn BuildDb)) {
    let mut memory = MemoryBuildDb::new();
    check(&mut memory);

    let (_dir, mut sqlite) = sqlite_db();
    check(&mut sqlite);
}

fn compiled(value: &str, iteration: u64) -> RuleResult {
    RuleResult::new(
        value.as_bytes().to_vec(),
        ContentHash::from_bytes(value.as_bytes()),
        iteration,
    )
}

fn write_in_build(db: &mut dyn BuildDb, rule: &Rule, result: &RuleResult) {
    db.build_started();
    db.set_rule_result(rule, result).unwrap();
    db.build_complete();
}

// ---------------------------------------------------------------------------
// Properties shared by all backends
// ---------------------------------------------------------------------------

#[test]
fn fresh_database_reports_misses_not_errors() {
    for_each_backend(|db| {
        assert_eq!(db.current_iteration().unwrap(), 0);
        assert!(db.lookup_rule_result(&Rule::new("cc")).unwrap().is_none());
        assert!(db.rule_keys().unwrap().is_empty());
    });
}

#[test]
fn set_then_lookup_returns_equal_result() {
    for_each_backend(|db| {
        let rule = Rule::new("cc");
        let result = compiled("main.o", 1).with_dependencies(["src/main.c", "include/util.h"]);
        write_in_build(db, &rule, &result);

        let found = db.lookup_rule_result(&rule).unwrap();
        assert_eq!(found, Some(result));
    });
}

#[test]
fn iteration_set_then_get() {
    for_each_backend(|db| {
        db.build_started();
        db.set_current_iteration(5).unwrap();
        assert_eq!(db.current_iteration().unwrap(), 5);
        db.build_complete();
        assert_eq!(db.current_iteration().unwrap(), 5);
    });
}

#[test]
fn non_increasing_iteration_is_persisted() {
    for_each_backend(|db| {
        db.build_started();
        db.set_current_iteration(10).unwrap();
        db.set_current_iteration(3).unwrap();
        db.build_complete();
        assert_eq!(db.current_iteration().unwrap(), 3);
    });
}

#[test]
fn read_your_writes_inside_build() {
    for_each_backend(|db| {
        let rule = Rule::new("link");
        write_in_build(db, &rule, &compiled("old", 1));

        db.build_started();
        assert!(db.is_building());
        db.set_rule_result(&rule, &compiled("new", 2)).unwrap();
        let seen = db.lookup_rule_result(&rule).unwrap().unwrap();
        assert_eq!(seen.value, b"new");
        db.build_complete();
        assert!(!db.is_building());
    });
}

#[test]
fn duplicate_dependencies_keep_every_distinct_entry() {
    for_each_backend(|db| {
        let rule = Rule::new("link");
        let result = compiled("app", 1).with_dependencies(["a.o", "b.o", "a.o", "c.o", "b.o"]);
        write_in_build(db, &rule, &result);

        let stored = db.lookup_rule_result(&rule).unwrap().unwrap();
        let mut distinct = stored.dependencies.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct, vec!["a.o", "b.o", "c.o"]);
    });
}

#[test]
fn results_with_and_without_dependencies_are_distinct() {
    for_each_backend(|db| {
        let leaf = Rule::new("leaf");
        let inner = Rule::new("inner");
        db.build_started();
        db.set_rule_result(&leaf, &compiled("x", 1)).unwrap();
        db.set_rule_result(&inner, &compiled("x", 1).with_dependencies(["leaf"]))
            .unwrap();
        db.build_complete();

        let leaf = db.lookup_rule_result(&leaf).unwrap().unwrap();
        let inner = db.lookup_rule_result(&inner).unwrap().unwrap();
        assert!(!leaf.has_dependencies());
        assert!(inner.has_dependencies());
        assert_ne!(leaf, inner);
    });
}

#[test]
fn rule_identity_is_its_name() {
    for_each_backend(|db| {
        let mut first = Rule::new("cc");
        first.set_parameter("command", "cc -O2 -c $in");
        let mut second = Rule::new("cc");
        second.set_parameter("command", "cc -O0 -c $in");

        write_in_build(db, &first, &compiled("obj", 1));
        let found = db.lookup_rule_result(&second).unwrap().unwrap();
        assert_eq!(found.value, b"obj");
    });
}

#[test]
fn stale_rule_not_in_manifest_is_accepted() {
    for_each_backend(|db| {
        let manifest = Manifest::new();
        let stale = Rule::new("removed_last_week");
        assert!(manifest.rule(stale.name()).is_none());

        write_in_build(db, &stale, &compiled("leftover", 1));
        assert!(db.lookup_rule_result(&stale).unwrap().is_some());
        assert_eq!(db.rule_keys().unwrap(), vec!["removed_last_week"]);
    });
}

#[test]
fn results_keyed_from_a_manifest() {
    for_each_backend(|db| {
        let mut manifest = Manifest::new();
        let mut cc = Rule::new("cc");
        cc.set_parameter("command", "cc -c $in -o $out");
        manifest.add_rule(cc).unwrap();
        let out = manifest.get_or_insert_node("main.o").unwrap();
        let mut cmd = Command::new("cc", ScopeId::ROOT);
        cmd.outputs.push(out);
        manifest.add_command(cmd).unwrap();

        db.build_started();
        db.set_current_iteration(1).unwrap();
        for command in manifest.commands() {
            let rule = manifest.rule(&command.rule).unwrap();
            let result = RuleResult::new(b"built".to_vec(), rule.signature(), 1);
            db.set_rule_result(rule, &result).unwrap();
        }
        db.build_complete();

        let rule = manifest.rule("cc").unwrap();
        let stored = db.lookup_rule_result(rule).unwrap().unwrap();
        assert_eq!(stored.signature, rule.signature());
    });
}

#[test]
#[should_panic(expected = "outside of a build")]
fn memory_mutation_outside_build_panics() {
    let mut db = MemoryBuildDb::new();
    db.set_current_iteration(1).unwrap();
}

#[test]
#[should_panic(expected = "outside of a build")]
fn sqlite_mutation_outside_build_panics() {
    let (_dir, mut db) = sqlite_db();
    let _ = db.set_rule_result(&Rule::new("cc"), &compiled("x", 1));
}

#[test]
#[should_panic(expected = "already in progress")]
fn nested_build_started_panics() {
    let (_dir, mut db) = sqlite_db();
    db.build_started();
    db.build_started();
}

// ---------------------------------------------------------------------------
// Persistence across sessions (SQLite)
// ---------------------------------------------------------------------------

fn reopen(path: &Path, schema_version: u32) -> SqliteBuildDb {
    SqliteBuildDb::open(path, schema_version).unwrap()
}

#[test]
fn result_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build.db");
    let rule = Rule::new("cc");
    let result = compiled("main.o", 1).with_dependencies(["main.c"]);

    {
        let mut db = reopen(&path, 1);
        write_in_build(&mut db, &rule, &result);
    }

    let db = reopen(&path, 1);
    assert_eq!(db.lookup_rule_result(&rule).unwrap(), Some(result));
}

#[test]
fn iteration_of_latest_build_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build.db");

    for iteration in [5, 7] {
        let mut db = reopen(&path, 1);
        db.build_started();
        db.set_current_iteration(iteration).unwrap();
        db.build_complete();
    }

    assert_eq!(reopen(&path, 1).current_iteration().unwrap(), 7);
}

#[test]
fn schema_version_change_clears_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build.db");
    let rule = Rule::new("cc");

    {
        let mut db = reopen(&path, 1);
        db.build_started();
        db.set_current_iteration(12).unwrap();
        db.set_rule_result(&rule, &compiled("main.o", 12)).unwrap();
        db.build_complete();
    }

    let db = reopen(&path, 2);
    assert_eq!(db.current_iteration().unwrap(), 0);
    assert!(db.lookup_rule_result(&rule).unwrap().is_none());
    assert!(db.rule_keys().unwrap().is_empty());

    // The reset is itself persisted: going back to 1 finds nothing either.
    drop(db);
    let db = reopen(&path, 1);
    assert!(db.lookup_rule_result(&rule).unwrap().is_none());
}

#[test]
fn interrupted_build_leaves_a_readable_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build.db");
    let kept = Rule::new("kept");

    {
        let mut db = reopen(&path, 1);
        db.build_started();
        db.set_current_iteration(1).unwrap();
        db.set_rule_result(&kept, &compiled("v1", 1)).unwrap();
        db.build_complete();
    }
    {
        let mut db = reopen(&path, 1);
        db.build_started();
        db.set_current_iteration(2).unwrap();
        db.set_rule_result(&kept, &compiled("v2", 2)).unwrap();
        db.set_rule_result(&Rule::new("partial"), &compiled("p", 2))
            .unwrap();
        // No build_complete: the driver was aborted.
    }

    let db = reopen(&path, 1);
    let iteration = db.current_iteration().unwrap();
    let kept = db.lookup_rule_result(&kept).unwrap().unwrap();
    // This backend discards the whole interrupted window.
    assert_eq!(iteration, 1);
    assert_eq!(kept.value, b"v1");
    assert!(db.lookup_rule_result(&Rule::new("partial")).unwrap().is_none());
}

/// Set in the child process of `process_abort_mid_build_discards_the_window`
/// to the database it should abort inside of.
const ABORT_CHILD_DB: &str = "KILN_DB_ABORT_CHILD_DB";

#[test]
fn process_abort_mid_build_discards_the_window() {
    const RULES: usize = 3000;

    if let Some(path) = std::env::var_os(ABORT_CHILD_DB) {
        let mut db = reopen(Path::new(&path), 1);
        db.build_started();
        db.set_current_iteration(2).unwrap();
        for i in 0..RULES {
            db.set_rule_result(&Rule::new(format!("rule_{i}")), &compiled("v2", 2))
                .unwrap();
        }
        std::process::abort();
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build.db");
    {
        let mut db = reopen(&path, 1);
        db.build_started();
        db.set_current_iteration(1).unwrap();
        for i in 0..RULES {
            db.set_rule_result(&Rule::new(format!("rule_{i}")), &compiled("v1", 1))
                .unwrap();
        }
        db.build_complete();
    }

    let status = std::process::Command::new(std::env::current_exe().unwrap())
        .args([
            "process_abort_mid_build_discards_the_window",
            "--exact",
            "--test-threads=1",
        ])
        .env(ABORT_CHILD_DB, &path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .unwrap();
    assert!(!status.success());

    let db = reopen(&path, 1);
    assert_eq!(db.current_iteration().unwrap(), 1);
    assert_eq!(db.rule_keys().unwrap().len(), RULES);
    for i in [0, RULES / 2, RULES - 1] {
        let stored = db
            .lookup_rule_result(&Rule::new(format!("rule_{i}")))
            .unwrap()
            .unwrap();
        assert_eq!(stored.value, b"v1");
    }
}

#[test]
fn reads_from_another_thread_between_builds() {
    let (_dir, mut db) = sqlite_db();
    let rule = Rule::new("cc");
    write_in_build(&mut db, &rule, &compiled("main.o", 1));

    let shared = &db;
    std::thread::scope(|s| {
        let handle = s.spawn(|| {
            let found = shared.lookup_rule_result(&Rule::new("cc")).unwrap();
            (found, shared.current_iteration().unwrap())
        });
        let (found, iteration) = handle.join().unwrap();
        assert_eq!(found.unwrap().value, b"main.o");
        assert_eq!(iteration, 0);
    });
}

#[test]
fn unreadable_location_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"file").unwrap();

    let err = SqliteBuildDb::open(&blocker.join("build.db"), 1).err().unwrap();
    assert!(matches!(err, DbError::Io { .. }));
}
