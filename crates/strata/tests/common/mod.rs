//! Shared fixtures for Strata integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use proptest::prelude::*;
use strata::{
    NewRelease, NewTask, NewWorkstream, PrincipalId, Release, ReleaseStatus, Strata, StrataConfig,
    TaskStatus, WorkstreamId, WorkstreamKind,
};
use tempfile::TempDir;

pub const TENANT: &str = "acme";

/// A fresh database in a temp directory. Keep the `TempDir` alive for the
/// duration of the test.
pub fn open() -> (TempDir, Strata) {
    open_with(StrataConfig::default())
}

pub fn open_with(config: StrataConfig) -> (TempDir, Strata) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let strata = Strata::open(&dir.path().join("strata.db"), config).expect("failed to open strata");
    (dir, strata)
}

/// Create an initiative named `name` under `parent`.
pub fn node(strata: &Strata, name: &str, parent: Option<WorkstreamId>) -> WorkstreamId {
    let mut new = NewWorkstream::new(TENANT, name, WorkstreamKind::Initiative, "owner");
    new.parent = parent;
    strata.create_workstream(new).expect("failed to create workstream").id
}

/// The reference hierarchy used across tests:
///
/// ```text
///   R
///  / \
/// A   B
/// |
/// C
/// ```
pub struct Rabc {
    pub r: WorkstreamId,
    pub a: WorkstreamId,
    pub b: WorkstreamId,
    pub c: WorkstreamId,
}

pub fn rabc(strata: &Strata) -> Rabc {
    let r = node(strata, "R", None);
    let a = node(strata, "A", Some(r));
    let b = node(strata, "B", Some(r));
    let c = node(strata, "C", Some(a));
    Rabc { r, a, b, c }
}

pub fn principal(strata: &Strata, id: &str) -> PrincipalId {
    let id = PrincipalId::new(id);
    strata
        .register_principal(&id, &id.to_string())
        .expect("failed to register principal");
    id
}

/// Add a release to `ws` with one task per status.
pub fn release_with_tasks(strata: &Strata, ws: WorkstreamId, statuses: &[TaskStatus]) -> Release {
    let release = strata
        .add_release(NewRelease {
            workstream: ws,
            name: "1.0".to_string(),
            status: ReleaseStatus::InProgress,
        })
        .expect("failed to add release");
    for (i, status) in statuses.iter().enumerate() {
        strata
            .add_task(NewTask {
                release: release.id,
                title: format!("task {i}"),
                status: *status,
            })
            .expect("failed to add task");
    }
    release
}

// === Random forests ===

/// Build a random forest: node `i` gets parent `parents[i] % i` or no parent.
pub fn build_forest(strata: &Strata, parents: &[Option<usize>]) -> Vec<WorkstreamId> {
    let mut nodes = Vec::with_capacity(parents.len());
    for (i, parent) in parents.iter().enumerate() {
        let parent = match parent {
            Some(p) if i > 0 => Some(nodes[p % i]),
            _ => None,
        };
        nodes.push(node(strata, &format!("n{i}"), parent));
    }
    nodes
}

/// Random forests can be deeper than the default limit.
pub fn open_deep() -> (TempDir, Strata) {
    open_with(StrataConfig {
        max_depth: 64,
        ..StrataConfig::default()
    })
}

pub fn forest_shape() -> impl Strategy<Value = Vec<Option<usize>>> {
    proptest::collection::vec(proptest::option::weighted(0.8, 0..64usize), 1..24)
}

// === CLI ===

/// Run the strata binary in `dir` with colors off.
pub fn run_strata_in_dir(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_strata"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute strata binary")
}
