//! Integration tests for structural mutations: create, update, reparent and
//! delete, including the rejections that must leave the hierarchy untouched.

mod common;

use common::{TENANT, node, open, open_with, rabc, release_with_tasks};
use rstest::rstest;
use strata::{
    Error, NewWorkstream, StrataConfig, WorkstreamId, WorkstreamKind, WorkstreamStatus,
    WorkstreamUpdate,
};

fn ids(workstreams: &[strata::Workstream]) -> Vec<WorkstreamId> {
    workstreams.iter().map(|w| w.id).collect()
}

// === Create ===

#[test]
fn create_applies_kind_default_status() {
    let (_dir, strata) = open();

    let root = strata
        .create_workstream(NewWorkstream::new(TENANT, "Platform", WorkstreamKind::ProductLine, "alice"))
        .unwrap();
    let experiment = strata
        .create_workstream(
            NewWorkstream::new(TENANT, "Canary", WorkstreamKind::Experiment, "bob").under(root.id),
        )
        .unwrap();

    assert!(root.is_root());
    assert_eq!(root.status, WorkstreamKind::ProductLine.traits().default_status);
    assert_eq!(experiment.parent, Some(root.id));
    assert_eq!(experiment.status, WorkstreamKind::Experiment.traits().default_status);
}

#[rstest]
#[case::empty("")]
#[case::blank("   ")]
#[case::too_long(&"x".repeat(strata::MAX_NAME_LENGTH + 1))]
fn create_rejects_bad_names(#[case] name: &str) {
    let (_dir, strata) = open();

    let result = strata.create_workstream(NewWorkstream::new(TENANT, name, WorkstreamKind::Initiative, "alice"));

    assert!(matches!(result, Err(Error::Validation(_))));
    assert!(strata.roots(None).unwrap().is_empty());
}

#[test]
fn create_trims_names() {
    let (_dir, strata) = open();

    let ws = strata
        .create_workstream(NewWorkstream::new(TENANT, "  Search  ", WorkstreamKind::Initiative, "alice"))
        .unwrap();

    assert_eq!(ws.name, "Search");
}

#[test]
fn create_under_missing_parent_is_invalid_parent() {
    let (_dir, strata) = open();

    let result = strata.create_workstream(
        NewWorkstream::new(TENANT, "Orphan", WorkstreamKind::Initiative, "alice").under(WorkstreamId(42)),
    );

    assert!(matches!(result, Err(Error::InvalidParent { parent: WorkstreamId(42), .. })));
}

#[test]
fn create_across_tenants_is_invalid_parent() {
    let (_dir, strata) = open();
    let r = node(&strata, "R", None);

    let result = strata.create_workstream(
        NewWorkstream::new("globex", "Intruder", WorkstreamKind::Initiative, "mallory").under(r),
    );

    assert!(matches!(result, Err(Error::InvalidParent { .. })));
    assert!(strata.children(r).unwrap().is_empty());
}

#[test]
fn create_beyond_max_depth_is_rejected() {
    let (_dir, strata) = open_with(StrataConfig {
        max_depth: 2,
        ..StrataConfig::default()
    });
    let t = rabc(&strata);

    let result = strata.create_workstream(
        NewWorkstream::new(TENANT, "Too deep", WorkstreamKind::Initiative, "alice").under(t.c),
    );

    assert!(matches!(result, Err(Error::DepthExceeded { depth: 3, max: 2 })));
    assert!(strata.children(t.c).unwrap().is_empty());
}

#[test]
fn roots_filter_by_tenant() {
    let (_dir, strata) = open();
    let r = node(&strata, "R", None);
    let other = strata
        .create_workstream(NewWorkstream::new("globex", "G", WorkstreamKind::ProductLine, "gina"))
        .unwrap();

    assert_eq!(ids(&strata.roots(Some(&strata::TenantId::new(TENANT))).unwrap()), vec![r]);
    assert_eq!(ids(&strata.roots(Some(&other.tenant)).unwrap()), vec![other.id]);
    assert_eq!(strata.roots(None).unwrap().len(), 2);
}

// === Update ===

#[test]
fn update_changes_details_but_not_structure() {
    let (_dir, strata) = open();
    let t = rabc(&strata);

    let updated = strata
        .update_workstream(
            t.a,
            WorkstreamUpdate {
                name: Some("Alpha".to_string()),
                status: Some(WorkstreamStatus::Paused),
                owner: None,
            },
        )
        .unwrap();

    assert_eq!(updated.name, "Alpha");
    assert_eq!(updated.status, WorkstreamStatus::Paused);
    assert_eq!(updated.parent, Some(t.r));
    assert_eq!(strata.get_workstream(t.a).unwrap(), updated);
}

#[test]
fn update_is_visible_through_cached_tree() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let _ = strata.build_tree(t.r).unwrap();

    strata
        .update_workstream(
            t.c,
            WorkstreamUpdate {
                name: Some("Renamed".to_string()),
                ..WorkstreamUpdate::default()
            },
        )
        .unwrap();

    let tree = strata.build_tree(t.r).unwrap();
    let names: Vec<_> = tree.flatten().iter().map(|w| w.name.clone()).collect();
    assert!(names.contains(&"Renamed".to_string()));
}

// === Reparent ===

#[test]
fn reparent_under_descendant_is_circular() {
    let (_dir, strata) = open();
    let t = rabc(&strata);

    let result = strata.reparent(t.a, Some(t.c));

    assert!(matches!(result, Err(Error::CircularReference { .. })));
    assert_eq!(strata.get_workstream(t.a).unwrap().parent, Some(t.r));
    assert!(strata.verify_integrity().unwrap().is_healthy());
}

#[test]
fn reparent_to_self_is_circular() {
    let (_dir, strata) = open();
    let t = rabc(&strata);

    assert!(matches!(
        strata.reparent(t.b, Some(t.b)),
        Err(Error::CircularReference { .. })
    ));
}

#[test]
fn reparent_to_current_parent_is_a_noop() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let before = strata.get_workstream(t.c).unwrap();

    let after = strata.reparent(t.c, Some(t.a)).unwrap();

    assert_eq!(after, before);
}

#[test]
fn reparent_checks_depth_of_whole_subtree() {
    let (_dir, strata) = open_with(StrataConfig {
        max_depth: 2,
        ..StrataConfig::default()
    });
    let t = rabc(&strata);

    // A carries C with it: B is at depth 1, so C would land at depth 3.
    let result = strata.reparent(t.a, Some(t.b));

    assert!(matches!(result, Err(Error::DepthExceeded { depth: 3, max: 2 })));
    assert_eq!(ids(&strata.ancestors(t.c).unwrap()), vec![t.r, t.a]);
}

#[test]
fn reparent_across_tenants_is_invalid_parent() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let foreign = strata
        .create_workstream(NewWorkstream::new("globex", "G", WorkstreamKind::ProductLine, "gina"))
        .unwrap();

    let result = strata.reparent(t.c, Some(foreign.id));

    assert!(matches!(result, Err(Error::InvalidParent { .. })));
}

#[test]
fn reparent_to_root_detaches_subtree() {
    let (_dir, strata) = open();
    let t = rabc(&strata);

    let moved = strata.reparent(t.a, None).unwrap();

    assert!(moved.is_root());
    assert_eq!(strata.depth(t.c).unwrap(), 1);
    assert_eq!(ids(&strata.descendants(t.r).unwrap()), vec![t.b]);
}

// === Delete ===

#[test]
fn delete_with_children_is_refused() {
    let (_dir, strata) = open();
    let t = rabc(&strata);

    let result = strata.delete_workstream(t.a);

    assert!(matches!(
        result,
        Err(Error::HasDescendants { child_count: 1, .. })
    ));
    assert_eq!(strata.get_workstream(t.c).unwrap().parent, Some(t.a));
}

#[test]
fn delete_with_releases_is_refused() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let release = release_with_tasks(&strata, t.b, &[]);

    assert!(matches!(
        strata.delete_workstream(t.b),
        Err(Error::HasOwnedReleases { release_count: 1, .. })
    ));

    strata.delete_release(release.id).unwrap();
    strata.delete_workstream(t.b).unwrap();
    assert!(matches!(
        strata.get_workstream(t.b),
        Err(Error::WorkstreamNotFound(_))
    ));
}

#[test]
fn delete_leaf_updates_cached_descendants() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    assert_eq!(strata.descendants(t.r).unwrap().len(), 3);

    strata.delete_workstream(t.c).unwrap();

    assert_eq!(strata.descendants(t.r).unwrap().len(), 2);
    assert!(strata.descendants(t.a).unwrap().is_empty());
}

// === Cache ===

#[test]
fn repeated_reads_hit_the_cache() {
    let (_dir, strata) = open();
    let t = rabc(&strata);

    let first = strata.descendants(t.r).unwrap();
    let second = strata.descendants(t.r).unwrap();
    let stats = strata.cache_stats();

    assert_eq!(first, second);
    assert!(stats.enabled);
    assert!(stats.hits >= 1);
    assert!(stats.misses >= 1);
}

#[test]
fn mutations_invalidate_affected_entries() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let _ = strata.descendants(t.r).unwrap();

    node(&strata, "D", Some(t.b));

    assert!(strata.cache_stats().invalidated >= 1);
    assert_eq!(strata.descendants(t.r).unwrap().len(), 4);
}

#[test]
fn manual_invalidation_drops_dependent_entries() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let _ = strata.depth(t.c).unwrap();
    let _ = strata.descendants(t.r).unwrap();
    let before = strata.cache_stats().invalidated;

    strata.invalidate_subtree(t.c);

    assert_eq!(strata.cache_stats().invalidated, before + 2);
}

#[test]
fn disabled_cache_gives_the_same_answers() {
    let (_dir, strata) = open_with(StrataConfig {
        cache: strata::config::CacheConfig::disabled(),
        ..StrataConfig::default()
    });
    let t = rabc(&strata);

    assert_eq!(strata.depth(t.c).unwrap(), 2);
    strata.reparent(t.c, Some(t.b)).unwrap();
    assert_eq!(ids(&strata.ancestors(t.c).unwrap()), vec![t.r, t.b]);

    let stats = strata.cache_stats();
    assert!(!stats.enabled);
    assert_eq!(stats.hits, 0);
}
