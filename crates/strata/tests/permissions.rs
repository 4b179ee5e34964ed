//! Integration tests for grants and inherited permission resolution.

mod common;

use common::{build_forest, forest_shape, node, open, open_deep, principal, rabc};
use proptest::prelude::*;
use rstest::rstest;
use strata::{
    Error, GrantScope, NewGrant, PermissionSet, PermissionType, PrincipalId, Strata, WorkstreamId,
};

fn grant(
    strata: &Strata,
    on: WorkstreamId,
    who: &PrincipalId,
    permission: PermissionType,
    scope: GrantScope,
) -> strata::PermissionGrant {
    strata
        .grant(NewGrant {
            workstream: on,
            principal: who.clone(),
            permission,
            scope,
        })
        .expect("failed to grant")
}

fn set(permissions: &[PermissionType]) -> PermissionSet {
    let mut set = PermissionSet::new();
    for p in permissions {
        set.insert(*p);
    }
    set
}

#[test]
fn subtree_grant_on_root_reaches_grandchild() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let alice = principal(&strata, "alice");

    grant(&strata, t.r, &alice, PermissionType::Admin, GrantScope::NodeAndDescendants);

    assert!(strata
        .has_inherited_permission(t.c, &alice, PermissionType::Admin)
        .unwrap());
    assert_eq!(
        strata.effective_permissions(t.c, &alice).unwrap(),
        set(&[PermissionType::Admin])
    );
}

#[test]
fn admin_does_not_imply_view() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let alice = principal(&strata, "alice");

    grant(&strata, t.r, &alice, PermissionType::Admin, GrantScope::NodeAndDescendants);

    assert!(!strata
        .has_inherited_permission(t.a, &alice, PermissionType::View)
        .unwrap());
}

#[test]
fn node_only_grant_does_not_propagate() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let bob = principal(&strata, "bob");

    grant(&strata, t.a, &bob, PermissionType::Edit, GrantScope::NodeOnly);

    assert_eq!(strata.effective_permissions(t.a, &bob).unwrap(), set(&[PermissionType::Edit]));
    assert!(strata.effective_permissions(t.c, &bob).unwrap().is_empty());
    assert!(strata.effective_permissions(t.r, &bob).unwrap().is_empty());
}

#[test]
fn permissions_union_across_the_chain() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let carol = principal(&strata, "carol");

    grant(&strata, t.r, &carol, PermissionType::View, GrantScope::NodeAndDescendants);
    grant(&strata, t.a, &carol, PermissionType::Edit, GrantScope::NodeAndDescendants);
    grant(&strata, t.c, &carol, PermissionType::Admin, GrantScope::NodeOnly);

    assert_eq!(
        strata.effective_permissions(t.c, &carol).unwrap(),
        set(&[PermissionType::View, PermissionType::Edit, PermissionType::Admin])
    );
    assert_eq!(strata.effective_permissions(t.b, &carol).unwrap(), set(&[PermissionType::View]));
}

#[test]
fn descendants_hold_at_least_their_ancestors_inherited_set() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let dave = principal(&strata, "dave");

    grant(&strata, t.r, &dave, PermissionType::View, GrantScope::NodeAndDescendants);
    grant(&strata, t.a, &dave, PermissionType::Edit, GrantScope::NodeAndDescendants);

    let at_a = strata.effective_permissions(t.a, &dave).unwrap();
    let at_c = strata.effective_permissions(t.c, &dave).unwrap();
    assert!(at_a.is_subset(&at_c));
}

#[test]
fn unknown_principal_has_no_permissions() {
    let (_dir, strata) = open();
    let t = rabc(&strata);

    let nobody = PrincipalId::new("nobody");
    assert!(strata.effective_permissions(t.c, &nobody).unwrap().is_empty());

    let resolution = strata.explain_permissions(t.c, &nobody).unwrap();
    assert!(!resolution.principal_known);
    assert!(resolution.sources.is_empty());
}

#[test]
fn unknown_workstream_is_an_error() {
    let (_dir, strata) = open();
    let alice = principal(&strata, "alice");

    assert!(matches!(
        strata.effective_permissions(WorkstreamId(77), &alice),
        Err(Error::WorkstreamNotFound(_))
    ));
}

#[test]
fn granting_to_unregistered_principal_fails() {
    let (_dir, strata) = open();
    let t = rabc(&strata);

    let result = strata.grant(NewGrant {
        workstream: t.r,
        principal: PrincipalId::new("ghost"),
        permission: PermissionType::View,
        scope: GrantScope::NodeAndDescendants,
    });

    assert!(matches!(result, Err(Error::PrincipalNotFound(_))));
    assert!(strata.grants_on(t.r).unwrap().is_empty());
}

#[test]
fn duplicate_grant_returns_existing() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let alice = principal(&strata, "alice");

    let first = grant(&strata, t.r, &alice, PermissionType::Edit, GrantScope::NodeAndDescendants);
    let second = grant(&strata, t.r, &alice, PermissionType::Edit, GrantScope::NodeAndDescendants);

    assert_eq!(first, second);
    assert_eq!(strata.grants_on(t.r).unwrap().len(), 1);
}

#[test]
fn revoke_takes_effect_for_cached_descendants() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let alice = principal(&strata, "alice");
    let g = grant(&strata, t.r, &alice, PermissionType::Edit, GrantScope::NodeAndDescendants);

    // Populate the cache at the grandchild.
    assert!(strata.has_inherited_permission(t.c, &alice, PermissionType::Edit).unwrap());

    strata.revoke(g.id).unwrap();

    assert!(!strata.has_inherited_permission(t.c, &alice, PermissionType::Edit).unwrap());
    assert!(matches!(strata.revoke(g.id), Err(Error::GrantNotFound(_))));
}

#[test]
fn grant_on_ancestor_refreshes_cached_descendants() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let alice = principal(&strata, "alice");
    assert!(strata.effective_permissions(t.c, &alice).unwrap().is_empty());

    grant(&strata, t.a, &alice, PermissionType::View, GrantScope::NodeAndDescendants);

    assert_eq!(strata.effective_permissions(t.c, &alice).unwrap(), set(&[PermissionType::View]));
}

#[test]
fn moving_a_node_changes_what_it_inherits() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let erin = principal(&strata, "erin");
    grant(&strata, t.a, &erin, PermissionType::Edit, GrantScope::NodeAndDescendants);
    grant(&strata, t.b, &erin, PermissionType::View, GrantScope::NodeAndDescendants);
    assert_eq!(strata.effective_permissions(t.c, &erin).unwrap(), set(&[PermissionType::Edit]));

    strata.reparent(t.c, Some(t.b)).unwrap();

    assert_eq!(strata.effective_permissions(t.c, &erin).unwrap(), set(&[PermissionType::View]));
}

#[test]
fn principal_registered_after_a_cached_lookup_can_be_granted() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let late = PrincipalId::new("late");
    assert!(strata.effective_permissions(t.c, &late).unwrap().is_empty());

    strata.register_principal(&late, "Late Arrival").unwrap();

    assert!(strata.effective_permissions(t.c, &late).unwrap().is_empty());
    assert!(strata.explain_permissions(t.c, &late).unwrap().principal_known);
    assert_eq!(
        strata.get_principal(&late).unwrap().map(|p| p.display_name),
        Some("Late Arrival".to_string())
    );

    grant(&strata, t.a, &late, PermissionType::Edit, GrantScope::NodeAndDescendants);

    assert_eq!(strata.effective_permissions(t.c, &late).unwrap(), set(&[PermissionType::Edit]));
}

#[test]
fn explain_reports_hops_nearest_first() {
    let (_dir, strata) = open();
    let t = rabc(&strata);
    let alice = principal(&strata, "alice");
    grant(&strata, t.r, &alice, PermissionType::View, GrantScope::NodeAndDescendants);
    grant(&strata, t.c, &alice, PermissionType::Edit, GrantScope::NodeOnly);

    let resolution = strata.explain_permissions(t.c, &alice).unwrap();

    assert_eq!(resolution.chain, vec![t.c, t.a, t.r]);
    let hops: Vec<_> = resolution.sources.iter().map(|s| s.hops).collect();
    assert_eq!(hops, vec![0, 2]);
}

#[rstest]
#[case::node_only(GrantScope::NodeOnly, false)]
#[case::subtree(GrantScope::NodeAndDescendants, true)]
fn scope_decides_inheritance_to_a_new_child(#[case] scope: GrantScope, #[case] inherited: bool) {
    let (_dir, strata) = open();
    let parent = node(&strata, "P", None);
    let alice = principal(&strata, "alice");
    grant(&strata, parent, &alice, PermissionType::Edit, scope);

    let child = node(&strata, "K", Some(parent));

    assert_eq!(
        strata.has_inherited_permission(child, &alice, PermissionType::Edit).unwrap(),
        inherited
    );
}

// === Property tests ===

fn permission_type() -> impl Strategy<Value = PermissionType> {
    prop_oneof![
        Just(PermissionType::View),
        Just(PermissionType::Edit),
        Just(PermissionType::Admin),
    ]
}

fn scope() -> impl Strategy<Value = GrantScope> {
    prop_oneof![Just(GrantScope::NodeOnly), Just(GrantScope::NodeAndDescendants)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn subtree_grant_only_adds_permissions_below_it(
        parents in forest_shape(),
        existing in proptest::collection::vec((0..64usize, permission_type(), scope()), 0..6),
        target in 0..64usize,
        permission in permission_type(),
    ) {
        let (_dir, strata) = open_deep();
        let nodes = build_forest(&strata, &parents);
        let dana = principal(&strata, "dana");
        for (at, p, s) in &existing {
            grant(&strata, nodes[at % nodes.len()], &dana, *p, *s);
        }

        // Warm every entry before the grant.
        let before: Vec<PermissionSet> = nodes
            .iter()
            .map(|&n| strata.effective_permissions(n, &dana).unwrap())
            .collect();

        let target = nodes[target % nodes.len()];
        grant(&strata, target, &dana, permission, GrantScope::NodeAndDescendants);

        let mut subtree: Vec<WorkstreamId> =
            strata.descendants(target).unwrap().iter().map(|w| w.id).collect();
        subtree.push(target);

        for (i, &n) in nodes.iter().enumerate() {
            let after = strata.effective_permissions(n, &dana).unwrap();
            if subtree.contains(&n) {
                prop_assert!(before[i].is_subset(&after), "#{n}: {:?} is not within {:?}", before[i], after);
                prop_assert!(after.contains(permission));
            } else {
                prop_assert_eq!(&after, &before[i]);
            }
        }
    }
}
