mod common;

use std::collections::HashSet;

use common::*;
use csgedit::{xpush, EditConfig, EditError};
use csgedit_db::{Combination, Database, Leaf, ObjectStore, Transform};
use csgedit_math::Point3;
use csgedit_primitives::make_sphere;
use proptest::prelude::*;

fn run(db: &mut Database, root: &str) -> csgedit::XPushReport {
    let id = db.lookup(root).unwrap();
    xpush(db, id, &EditConfig::default()).unwrap()
}

#[test]
fn wrapper_scenario_splits_the_shared_solid() {
    let mut db = scenario();
    let before = world_shapes(&db, "wrapper");

    let report = run(&mut db, "wrapper");
    assert_eq!(report.created, 1);
    assert_eq!(report.discarded, 0);
    assert!(report.removed.is_empty());

    let a = db.read_comb(db.lookup("a").unwrap()).unwrap();
    let b = db.read_comb(db.lookup("b").unwrap()).unwrap();
    assert_eq!(a.leaves[0].name, "s");
    assert_eq!(b.leaves[0].name, "s_01");

    let s = db.read_solid(db.lookup("s").unwrap(), None).unwrap();
    let s1 = db.read_solid(db.lookup("s_01").unwrap(), None).unwrap();
    assert_eq!(s.vertex(), Point3::origin());
    assert_eq!(s1.vertex(), Point3::new(1.0, 0.0, 0.0));

    assert_matrix_free(&db, "wrapper");
    assert_same_shapes(&before, &world_shapes(&db, "wrapper"));
}

#[test]
fn outside_reference_keeps_the_original_untouched() {
    let mut db = scenario();
    db.put_comb("other", Combination::new(vec![Leaf::new("s")]))
        .unwrap();
    let before = world_shapes(&db, "wrapper");

    let report = run(&mut db, "wrapper");
    // s is used twice under wrapper but referenced three times overall:
    // two names were prepared, only the translated one was needed
    assert_eq!(report.created, 1);
    assert_eq!(report.discarded, 1);
    assert!(db.lookup("s_02").is_none());

    let other = db.read_comb(db.lookup("other").unwrap()).unwrap();
    assert_eq!(other.leaves[0].name, "s");
    let s = db.read_solid(db.lookup("s").unwrap(), None).unwrap();
    assert_eq!(s.vertex(), Point3::origin());
    assert_same_shapes(&before, &world_shapes(&db, "wrapper"));
}

#[test]
fn shared_combination_is_duplicated_with_its_members() {
    let mut db = Database::new();
    db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
    db.put_comb("a", Combination::new(vec![Leaf::new("s")])).unwrap();
    db.put_comb(
        "top",
        Combination::new(vec![
            Leaf::new("a"),
            Leaf::new("a").with_matrix(Transform::translation(0.0, 5.0, 0.0)),
        ]),
    )
    .unwrap();
    let before = world_shapes(&db, "top");

    let report = run(&mut db, "top");
    assert_eq!(report.created, 2);

    let top = db.read_comb(db.lookup("top").unwrap()).unwrap();
    let names: Vec<_> = top.leaves.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, ["a", "a_01"]);
    let a1 = db.read_comb(db.lookup("a_01").unwrap()).unwrap();
    assert_eq!(a1.leaves[0].name, "s_01");

    assert_matrix_free(&db, "top");
    assert_same_shapes(&before, &world_shapes(&db, "top"));
}

#[test]
fn second_xpush_changes_nothing() {
    let mut db = scenario();
    run(&mut db, "wrapper");
    let snapshot = db.to_document();
    let again = run(&mut db, "wrapper");
    assert_eq!(again.created, 0);
    assert_eq!(again.rewritten, 0);
    assert_eq!(db.to_document(), snapshot);
}

#[test]
fn missing_leaf_placement_survives_in_shared_combination() {
    let mut db = Database::new();
    let ghost_at = Transform::translation(0.0, 0.0, 7.0);
    db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
    db.put_comb(
        "a",
        Combination::new(vec![Leaf::new("ghost").with_matrix(ghost_at), Leaf::new("s")]),
    )
    .unwrap();
    db.put_comb(
        "top",
        Combination::new(vec![
            Leaf::new("a"),
            Leaf::new("phantom").with_matrix(Transform::translation(1.0, 0.0, 0.0)),
        ]),
    )
    .unwrap();
    db.put_comb("other", Combination::new(vec![Leaf::new("a")]))
        .unwrap();

    let report = run(&mut db, "top");
    assert_eq!(report.created, 0);
    assert_eq!(report.missing, ["ghost", "phantom"]);

    // `a` is also owned by `other`, so its leaves stay as they were
    let a = db.read_comb(db.lookup("a").unwrap()).unwrap();
    assert_eq!(a.leaves[0].matrix, Some(ghost_at));
    // only the target's own leaves are cleared
    let top = db.read_comb(db.lookup("top").unwrap()).unwrap();
    assert_eq!(top.leaves[0].name, "a");
    assert!(top.leaves.iter().all(|l| l.matrix.is_none()));
}

/// `top` references `s` through `n` leaves, each with its own translation.
fn fan_out(n: usize) -> Database {
    let mut db = Database::new();
    db.put_solid("s", make_sphere(Point3::origin(), 0.5)).unwrap();
    let leaves = (0..n)
        .map(|i| Leaf::new("s").with_matrix(Transform::translation(i as f64 * 2.0, 0.0, 0.0)))
        .collect();
    db.put_comb("top", Combination::new(leaves)).unwrap();
    db
}

#[test]
fn one_entry_per_distinct_placement() {
    for n in [1, 2, 5] {
        let mut db = fan_out(n);
        let before = world_shapes(&db, "top");
        run(&mut db, "top");

        let top = db.read_comb(db.lookup("top").unwrap()).unwrap();
        let names: HashSet<_> = top.leaves.iter().map(|l| l.name.clone()).collect();
        assert_eq!(names.len(), n, "n = {n}");
        // one solid per placement and nothing else left behind
        assert_eq!(db.len(), n + 1, "n = {n}");
        assert_same_shapes(&before, &world_shapes(&db, "top"));
    }
}

#[test]
fn exhausted_uses_are_impossible_for_counted_trees() {
    // every object is counted before copying, so even a deep shared tree
    // never runs out of prepared uses
    let mut db = Database::new();
    db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
    let mut child = "s".to_string();
    for level in 0..4 {
        let name = format!("c{level}");
        db.put_comb(
            &name,
            Combination::new(vec![
                Leaf::new(&child),
                Leaf::new(&child).with_matrix(Transform::translation(0.0, 0.0, 1.0 + level as f64)),
            ]),
        )
        .unwrap();
        child = name;
    }
    let before = world_shapes(&db, "c3");
    let report = run(&mut db, "c3");
    assert!(report.created > 0);
    assert_same_shapes(&before, &world_shapes(&db, "c3"));
    assert_matrix_free(&db, "c3");
}

#[test]
fn cycles_abort_before_any_write() {
    let mut db = scenario();
    db.put_comb("x", Combination::new(vec![Leaf::new("y"), Leaf::new("s")]))
        .unwrap();
    db.put_comb("y", Combination::new(vec![Leaf::new("x")])).unwrap();
    db.put_comb("entry", Combination::new(vec![Leaf::new("x")]))
        .unwrap();
    let before = db.to_document();
    let id = db.lookup("entry").unwrap();
    let err = xpush(&mut db, id, &EditConfig::default()).unwrap_err();
    assert!(matches!(err, EditError::CyclicHierarchy(_)));
    assert_eq!(db.to_document(), before);
}

#[test]
fn commit_failure_is_reported_as_store_io() {
    let mut store = FlakyStore::new(scenario(), "create", "s_01");
    let id = store.lookup("wrapper").unwrap();
    let err = xpush(&mut store, id, &EditConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        EditError::StoreIo { op: "create", ref name, .. } if name == "s_01"
    ));
}

#[test]
fn read_failure_leaves_store_untouched() {
    let mut store = FlakyStore::new(scenario(), "read", "b");
    let before = store.inner.to_document();
    let id = store.lookup("wrapper").unwrap();
    let err = xpush(&mut store, id, &EditConfig::default()).unwrap_err();
    assert!(matches!(err, EditError::StoreIo { op: "read", .. }));
    assert_eq!(store.inner.to_document(), before);
}

proptest! {
    #[test]
    fn distinct_placements_get_distinct_entries(offsets in proptest::collection::vec(0u8..3, 1..6)) {
        let mut db = Database::new();
        db.put_solid("s", make_sphere(Point3::origin(), 0.25)).unwrap();
        let leaves = offsets
            .iter()
            .map(|o| Leaf::new("s").with_matrix(Transform::translation(f64::from(*o), 0.0, 0.0)))
            .collect();
        db.put_comb("top", Combination::new(leaves)).unwrap();
        let before = world_shapes(&db, "top");

        run(&mut db, "top");

        let top = db.read_comb(db.lookup("top").unwrap()).unwrap();
        let distinct_offsets: HashSet<_> = offsets.iter().collect();
        let distinct_names: HashSet<_> = top.leaves.iter().map(|l| l.name.clone()).collect();
        prop_assert_eq!(distinct_names.len(), distinct_offsets.len());
        for (leaf, offset) in top.leaves.iter().zip(&offsets) {
            let solid = db.read_solid(db.lookup(&leaf.name).unwrap(), None).unwrap();
            prop_assert_eq!(solid.vertex(), Point3::new(f64::from(*offset), 0.0, 0.0));
        }
        let after = world_shapes(&db, "top");
        prop_assert_eq!(before.len(), after.len());
    }
}
