//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use csgedit::{world_solids, EditConfig};
use csgedit_db::{
    Combination, Database, DbError, DirectoryEntry, EntryId, Internal, Leaf, ObjectKind,
    ObjectStore, Transform,
};
use csgedit_math::{Point3, Tolerance, Vec3};
use csgedit_primitives::{make_rcc, make_rpp, make_sphere, Primitive};

/// `a → s`, `b → s (T(1,0,0))`, `wrapper → a, b`.
pub fn scenario() -> Database {
    let mut db = Database::new();
    db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
    db.put_comb("a", Combination::new(vec![Leaf::new("s")])).unwrap();
    db.put_comb(
        "b",
        Combination::new(vec![
            Leaf::new("s").with_matrix(Transform::translation(1.0, 0.0, 0.0))
        ]),
    )
    .unwrap();
    db.put_comb("wrapper", Combination::new(vec![Leaf::new("a"), Leaf::new("b")]))
        .unwrap();
    db
}

/// A tree with no sharing: three solids placed by leaf matrices at two levels.
pub fn placed_tree() -> Database {
    let mut db = Database::new();
    db.put_solid("ball", make_sphere(Point3::new(0.5, 0.0, 0.0), 2.0))
        .unwrap();
    db.put_solid("post", make_rcc(Point3::origin(), Vec3::new(0.0, 0.0, 4.0), 1.0))
        .unwrap();
    db.put_solid("plate", make_rpp(Point3::new(-1.0, -1.0, 0.0), Point3::new(1.0, 1.0, 0.5)))
        .unwrap();
    db.put_comb(
        "arm",
        Combination::region(vec![
            Leaf::new("post").with_matrix(Transform::rotation_x(std::f64::consts::FRAC_PI_2)),
            Leaf::new("ball").with_matrix(Transform::translation(0.0, -4.0, 0.0)),
        ]),
    )
    .unwrap();
    db.put_comb(
        "robot",
        Combination::new(vec![
            Leaf::new("plate"),
            Leaf::new("arm").with_matrix(
                Transform::translation(3.0, 2.0, 1.0).then(&Transform::rotation_z(0.3)),
            ),
        ]),
    )
    .unwrap();
    db
}

/// World-space solids of `root`, sorted by path for comparison.
pub fn world(db: &impl ObjectStore, root: &str) -> Vec<(String, Primitive)> {
    let id = db.lookup(root).unwrap();
    world_solids(db, id, &EditConfig::default()).unwrap()
}

/// World-space solids without their paths, which change when objects are
/// duplicated.
pub fn world_shapes(db: &impl ObjectStore, root: &str) -> Vec<Primitive> {
    world(db, root).into_iter().map(|(_, p)| p).collect()
}

/// Same solids in the same order, within tolerance.
pub fn assert_same_shapes(before: &[Primitive], after: &[Primitive]) {
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after) {
        assert!(b.approx_eq(a, &Tolerance::DEFAULT), "{b:?} != {a:?}");
    }
}

/// Every leaf in the subtree at `root` carries no matrix.
pub fn assert_matrix_free(db: &impl ObjectStore, root: &str) {
    let mut pending = vec![db.lookup(root).unwrap()];
    while let Some(id) = pending.pop() {
        if db.entry(id).unwrap().kind.is_solid() {
            continue;
        }
        for leaf in db.read_comb(id).unwrap().leaves {
            assert!(leaf.matrix.is_none(), "{} still placed", leaf.name);
            if let Some(child) = db.lookup(&leaf.name) {
                pending.push(child);
            }
        }
    }
}

/// Store wrapper that fails the chosen operation on the chosen name.
pub struct FlakyStore {
    pub inner: Database,
    pub fail_op: &'static str,
    pub fail_name: String,
}

impl FlakyStore {
    pub fn new(inner: Database, fail_op: &'static str, fail_name: &str) -> Self {
        Self {
            inner,
            fail_op,
            fail_name: fail_name.to_string(),
        }
    }

    fn check(&self, op: &str, name: &str) -> csgedit_db::Result<()> {
        if op == self.fail_op && name == self.fail_name {
            return Err(DbError::Io(std::io::Error::other("injected failure")));
        }
        Ok(())
    }

    fn name_of(&self, id: EntryId) -> String {
        self.inner.name(id).unwrap_or_default().to_string()
    }
}

impl ObjectStore for FlakyStore {
    fn lookup(&self, name: &str) -> Option<EntryId> {
        self.inner.lookup(name)
    }

    fn entry(&self, id: EntryId) -> Option<&DirectoryEntry> {
        self.inner.entry(id)
    }

    fn ids(&self) -> Vec<EntryId> {
        self.inner.ids()
    }

    fn name_limit(&self) -> Option<usize> {
        self.inner.name_limit()
    }

    fn create(&mut self, name: &str, kind: ObjectKind) -> csgedit_db::Result<EntryId> {
        self.check("create", name)?;
        self.inner.create(name, kind)
    }

    fn delete(&mut self, id: EntryId) -> csgedit_db::Result<()> {
        self.check("delete", &self.name_of(id))?;
        self.inner.delete(id)
    }

    fn rename(&mut self, id: EntryId, new_name: &str) -> csgedit_db::Result<()> {
        self.inner.rename(id, new_name)
    }

    fn read_internal(
        &self,
        id: EntryId,
        matrix: Option<&Transform>,
    ) -> csgedit_db::Result<Internal> {
        self.check("read", &self.name_of(id))?;
        self.inner.read_internal(id, matrix)
    }

    fn write_internal(&mut self, id: EntryId, internal: Internal) -> csgedit_db::Result<()> {
        self.check("write", &self.name_of(id))?;
        self.inner.write_internal(id, internal)
    }
}
