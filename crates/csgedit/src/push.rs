//! Push: bake accumulated matrices into solid geometry.
//!
//! Push walks a hierarchy accumulating leaf matrices, moves every solid by
//! the matrix it is reached with and then drops every leaf matrix, so the
//! world-space geometry is unchanged while the hierarchy becomes
//! transform-free. Push assumes each object below the root is owned by this
//! hierarchy alone; shared objects are the business of
//! [`xpush`](crate::xpush).

use std::collections::{HashMap, HashSet};

use csgedit_db::{walk_leaves, Action, EntryId, Internal, Leaf, ObjectStore};
use csgedit_math::Transform;
use tracing::{debug, info, warn};

use crate::config::EditConfig;
use crate::copy::read_error;
use crate::error::{store_io, EditError, Result};
use crate::identitize::verify_identity;
use crate::walk::path_string;

/// What a successful push changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Object that was pushed.
    pub object: String,
    /// Solids whose geometry was rewritten.
    pub solids_rewritten: usize,
    /// Combinations whose leaf matrices were cleared.
    pub combinations_rewritten: usize,
    /// Leaf targets that do not exist (skipped).
    pub missing: Vec<String>,
}

impl PushReport {
    /// `true` when the push wrote nothing.
    pub fn is_noop(&self) -> bool {
        self.solids_rewritten == 0 && self.combinations_rewritten == 0
    }
}

/// Result of pushing one object of a batch.
#[derive(Debug)]
pub struct PushOutcome {
    /// Object name as given.
    pub object: String,
    /// Report or failure.
    pub result: Result<PushReport>,
}

/// Per-object results of [`push_all`].
#[derive(Debug, Default)]
pub struct PushSummary {
    /// One outcome per requested object, in request order.
    pub outcomes: Vec<PushOutcome>,
}

impl PushSummary {
    /// Outcomes that failed.
    pub fn failed(&self) -> impl Iterator<Item = &PushOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// `true` when every object was pushed.
    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Everything push will write, gathered before the first write.
#[derive(Debug, Default)]
struct Plan {
    solids: Vec<(EntryId, Transform)>,
    solid_index: HashMap<EntryId, usize>,
    combs: Vec<EntryId>,
    comb_set: HashSet<EntryId>,
    visited: HashSet<(EntryId, [u64; 16])>,
    missing: Vec<String>,
}

struct Planner<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    config: &'a EditConfig,
    plan: Plan,
    path: Vec<EntryId>,
}

impl<S: ObjectStore + ?Sized> Planner<'_, S> {
    fn descend(&mut self, id: EntryId, acc: Transform) -> Result<()> {
        let entry = self
            .store
            .entry(id)
            .cloned()
            .ok_or_else(|| EditError::NotFound(format!("{id:?}")))?;

        if entry.kind.is_solid() {
            match self.plan.solid_index.get(&id) {
                Some(&i) => {
                    let (_, seen) = self.plan.solids[i];
                    if !self.config.tolerance.matrices_equal(&seen, &acc) {
                        self.path.push(id);
                        return Err(EditError::ConflictingTransforms {
                            solid: entry.name,
                            path: path_string(self.store, &self.path),
                        });
                    }
                }
                None => {
                    self.plan.solid_index.insert(id, self.plan.solids.len());
                    self.plan.solids.push((id, acc));
                }
            }
            return Ok(());
        }

        if self.path.contains(&id) || self.path.len() >= self.config.max_depth {
            self.path.push(id);
            return Err(EditError::CyclicHierarchy(path_string(self.store, &self.path)));
        }
        let key = (id, acc.to_row_major().map(f64::to_bits));
        if !self.plan.visited.insert(key) {
            return Ok(());
        }

        let name = entry.name;
        let comb = self
            .store
            .read_comb(id)
            .map_err(|e| read_error(&name, e))?;
        if comb.leaves.iter().any(|l| l.matrix.is_some()) && self.plan.comb_set.insert(id) {
            self.plan.combs.push(id);
        }

        self.path.push(id);
        for leaf in &comb.leaves {
            let Some(child) = self.store.lookup(&leaf.name) else {
                warn!(comb = %name, leaf = %leaf.name, "skipping missing member");
                self.plan.missing.push(leaf.name.clone());
                continue;
            };
            let child_acc = acc.then(&leaf.effective_matrix());
            debug!(comb = %name, leaf = %leaf.name, "descend");
            self.descend(child, child_acc)?;
        }
        self.path.pop();
        Ok(())
    }
}

/// Push the hierarchy at `root`.
///
/// Planning is read-only: a cycle, a missing root or a solid reached under
/// two different matrices fails before anything is written. Once writing
/// starts, a store failure stops the push but the objects already written
/// stay written.
pub fn push<S: ObjectStore + ?Sized>(
    store: &mut S,
    root: EntryId,
    config: &EditConfig,
) -> Result<PushReport> {
    let object = store
        .name(root)
        .ok_or_else(|| EditError::NotFound(format!("{root:?}")))?
        .to_string();

    let mut planner = Planner {
        store: &*store,
        config,
        plan: Plan::default(),
        path: Vec::new(),
    };
    planner.descend(root, Transform::identity())?;
    let plan = planner.plan;

    let mut report = PushReport {
        object,
        missing: plan.missing,
        ..PushReport::default()
    };

    let identity = Transform::identity();
    for (id, acc) in plan.solids {
        if acc == identity {
            continue;
        }
        let name = store.name(id).unwrap_or_default().to_string();
        let moved = store
            .read_solid(id, Some(&acc))
            .map_err(|e| read_error(&name, e))?;
        debug!(solid = %name, "bake matrix");
        store
            .write_internal(id, Internal::Solid(moved))
            .map_err(store_io("write", &name))?;
        report.solids_rewritten += 1;
    }

    for id in plan.combs {
        let name = store.name(id).unwrap_or_default().to_string();
        let mut comb = store.read_comb(id).map_err(|e| read_error(&name, e))?;
        walk_leaves(&mut comb, |_, leaf| -> Result<Action> {
            Ok(match leaf.matrix {
                Some(_) => Action::Replace(Leaf {
                    matrix: None,
                    ..leaf.clone()
                }),
                None => Action::Continue,
            })
        })?;
        store
            .write_internal(id, Internal::Combination(comb))
            .map_err(store_io("write", &name))?;
        report.combinations_rewritten += 1;
    }

    verify_identity(store, root, config)?;
    info!(
        object = %report.object,
        solids = report.solids_rewritten,
        combinations = report.combinations_rewritten,
        "pushed"
    );
    Ok(report)
}

/// Push each named object in turn. A failure is recorded and the next
/// object is still attempted.
pub fn push_all<S, I, N>(store: &mut S, objects: I, config: &EditConfig) -> PushSummary
where
    S: ObjectStore + ?Sized,
    I: IntoIterator<Item = N>,
    N: AsRef<str>,
{
    let mut summary = PushSummary::default();
    for object in objects {
        let object = object.as_ref().to_string();
        let result = match store.lookup(&object) {
            Some(id) => push(store, id, config),
            None => Err(EditError::NotFound(object.clone())),
        };
        if let Err(e) = &result {
            warn!(object = %object, error = %e, "push failed");
        }
        summary.outcomes.push(PushOutcome { object, result });
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use csgedit_db::{Combination, Database};
    use csgedit_math::Point3;
    use csgedit_primitives::{make_rpp, make_sphere};

    fn placed_db() -> Database {
        let mut db = Database::new();
        db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
        db.put_solid("b", make_rpp(Point3::origin(), Point3::new(1.0, 1.0, 1.0)))
            .unwrap();
        db.put_comb(
            "a",
            Combination::new(vec![
                Leaf::new("s").with_matrix(Transform::translation(0.0, 2.0, 0.0)),
                Leaf::new("b"),
            ]),
        )
        .unwrap();
        db.put_comb(
            "top",
            Combination::new(vec![
                Leaf::new("a").with_matrix(Transform::translation(1.0, 0.0, 0.0))
            ]),
        )
        .unwrap();
        db
    }

    #[test]
    fn bakes_and_clears() {
        let mut db = placed_db();
        let top = db.lookup("top").unwrap();
        let report = push(&mut db, top, &EditConfig::default()).unwrap();
        assert_eq!(report.solids_rewritten, 2);
        assert_eq!(report.combinations_rewritten, 2);
        let s = db.read_solid(db.lookup("s").unwrap(), None).unwrap();
        assert_eq!(s.vertex(), Point3::new(1.0, 2.0, 0.0));
        let b = db.read_solid(db.lookup("b").unwrap(), None).unwrap();
        assert_eq!(b.vertex(), Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn second_push_is_a_noop() {
        let mut db = placed_db();
        let top = db.lookup("top").unwrap();
        push(&mut db, top, &EditConfig::default()).unwrap();
        let snapshot = db.to_document();
        let again = push(&mut db, top, &EditConfig::default()).unwrap();
        assert!(again.is_noop());
        assert_eq!(db.to_document(), snapshot);
    }

    #[test]
    fn conflicting_matrices_write_nothing() {
        let mut db = placed_db();
        db.put_comb(
            "twice",
            Combination::new(vec![
                Leaf::new("s"),
                Leaf::new("s").with_matrix(Transform::translation(5.0, 0.0, 0.0)),
            ]),
        )
        .unwrap();
        let before = db.to_document();
        let twice = db.lookup("twice").unwrap();
        let err = push(&mut db, twice, &EditConfig::default()).unwrap_err();
        assert!(matches!(err, EditError::ConflictingTransforms { solid, path } if solid == "s" && path == "twice/s"));
        assert_eq!(db.to_document(), before);
    }

    #[test]
    fn same_matrix_twice_is_fine() {
        let mut db = Database::new();
        db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
        let shift = Transform::translation(0.0, 0.0, 4.0);
        db.put_comb("a", Combination::new(vec![Leaf::new("s").with_matrix(shift)]))
            .unwrap();
        db.put_comb("top", Combination::new(vec![Leaf::new("a"), Leaf::new("a")]))
            .unwrap();
        let top = db.lookup("top").unwrap();
        let report = push(&mut db, top, &EditConfig::default()).unwrap();
        assert_eq!(report.solids_rewritten, 1);
        let s = db.read_solid(db.lookup("s").unwrap(), None).unwrap();
        assert_eq!(s.vertex(), Point3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn missing_leaf_is_reported() {
        let mut db = placed_db();
        db.put_comb(
            "holey",
            Combination::new(vec![
                Leaf::new("nowhere").with_matrix(Transform::translation(1.0, 1.0, 1.0)),
                Leaf::new("s"),
            ]),
        )
        .unwrap();
        let holey = db.lookup("holey").unwrap();
        let report = push(&mut db, holey, &EditConfig::default()).unwrap();
        assert_eq!(report.missing, ["nowhere"]);
        assert_eq!(report.combinations_rewritten, 1);
        assert_eq!(report.solids_rewritten, 0);
    }

    #[test]
    fn batch_records_failures_and_continues() {
        let mut db = placed_db();
        let summary = push_all(&mut db, ["ghost", "top"], &EditConfig::default());
        assert!(!summary.is_success());
        let failed: Vec<_> = summary.failed().map(|o| o.object.as_str()).collect();
        assert_eq!(failed, ["ghost"]);
        assert!(summary.outcomes[1].result.is_ok());
    }

    #[test]
    fn cycle_is_detected_before_writing() {
        let mut db = placed_db();
        db.put_comb(
            "x",
            Combination::new(vec![
                Leaf::new("s").with_matrix(Transform::translation(1.0, 0.0, 0.0)),
                Leaf::new("y"),
            ]),
        )
        .unwrap();
        db.put_comb("y", Combination::new(vec![Leaf::new("x")])).unwrap();
        let before = db.to_document();
        let x = db.lookup("x").unwrap();
        let err = push(&mut db, x, &EditConfig::default()).unwrap_err();
        assert!(matches!(err, EditError::CyclicHierarchy(p) if p == "x/y/x"));
        assert_eq!(db.to_document(), before);
    }
}
