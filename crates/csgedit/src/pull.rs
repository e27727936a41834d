//! Pull: the inverse of push.
//!
//! Every solid below the root is moved back into its natural frame and the
//! frame is carried up into the leaf matrix that references it, so the
//! world-space geometry is unchanged. A combination whose leaves all end up
//! with the same matrix hands that matrix on to its own parent. Pull never
//! duplicates anything, so it refuses hierarchies in which an object is
//! reached more than once or is also referenced from outside the root.

use csgedit_db::{walk_leaves, Action, EntryId, Internal, Leaf, ObjectStore};
use csgedit_math::{Tolerance, Transform};
use tracing::{debug, info, warn};

use crate::config::EditConfig;
use crate::copy::read_error;
use crate::counter::RunCounters;
use crate::error::{store_io, EditError, Result};

/// What a successful pull changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    /// Object that was pulled.
    pub object: String,
    /// Solids moved into their natural frame.
    pub solids_canonicalized: usize,
    /// Combinations whose leaf matrices changed.
    pub combinations_rewritten: usize,
    /// Leaf targets that do not exist (skipped).
    pub missing: Vec<String>,
}

struct Puller<'a, S: ObjectStore + ?Sized> {
    store: &'a mut S,
    config: &'a EditConfig,
    root: EntryId,
    report: PullReport,
}

impl<S: ObjectStore + ?Sized> Puller<'_, S> {
    /// Pull `id`; returns the matrix its parent leaf must absorb.
    fn pull_object(&mut self, id: EntryId) -> Result<Transform> {
        let entry = self
            .store
            .entry(id)
            .cloned()
            .ok_or_else(|| EditError::NotFound(format!("{id:?}")))?;
        if entry.kind.is_solid() {
            self.pull_solid(id, &entry.name)
        } else {
            self.pull_comb(id, &entry.name)
        }
    }

    fn pull_solid(&mut self, id: EntryId, name: &str) -> Result<Transform> {
        let prim = self
            .store
            .read_solid(id, None)
            .map_err(|e| read_error(name, e))?;
        let (canonical, frame) = prim.canonicalize().map_err(|source| EditError::Transform {
            name: name.to_string(),
            source,
        })?;
        if self.config.tolerance.is_identity(&frame) {
            return Ok(Transform::identity());
        }
        debug!(solid = name, "move into natural frame");
        self.store
            .write_internal(id, Internal::Solid(canonical))
            .map_err(store_io("write", name))?;
        self.report.solids_canonicalized += 1;
        Ok(frame)
    }

    fn pull_comb(&mut self, id: EntryId, name: &str) -> Result<Transform> {
        let tol = self.config.tolerance;
        let mut comb = self
            .store
            .read_comb(id)
            .map_err(|e| read_error(name, e))?;

        let mut frames = Vec::with_capacity(comb.leaves.len());
        let mut complete = true;
        for leaf in &comb.leaves {
            match self.store.lookup(&leaf.name) {
                Some(child) => frames.push(Some(self.pull_object(child)?)),
                None => {
                    warn!(comb = name, leaf = %leaf.name, "skipping missing member");
                    self.report.missing.push(leaf.name.clone());
                    frames.push(None);
                    complete = false;
                }
            }
        }

        let before = comb.clone();
        walk_leaves(&mut comb, |i, leaf| -> Result<Action> {
            let Some(frame) = frames[i] else {
                return Ok(Action::Continue);
            };
            if tol.is_identity(&frame) {
                return Ok(Action::Continue);
            }
            Ok(Action::Replace(with_matrix(leaf, leaf.effective_matrix().then(&frame), &tol)))
        })?;

        let mut hoisted = Transform::identity();
        if id != self.root && complete {
            if let Some(common) = common_matrix(&comb.leaves, &tol) {
                debug!(comb = name, "hoist shared leaf matrix");
                for leaf in &mut comb.leaves {
                    leaf.matrix = None;
                }
                hoisted = common;
            }
        }

        if comb != before {
            self.store
                .write_internal(id, Internal::Combination(comb))
                .map_err(store_io("write", name))?;
            self.report.combinations_rewritten += 1;
        }
        Ok(hoisted)
    }
}

fn with_matrix(leaf: &Leaf, matrix: Transform, tol: &Tolerance) -> Leaf {
    Leaf {
        matrix: (!tol.is_identity(&matrix)).then_some(matrix),
        ..leaf.clone()
    }
}

/// The matrix every leaf carries, if they all carry the same non-identity one.
fn common_matrix(leaves: &[Leaf], tol: &Tolerance) -> Option<Transform> {
    let first = leaves.first()?.matrix?;
    if tol.is_identity(&first) {
        return None;
    }
    leaves
        .iter()
        .all(|l| l.matrix.is_some_and(|m| tol.matrices_equal(&m, &first)))
        .then_some(first)
}

/// First object below `root` that is reached more than once from `root`, or
/// that something outside the subtree references.
///
/// Every path from a tree top to a member reached once from `root` passes
/// through `root`, so its reference count equals `root`'s. Outside owners of
/// `root` itself are fine: the root's world placement never changes.
fn shared_member<S: ObjectStore + ?Sized>(
    store: &S,
    root: EntryId,
    counters: &RunCounters,
) -> Option<EntryId> {
    let root_refs = counters.refs(root);
    store.ids().into_iter().find(|id| {
        let c = counters.get(*id);
        *id != root && c.uses > 0 && (c.uses > 1 || c.refs != root_refs)
    })
}

/// Pull the combination at `root`.
///
/// Writes happen bottom-up as the walk returns; a store failure stops the
/// pull with the objects below already written.
pub fn pull<S: ObjectStore + ?Sized>(
    store: &mut S,
    root: EntryId,
    config: &EditConfig,
) -> Result<PullReport> {
    let entry = store
        .entry(root)
        .cloned()
        .ok_or_else(|| EditError::NotFound(format!("{root:?}")))?;
    if entry.kind.is_solid() {
        return Err(EditError::NotACombination(entry.name));
    }

    let counters = RunCounters::for_subtree(&*store, root, config)?;
    if let Some(shared) = shared_member(&*store, root, &counters) {
        let name = store.name(shared).unwrap_or_default().to_string();
        return Err(EditError::SharedObject(name));
    }

    let mut puller = Puller {
        store,
        config,
        root,
        report: PullReport {
            object: entry.name,
            ..PullReport::default()
        },
    };
    puller.pull_object(root)?;
    let report = puller.report;
    info!(
        object = %report.object,
        solids = report.solids_canonicalized,
        combinations = report.combinations_rewritten,
        "pulled"
    );
    Ok(report)
}
