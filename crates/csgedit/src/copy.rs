//! The copy engine behind xpush.
//!
//! Copying an object under a transform yields the name of the entry that
//! holds "this object moved by this transform": the object itself when the
//! transform is the identity and nothing below it changes, otherwise a use
//! claimed from the [`UseRegistry`]. Everything is read from the untouched
//! store; writes are staged children first and applied by
//! [`CopyEngine::commit`].

use csgedit_db::{walk_leaves, Action, Combination, DbError, EntryId, Internal, Leaf, ObjectStore};
use csgedit_math::Transform;
use tracing::{debug, warn};

use crate::config::EditConfig;
use crate::counter::RunCounters;
use crate::error::{store_io, EditError, Result};
use crate::registry::{IdentityClaim, UseRegistry, UseTarget};

/// Destination of a staged write.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedTarget {
    /// Overwrite an existing entry.
    Existing(EntryId),
    /// Create a new entry with this name.
    Fresh(String),
}

/// A write waiting for commit.
#[derive(Debug, Clone)]
pub struct StagedWrite {
    /// Where the body goes.
    pub target: StagedTarget,
    /// New representation.
    pub body: Internal,
}

/// What a commit did to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitCounts {
    /// Duplicates created.
    pub created: usize,
    /// Existing objects overwritten.
    pub rewritten: usize,
}

/// Copies objects under transforms for one xpush run.
pub struct CopyEngine<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    counters: &'a RunCounters,
    registry: &'a mut UseRegistry,
    config: &'a EditConfig,
    staged: Vec<StagedWrite>,
    missing: Vec<String>,
}

impl<'a, S: ObjectStore + ?Sized> CopyEngine<'a, S> {
    /// Engine over a store whose counters and registry are already prepared.
    pub fn new(
        store: &'a S,
        counters: &'a RunCounters,
        registry: &'a mut UseRegistry,
        config: &'a EditConfig,
    ) -> Self {
        Self {
            store,
            counters,
            registry,
            config,
            staged: Vec::new(),
            missing: Vec::new(),
        }
    }

    /// Writes staged so far, in commit order.
    pub fn staged(&self) -> &[StagedWrite] {
        &self.staged
    }

    /// Leaves skipped because their target does not exist.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    /// Copy every member of `comb` under `xform` composed with its leaf
    /// matrix. Returns the rewritten combination, whose copied leaves carry no
    /// matrix, and whether any leaf changed.
    pub fn copy_members(&mut self, comb: &Combination, xform: &Transform) -> Result<(Combination, bool)> {
        let mut out = comb.clone();
        let changed = walk_leaves(&mut out, |_, leaf| -> Result<Action> {
            let Some(child) = self.store.lookup(&leaf.name) else {
                warn!(leaf = %leaf.name, "skipping missing member");
                self.missing.push(leaf.name.clone());
                return Ok(Action::Continue);
            };
            let child_xform = xform.then(&leaf.effective_matrix());
            let name = self.copy_object(child, &child_xform)?;
            if name == leaf.name && leaf.matrix.is_none() {
                return Ok(Action::Continue);
            }
            Ok(Action::Replace(Leaf {
                name,
                op: leaf.op,
                matrix: None,
            }))
        })?;
        Ok((out, changed > 0))
    }

    /// Copy `id` under `xform`; returns the name holding the result.
    pub fn copy_object(&mut self, id: EntryId, xform: &Transform) -> Result<String> {
        let entry = self
            .store
            .entry(id)
            .ok_or_else(|| EditError::NotFound(format!("{id:?}")))?;
        if entry.kind.is_solid() {
            self.copy_solid(id, xform)
        } else {
            self.copy_comb(id, xform)
        }
    }

    fn copy_solid(&mut self, id: EntryId, xform: &Transform) -> Result<String> {
        let tol = self.config.tolerance;
        let name = self.name_of(id);
        if tol.is_identity(xform) {
            match self.registry.claim_identity(id, &tol) {
                IdentityClaim::Original | IdentityClaim::Unlisted => return Ok(name),
                IdentityClaim::Taken => {}
            }
        }
        if let Some(target) = self.registry.lookup_existing(id, xform, &tol) {
            return Ok(self.resolve(id, &target));
        }
        let target = self.registry.claim(self.store, self.counters, id, xform)?;
        let prim = self
            .store
            .read_solid(id, Some(xform))
            .map_err(|e| read_error(&name, e))?;
        debug!(solid = %name, to = ?target, "copy solid");
        self.stage(id, &target, Internal::Solid(prim));
        Ok(self.resolve(id, &target))
    }

    fn copy_comb(&mut self, id: EntryId, xform: &Transform) -> Result<String> {
        let tol = self.config.tolerance;
        let name = self.name_of(id);
        if let Some(target) = self.registry.lookup_existing(id, xform, &tol) {
            return Ok(self.resolve(id, &target));
        }
        let comb = self
            .store
            .read_comb(id)
            .map_err(|e| read_error(&name, e))?;
        let (rewritten, changed) = self.copy_members(&comb, xform)?;

        let target = if tol.is_identity(xform) {
            match self.registry.claim_identity(id, &tol) {
                IdentityClaim::Original => UseTarget::Original,
                IdentityClaim::Unlisted if !changed => return Ok(name),
                _ => self.registry.claim(self.store, self.counters, id, xform)?,
            }
        } else {
            self.registry.claim(self.store, self.counters, id, xform)?
        };
        if target == UseTarget::Original && !changed {
            return Ok(name);
        }
        debug!(comb = %name, to = ?target, "copy combination");
        self.stage(id, &target, Internal::Combination(rewritten));
        Ok(self.resolve(id, &target))
    }

    /// Stage a write to an existing entry.
    pub fn stage_existing(&mut self, id: EntryId, body: Internal) {
        self.staged.push(StagedWrite {
            target: StagedTarget::Existing(id),
            body,
        });
    }

    fn stage(&mut self, id: EntryId, target: &UseTarget, body: Internal) {
        let target = match target {
            UseTarget::Original => StagedTarget::Existing(id),
            UseTarget::Fresh(name) => StagedTarget::Fresh(name.clone()),
        };
        self.staged.push(StagedWrite { target, body });
    }

    fn name_of(&self, id: EntryId) -> String {
        self.store.name(id).unwrap_or_default().to_string()
    }

    fn resolve(&self, id: EntryId, target: &UseTarget) -> String {
        match target {
            UseTarget::Original => self.name_of(id),
            UseTarget::Fresh(name) => name.clone(),
        }
    }

    /// Take the staged writes, leaving the engine empty.
    pub fn into_staged(self) -> Vec<StagedWrite> {
        self.staged
    }
}

/// Apply staged writes in order: fresh entries are created first, then
/// written.
pub fn commit<S: ObjectStore + ?Sized>(store: &mut S, staged: Vec<StagedWrite>) -> Result<CommitCounts> {
    let mut counts = CommitCounts::default();
    for write in staged {
        match write.target {
            StagedTarget::Existing(id) => {
                let name = store.name(id).unwrap_or_default().to_string();
                store
                    .write_internal(id, write.body)
                    .map_err(store_io("write", &name))?;
                counts.rewritten += 1;
            }
            StagedTarget::Fresh(name) => {
                let id = store
                    .create(&name, write.body.kind())
                    .map_err(store_io("create", &name))?;
                store
                    .write_internal(id, write.body)
                    .map_err(store_io("write", &name))?;
                counts.created += 1;
            }
        }
    }
    Ok(counts)
}

/// Map a read failure, keeping primitive transform errors distinct.
pub(crate) fn read_error(name: &str, err: DbError) -> EditError {
    match err {
        DbError::Primitive { name, source } => EditError::Transform { name, source },
        other => store_io("read", name)(other),
    }
}
