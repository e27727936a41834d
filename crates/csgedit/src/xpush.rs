//! XPush: push that is safe under sharing.
//!
//! Where [`push`](crate::push) would move a shared solid for every parent at
//! once, xpush gives every distinct (object, accumulated matrix) pair below
//! the target its own entry. Objects referenced only from inside the subtree
//! are rewritten in place when they can be; everything else is duplicated
//! under a fresh name and the leaves above it are pointed at the duplicate.
//!
//! The run is planned and copied against the untouched store. Writes are
//! committed in one go at the end, so any failure up to that point leaves the
//! store as it was.

use csgedit_db::{EntryId, Internal, ObjectStore};
use csgedit_math::Transform;
use tracing::{info, warn};

use crate::config::EditConfig;
use crate::copy::{commit, read_error, CopyEngine};
use crate::counter::RunCounters;
use crate::error::{store_io, EditError, Result};
use crate::identitize::clear_leaf_matrices;
use crate::names::NameAllocator;
use crate::registry::UseRegistry;

/// What a successful xpush changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XPushReport {
    /// Object that was pushed.
    pub object: String,
    /// Duplicates created.
    pub created: usize,
    /// Existing objects rewritten in place (the target included).
    pub rewritten: usize,
    /// Prepared duplicate names that turned out not to be needed.
    pub discarded: usize,
    /// Originals deleted because every reference now points at a duplicate.
    pub removed: Vec<String>,
    /// Leaf targets that do not exist (skipped).
    pub missing: Vec<String>,
}

/// XPush the combination at `root`.
pub fn xpush<S: ObjectStore + ?Sized>(
    store: &mut S,
    root: EntryId,
    config: &EditConfig,
) -> Result<XPushReport> {
    let entry = store
        .entry(root)
        .cloned()
        .ok_or_else(|| EditError::NotFound(format!("{root:?}")))?;
    if entry.kind.is_solid() {
        return Err(EditError::NotACombination(entry.name));
    }

    let counters = RunCounters::for_subtree(&*store, root, config)?;
    let mut names = NameAllocator::new(config.name_retry_budget);
    let mut registry = UseRegistry::new();
    registry.prepare(&*store, &counters, &mut names, root)?;

    let comb = store
        .read_comb(root)
        .map_err(|e| read_error(&entry.name, e))?;
    let mut engine = CopyEngine::new(&*store, &counters, &mut registry, config);
    let (rewritten, changed) = engine.copy_members(&comb, &Transform::identity())?;
    if changed {
        engine.stage_existing(root, Internal::Combination(rewritten));
    }
    let missing = engine.missing().to_vec();
    let staged = engine.into_staged();

    let discarded = registry.unclaimed_fresh().count();
    let orphans = registry.orphaned_originals();

    let counts = commit(store, staged)?;
    let mut removed = Vec::with_capacity(orphans.len());
    for id in orphans {
        let name = store.name(id).unwrap_or_default().to_string();
        warn!(object = %name, "removing original replaced by duplicates");
        store.delete(id).map_err(store_io("delete", &name))?;
        removed.push(name);
    }
    removed.sort();

    clear_leaf_matrices(store, root)?;

    let report = XPushReport {
        object: entry.name,
        created: counts.created,
        rewritten: counts.rewritten,
        discarded,
        removed,
        missing,
    };
    info!(
        object = %report.object,
        created = report.created,
        rewritten = report.rewritten,
        discarded = report.discarded,
        "xpushed"
    );
    Ok(report)
}
