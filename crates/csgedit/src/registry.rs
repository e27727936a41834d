//! The use registry.
//!
//! For every object that xpush may have to duplicate, the registry keeps the
//! list of uses prepared for it before any geometry is copied. Each use is a
//! destination (the original entry or a fresh duplicate name) plus the
//! transform it was claimed for. Copying an object under some transform
//! either finds a use already claimed for an equal transform or claims the
//! next unused one.

use std::collections::HashMap;

use csgedit_db::{EntryId, ObjectStore};
use csgedit_math::{Tolerance, Transform};
use tracing::debug;

use crate::counter::RunCounters;
use crate::error::{EditError, Result};
use crate::names::{suffix_width, NameAllocator};

/// Where a use of an object lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseTarget {
    /// The object itself, rewritten in place.
    Original,
    /// A duplicate that does not exist in the store yet.
    Fresh(String),
}

/// One prepared use of an object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectUse {
    /// Destination entry.
    pub target: UseTarget,
    /// Transform the use was claimed for; `None` until claimed.
    pub xform: Option<Transform>,
    /// Whether the use was handed out.
    pub used: bool,
}

impl ObjectUse {
    fn unclaimed(target: UseTarget) -> Self {
        Self {
            target,
            xform: None,
            used: false,
        }
    }
}

/// Outcome of asking for the original under the identity transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityClaim {
    /// The original holds the identity use.
    Original,
    /// The object has no prepared original use.
    Unlisted,
    /// The original was already claimed for another transform.
    Taken,
}

/// Prepared uses of every object in one xpush run.
#[derive(Debug, Default)]
pub struct UseRegistry {
    uses: HashMap<EntryId, Vec<ObjectUse>>,
}

impl UseRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepared uses of `id`.
    pub fn uses_of(&self, id: EntryId) -> &[ObjectUse] {
        self.uses.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Prepare uses for every counted object except `skip`.
    ///
    /// Objects with a single use that nobody outside the subtree references
    /// need nothing. Everything else gets one use per counted use: fresh
    /// names, with the original appended last when all of its references
    /// come from inside the subtree.
    pub fn prepare<S: ObjectStore + ?Sized>(
        &mut self,
        store: &S,
        counters: &RunCounters,
        names: &mut NameAllocator,
        skip: EntryId,
    ) -> Result<()> {
        for id in store.ids() {
            let c = counters.get(id);
            if id == skip || c.uses == 0 {
                continue;
            }
            if c.uses < 2 && c.uses == c.refs {
                continue;
            }
            if self.uses.contains_key(&id) {
                continue;
            }
            let Some(base) = store.name(id) else {
                continue;
            };
            let keep_original = c.uses == c.refs;
            let fresh = if keep_original { c.uses - 1 } else { c.uses };
            let mut list: Vec<ObjectUse> = names
                .allocate_many(store, base, suffix_width(c.uses), fresh as usize)?
                .into_iter()
                .map(|name| ObjectUse::unclaimed(UseTarget::Fresh(name)))
                .collect();
            if keep_original {
                list.push(ObjectUse::unclaimed(UseTarget::Original));
            }
            debug!(object = base, uses = c.uses, refs = c.refs, "prepared uses");
            self.uses.insert(id, list);
        }
        Ok(())
    }

    /// Claim the original of `id` for the identity transform.
    pub fn claim_identity(&mut self, id: EntryId, tol: &Tolerance) -> IdentityClaim {
        let Some(original) = self
            .uses
            .get_mut(&id)
            .and_then(|list| list.iter_mut().find(|u| u.target == UseTarget::Original))
        else {
            return IdentityClaim::Unlisted;
        };
        if !original.used {
            original.used = true;
            original.xform = Some(Transform::identity());
            return IdentityClaim::Original;
        }
        match original.xform {
            Some(x) if tol.is_identity(&x) => IdentityClaim::Original,
            _ => IdentityClaim::Taken,
        }
    }

    /// A use of `id` already claimed for a transform equal to `xform`.
    pub fn lookup_existing(
        &mut self,
        id: EntryId,
        xform: &Transform,
        tol: &Tolerance,
    ) -> Option<UseTarget> {
        let found = self.uses.get_mut(&id)?.iter_mut().find(|u| {
            u.xform
                .as_ref()
                .is_some_and(|x| tol.matrices_equal(x, xform))
        })?;
        found.used = true;
        Some(found.target.clone())
    }

    /// Claim the next unused use of `id` for `xform`.
    ///
    /// An object with exactly one use and one reference that needed no
    /// preparation is claimed in place. Anything else without an unused use
    /// left is a counting error.
    pub fn claim<S: ObjectStore + ?Sized>(
        &mut self,
        store: &S,
        counters: &RunCounters,
        id: EntryId,
        xform: &Transform,
    ) -> Result<UseTarget> {
        let list = self.uses.entry(id).or_default();
        if let Some(next) = list.iter_mut().find(|u| !u.used) {
            next.used = true;
            next.xform = Some(*xform);
            return Ok(next.target.clone());
        }
        let c = counters.get(id);
        if list.is_empty() && c.uses == 1 && c.refs == 1 {
            list.push(ObjectUse {
                target: UseTarget::Original,
                xform: Some(*xform),
                used: true,
            });
            return Ok(UseTarget::Original);
        }
        Err(EditError::ExhaustedUses(
            store.name(id).unwrap_or_default().to_string(),
        ))
    }

    /// Fresh names that were prepared but never claimed.
    pub fn unclaimed_fresh(&self) -> impl Iterator<Item = &str> + '_ {
        self.uses.values().flatten().filter_map(|u| match &u.target {
            UseTarget::Fresh(name) if !u.used => Some(name.as_str()),
            _ => None,
        })
    }

    /// Objects whose original use was prepared but never claimed. Every
    /// reference to them has been redirected to a duplicate.
    pub fn orphaned_originals(&self) -> Vec<EntryId> {
        self.uses
            .iter()
            .filter(|(_, list)| {
                list.iter()
                    .any(|u| u.target == UseTarget::Original && !u.used)
            })
            .map(|(id, _)| *id)
            .collect()
    }
}
