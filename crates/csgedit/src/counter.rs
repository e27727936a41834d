//! Run-scoped use and reference counters.
//!
//! `uses` counts how many paths inside the subtree being normalized reach an
//! object; `refs` counts how many paths from any tree top in the whole
//! database reach it. An object with `uses == refs` is referenced only from
//! inside the subtree and may be rewritten in place; anything else is shared
//! with the rest of the database and must be copied instead.

use std::collections::HashMap;

use csgedit_db::{EntryId, ObjectStore};
use tracing::debug;

use crate::config::EditConfig;
use crate::error::{store_io, Result};
use crate::walk::functree;

/// Counters for one object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Paths reaching the object from the subtree root.
    pub uses: u32,
    /// Paths reaching the object from every tree top.
    pub refs: u32,
}

/// Counters for every object touched by a run.
#[derive(Debug, Default)]
pub struct RunCounters {
    counts: HashMap<EntryId, Counters>,
}

impl RunCounters {
    /// All counters zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for `id` (zero if never touched).
    pub fn get(&self, id: EntryId) -> Counters {
        self.counts.get(&id).copied().unwrap_or_default()
    }

    /// Use count for `id`.
    pub fn uses(&self, id: EntryId) -> u32 {
        self.get(id).uses
    }

    /// Reference count for `id`.
    pub fn refs(&self, id: EntryId) -> u32 {
        self.get(id).refs
    }

    /// Objects with a non-zero use count.
    pub fn used(&self) -> impl Iterator<Item = (EntryId, Counters)> + '_ {
        self.counts
            .iter()
            .filter(|(_, c)| c.uses > 0)
            .map(|(id, c)| (*id, *c))
    }

    /// Use pass: count paths from `root` to every object below it.
    pub fn count_uses<S: ObjectStore + ?Sized>(
        &mut self,
        store: &S,
        root: EntryId,
        config: &EditConfig,
    ) -> Result<()> {
        functree(store, root, config, &mut |id, _| {
            self.counts.entry(id).or_default().uses += 1;
            Ok(())
        })
    }

    /// Simple reference pass: one count per leaf of every combination in the
    /// store. Combinations nobody references are the tree tops, returned in
    /// name order.
    pub fn find_tree_tops<S: ObjectStore + ?Sized>(&mut self, store: &S) -> Result<Vec<EntryId>> {
        let mut combs = Vec::new();
        for id in store.ids() {
            let Some(entry) = store.entry(id) else {
                continue;
            };
            if !entry.kind.is_combination() {
                continue;
            }
            combs.push(id);
            let comb = store.read_comb(id).map_err(store_io("read", &entry.name))?;
            for leaf in &comb.leaves {
                if let Some(child) = store.lookup(&leaf.name) {
                    self.counts.entry(child).or_default().refs += 1;
                }
            }
        }
        Ok(combs.into_iter().filter(|id| self.refs(*id) == 0).collect())
    }

    /// Accurate reference pass: re-zero `refs`, then count every path from
    /// each tree top.
    pub fn count_refs_from<S: ObjectStore + ?Sized>(
        &mut self,
        store: &S,
        tops: &[EntryId],
        config: &EditConfig,
    ) -> Result<()> {
        for counters in self.counts.values_mut() {
            counters.refs = 0;
        }
        for top in tops {
            functree(store, *top, config, &mut |id, _| {
                self.counts.entry(id).or_default().refs += 1;
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Both passes as xpush needs them, for the subtree at `root`.
    pub fn for_subtree<S: ObjectStore + ?Sized>(
        store: &S,
        root: EntryId,
        config: &EditConfig,
    ) -> Result<Self> {
        let mut counters = Self::new();
        counters.count_uses(store, root, config)?;
        let tops = counters.find_tree_tops(store)?;
        debug!(tops = tops.len(), "found tree tops");
        counters.count_refs_from(store, &tops, config)?;
        Ok(counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditError;
    use csgedit_db::{Combination, Database, Leaf};
    use csgedit_math::Point3;
    use csgedit_primitives::make_sphere;

    fn shared_db() -> Database {
        // top -> a -> s, top -> b -> s, other -> s
        let mut db = Database::new();
        db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
        db.put_comb("a", Combination::new(vec![Leaf::new("s")])).unwrap();
        db.put_comb("b", Combination::new(vec![Leaf::new("s")])).unwrap();
        db.put_comb("top", Combination::new(vec![Leaf::new("a"), Leaf::new("b")]))
            .unwrap();
        db.put_comb("other", Combination::new(vec![Leaf::new("s")]))
            .unwrap();
        db
    }

    #[test]
    fn tree_tops_are_unreferenced_combinations() {
        let db = shared_db();
        let mut counters = RunCounters::new();
        let tops = counters.find_tree_tops(&db).unwrap();
        let names: Vec<_> = tops.iter().map(|id| db.name(*id).unwrap()).collect();
        assert_eq!(names, ["other", "top"]);
    }

    #[test]
    fn xpush_counts_distinguish_outside_sharing() {
        let db = shared_db();
        let top = db.lookup("top").unwrap();
        let counters = RunCounters::for_subtree(&db, top, &EditConfig::default()).unwrap();
        let s = db.lookup("s").unwrap();
        let a = db.lookup("a").unwrap();
        assert_eq!(counters.get(s), Counters { uses: 2, refs: 3 });
        assert_eq!(counters.get(a), Counters { uses: 1, refs: 1 });
        assert_eq!(counters.get(top), Counters { uses: 1, refs: 1 });
        assert_eq!(counters.used().count(), 4);
    }

    #[test]
    fn cyclic_database_aborts_counting() {
        let mut db = shared_db();
        db.put_comb("x", Combination::new(vec![Leaf::new("y")])).unwrap();
        db.put_comb("y", Combination::new(vec![Leaf::new("x")])).unwrap();
        db.put_comb("entry", Combination::new(vec![Leaf::new("x")]))
            .unwrap();
        let root = db.lookup("entry").unwrap();
        let err = RunCounters::for_subtree(&db, root, &EditConfig::default()).unwrap_err();
        assert!(matches!(err, EditError::CyclicHierarchy(_)));
    }
}
