//! Depth-first traversal of an object's hierarchy.

use csgedit_db::{DirectoryEntry, EntryId, ObjectStore};
use tracing::{debug, warn};

use crate::config::EditConfig;
use crate::error::{store_io, EditError, Result};

/// Visit every object reachable from `root`, children before parents.
///
/// An object reached along several paths is visited once per path, which is
/// what the use counters rely on. Leaves naming missing objects are skipped
/// with a warning. A combination that appears twice on the current path, or
/// nesting deeper than `config.max_depth`, fails with
/// [`EditError::CyclicHierarchy`] before anything else is visited below it.
pub fn functree<S, F>(store: &S, root: EntryId, config: &EditConfig, visit: &mut F) -> Result<()>
where
    S: ObjectStore + ?Sized,
    F: FnMut(EntryId, &DirectoryEntry) -> Result<()>,
{
    let mut path = Vec::new();
    descend(store, root, config, &mut path, visit)
}

fn descend<S, F>(
    store: &S,
    id: EntryId,
    config: &EditConfig,
    path: &mut Vec<EntryId>,
    visit: &mut F,
) -> Result<()>
where
    S: ObjectStore + ?Sized,
    F: FnMut(EntryId, &DirectoryEntry) -> Result<()>,
{
    let entry = store
        .entry(id)
        .cloned()
        .ok_or_else(|| EditError::NotFound(format!("{id:?}")))?;

    if entry.kind.is_combination() {
        if path.contains(&id) || path.len() >= config.max_depth {
            path.push(id);
            return Err(EditError::CyclicHierarchy(path_string(store, path)));
        }
        path.push(id);
        let comb = store
            .read_comb(id)
            .map_err(store_io("read", &entry.name))?;
        for leaf in &comb.leaves {
            match store.lookup(&leaf.name) {
                Some(child) => descend(store, child, config, path, visit)?,
                None => warn!(comb = %entry.name, leaf = %leaf.name, "skipping missing member"),
            }
        }
        path.pop();
    }

    debug!(object = %entry.name, depth = path.len(), "visit");
    visit(id, &entry)
}

/// Slash-separated names along `path`.
pub fn path_string<S: ObjectStore + ?Sized>(store: &S, path: &[EntryId]) -> String {
    path.iter()
        .map(|id| store.name(*id).unwrap_or("?"))
        .collect::<Vec<_>>()
        .join("/")
}
