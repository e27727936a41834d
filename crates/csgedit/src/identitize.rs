//! Forcing leaf matrices to the identity.

use std::collections::HashSet;

use csgedit_db::{walk_leaves, Action, EntryId, Internal, Leaf, ObjectStore};
use tracing::{debug, info};

use crate::config::EditConfig;
use crate::copy::read_error;
use crate::error::{store_io, EditError, Result};
use crate::walk::functree;

/// Combinations below (and including) `root`, each once, children first.
pub(crate) fn subtree_combinations<S: ObjectStore + ?Sized>(
    store: &S,
    root: EntryId,
    config: &EditConfig,
) -> Result<Vec<EntryId>> {
    let mut seen = HashSet::new();
    let mut combs = Vec::new();
    functree(store, root, config, &mut |id, entry| {
        if entry.kind.is_combination() && seen.insert(id) {
            combs.push(id);
        }
        Ok(())
    })?;
    Ok(combs)
}

/// Drop every leaf matrix in the subtree at `root`, whatever it was.
///
/// Geometry is not compensated, so world placement changes unless the
/// matrices were already pushed into the solids. Returns the number of
/// combinations rewritten.
pub fn identitize<S: ObjectStore + ?Sized>(
    store: &mut S,
    root: EntryId,
    config: &EditConfig,
) -> Result<usize> {
    let mut rewritten = 0;
    for id in subtree_combinations(store, root, config)? {
        if clear_leaf_matrices(store, id)? {
            rewritten += 1;
        }
    }
    info!(rewritten, "identitized");
    Ok(rewritten)
}

/// Drop the leaf matrices of the combination `id` only, leaving its members
/// alone. Returns whether anything was written.
pub(crate) fn clear_leaf_matrices<S: ObjectStore + ?Sized>(
    store: &mut S,
    id: EntryId,
) -> Result<bool> {
    let name = store.name(id).unwrap_or_default().to_string();
    let mut comb = store.read_comb(id).map_err(|e| read_error(&name, e))?;
    let cleared = walk_leaves(&mut comb, |_, leaf| -> Result<Action> {
        Ok(match leaf.matrix {
            Some(_) => Action::Replace(Leaf {
                matrix: None,
                ..leaf.clone()
            }),
            None => Action::Continue,
        })
    })?;
    if cleared == 0 {
        return Ok(false);
    }
    debug!(comb = %name, leaves = cleared, "identitize");
    store
        .write_internal(id, Internal::Combination(comb))
        .map_err(store_io("write", &name))?;
    Ok(true)
}

/// Check that no leaf in the subtree at `root` carries a non-identity matrix.
pub fn verify_identity<S: ObjectStore + ?Sized>(
    store: &S,
    root: EntryId,
    config: &EditConfig,
) -> Result<()> {
    for id in subtree_combinations(store, root, config)? {
        let name = store.name(id).unwrap_or_default();
        let comb = store.read_comb(id).map_err(|e| read_error(name, e))?;
        if let Some(leaf) = comb
            .leaves
            .iter()
            .find(|l| !l.is_identity(&config.tolerance))
        {
            return Err(EditError::UnresolvedTransform {
                comb: name.to_string(),
                leaf: leaf.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use csgedit_db::{Combination, Database};
    use csgedit_math::{Point3, Transform};
    use csgedit_primitives::make_sphere;

    #[test]
    fn clears_every_matrix_once() {
        let mut db = Database::new();
        db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
        let shift = Transform::translation(1.0, 2.0, 3.0);
        db.put_comb(
            "a",
            Combination::new(vec![Leaf::new("s").with_matrix(shift)]),
        )
        .unwrap();
        db.put_comb(
            "top",
            Combination::new(vec![
                Leaf::new("a").with_matrix(shift),
                Leaf::new("a"),
                Leaf::new("missing").with_matrix(shift),
            ]),
        )
        .unwrap();
        let top = db.lookup("top").unwrap();
        let config = EditConfig::default();
        assert!(matches!(
            verify_identity(&db, top, &config),
            Err(EditError::UnresolvedTransform { comb, leaf }) if comb == "a" && leaf == "s"
        ));

        assert_eq!(identitize(&mut db, top, &config).unwrap(), 2);
        verify_identity(&db, top, &config).unwrap();
        assert_eq!(identitize(&mut db, top, &config).unwrap(), 0);
        // geometry is left alone
        let s = db.read_solid(db.lookup("s").unwrap(), None).unwrap();
        assert_eq!(s.vertex(), Point3::origin());
    }

    #[test]
    fn identity_matrices_pass_verification() {
        let mut db = Database::new();
        db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
        db.put_comb(
            "top",
            Combination::new(vec![Leaf::new("s").with_matrix(Transform::identity())]),
        )
        .unwrap();
        let top = db.lookup("top").unwrap();
        verify_identity(&db, top, &EditConfig::default()).unwrap();
    }
}
