//! World-space view of a hierarchy.

use csgedit_db::{EntryId, ObjectStore};
use csgedit_math::Transform;
use csgedit_primitives::Primitive;

use crate::config::EditConfig;
use crate::copy::read_error;
use crate::error::{EditError, Result};
use crate::walk::path_string;

/// Every solid below `root` in world coordinates, keyed by its path.
///
/// Solids reached along several paths appear once per path. Missing leaves
/// are skipped. Nothing is written.
pub fn world_solids<S: ObjectStore + ?Sized>(
    store: &S,
    root: EntryId,
    config: &EditConfig,
) -> Result<Vec<(String, Primitive)>> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    collect(store, root, Transform::identity(), config, &mut path, &mut out)?;
    Ok(out)
}

fn collect<S: ObjectStore + ?Sized>(
    store: &S,
    id: EntryId,
    acc: Transform,
    config: &EditConfig,
    path: &mut Vec<EntryId>,
    out: &mut Vec<(String, Primitive)>,
) -> Result<()> {
    let entry = store
        .entry(id)
        .ok_or_else(|| EditError::NotFound(format!("{id:?}")))?;
    if entry.kind.is_solid() {
        let solid = store
            .read_solid(id, Some(&acc))
            .map_err(|e| read_error(&entry.name, e))?;
        path.push(id);
        out.push((path_string(store, path), solid));
        path.pop();
        return Ok(());
    }

    if path.contains(&id) || path.len() >= config.max_depth {
        path.push(id);
        return Err(EditError::CyclicHierarchy(path_string(store, path)));
    }
    let comb = store
        .read_comb(id)
        .map_err(|e| read_error(&entry.name, e))?;
    path.push(id);
    for leaf in &comb.leaves {
        if let Some(child) = store.lookup(&leaf.name) {
            collect(store, child, acc.then(&leaf.effective_matrix()), config, path, out)?;
        }
    }
    path.pop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use csgedit_db::{Combination, Database, Leaf};
    use csgedit_math::Point3;
    use csgedit_primitives::make_sphere;

    #[test]
    fn paths_and_placements() {
        let mut db = Database::new();
        db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
        db.put_comb(
            "a",
            Combination::new(vec![
                Leaf::new("s").with_matrix(Transform::translation(1.0, 0.0, 0.0))
            ]),
        )
        .unwrap();
        db.put_comb(
            "top",
            Combination::new(vec![
                Leaf::new("a"),
                Leaf::new("a").with_matrix(Transform::translation(0.0, 1.0, 0.0)),
                Leaf::new("s"),
            ]),
        )
        .unwrap();
        let solids = world_solids(&db, db.lookup("top").unwrap(), &EditConfig::default()).unwrap();
        let summary: Vec<_> = solids
            .iter()
            .map(|(path, prim)| (path.as_str(), prim.vertex()))
            .collect();
        assert_eq!(
            summary,
            [
                ("top/a/s", Point3::new(1.0, 0.0, 0.0)),
                ("top/a/s", Point3::new(1.0, 1.0, 0.0)),
                ("top/s", Point3::origin()),
            ]
        );
    }

    #[test]
    fn a_solid_root_is_its_own_world() {
        let mut db = Database::new();
        let s = db.put_solid("s", make_sphere(Point3::origin(), 1.0)).unwrap();
        let solids = world_solids(&db, s, &EditConfig::default()).unwrap();
        assert_eq!(solids.len(), 1);
        assert_eq!(solids[0].0, "s");
    }
}
