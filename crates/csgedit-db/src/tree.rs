//! Leaf-level traversal of a combination.

use crate::{Combination, Leaf};

/// What a leaf visitor wants done with the leaf it was shown.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Keep the leaf and move on.
    Continue,
    /// Swap the leaf for a new one.
    Replace(Leaf),
    /// Keep the leaf and stop visiting.
    Stop,
}

/// Visit every leaf of `comb` in stored order.
///
/// The walk itself is read-only: replacements are collected as the visitor
/// returns them and applied in a single pass once the walk is over, so a
/// visitor never observes a half-rewritten combination. A visitor error
/// abandons the walk and leaves `comb` untouched. Returns the number of
/// leaves replaced.
pub fn walk_leaves<E, F>(comb: &mut Combination, mut visit: F) -> Result<usize, E>
where
    F: FnMut(usize, &Leaf) -> Result<Action, E>,
{
    let mut replacements = Vec::new();
    for (index, leaf) in comb.leaves.iter().enumerate() {
        match visit(index, leaf)? {
            Action::Continue => {}
            Action::Replace(new_leaf) => replacements.push((index, new_leaf)),
            Action::Stop => break,
        }
    }
    let count = replacements.len();
    for (index, new_leaf) in replacements {
        comb.leaves[index] = new_leaf;
    }
    Ok(count)
}
