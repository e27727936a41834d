//! Unique names for duplicated objects.
//!
//! Duplicates of `base` are named `base_NN`, where the suffix is a
//! zero-padded counter whose width is fixed per object from its use count
//! (`floor(log10(uses)) + 2` digits). On stores with a name length limit the
//! base is truncated so that the underscore and the whole suffix always fit.

use std::collections::HashSet;

use csgedit_db::ObjectStore;
use tracing::debug;

use crate::error::{EditError, Result};

/// Suffix width for an object with `uses` uses.
pub fn suffix_width(uses: u32) -> usize {
    let mut digits = 1;
    let mut n = uses.max(1) / 10;
    while n > 0 {
        digits += 1;
        n /= 10;
    }
    digits + 1
}

/// Hands out collision-free duplicate names for one run.
///
/// A name is free if the store does not hold it and this allocator has not
/// handed it out before. Nothing is written to the store; callers create the
/// entries later.
#[derive(Debug)]
pub struct NameAllocator {
    reserved: HashSet<String>,
    retry_budget: u32,
}

impl NameAllocator {
    /// Allocator that tries at most `retry_budget` candidates per name.
    pub fn new(retry_budget: u32) -> Self {
        Self {
            reserved: HashSet::new(),
            retry_budget,
        }
    }

    /// `true` if `name` was handed out by this allocator.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(name)
    }

    /// Number of names handed out so far.
    pub fn len(&self) -> usize {
        self.reserved.len()
    }

    /// `true` if nothing was handed out yet.
    pub fn is_empty(&self) -> bool {
        self.reserved.is_empty()
    }

    /// Produce `count` fresh names for duplicates of `base`, padding the
    /// suffix to `width` digits. Counting starts at 1 and skips candidates
    /// that are taken.
    pub fn allocate_many<S: ObjectStore + ?Sized>(
        &mut self,
        store: &S,
        base: &str,
        width: usize,
        count: usize,
    ) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(count);
        let mut j: u64 = 0;
        for _ in 0..count {
            let mut tries = 0;
            let name = loop {
                j += 1;
                tries += 1;
                if tries > self.retry_budget {
                    return Err(EditError::NameCollision(base.to_string()));
                }
                let candidate = candidate(base, j, width, store.name_limit())
                    .ok_or_else(|| EditError::NameCollision(base.to_string()))?;
                if store.lookup(&candidate).is_none() && !self.reserved.contains(&candidate) {
                    break candidate;
                }
            };
            self.reserved.insert(name.clone());
            names.push(name);
        }
        debug!(base, count, "allocated duplicate names");
        Ok(names)
    }
}

/// `base_j`, with the base shortened to respect `limit`. `None` when even an
/// empty base would not fit.
fn candidate(base: &str, j: u64, width: usize, limit: Option<usize>) -> Option<String> {
    let suffix = format!("_{j:0width$}");
    let suffix_len = suffix.chars().count();
    let base_len = match limit {
        Some(limit) if base.chars().count() + suffix_len > limit => {
            limit.checked_sub(suffix_len).filter(|n| *n > 0)?
        }
        _ => base.chars().count(),
    };
    let mut name: String = base.chars().take(base_len).collect();
    name.push_str(&suffix);
    Some(name)
}
