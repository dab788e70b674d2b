//! Diff computation for declared block collections

use crate::resource::Keyed;
use std::collections::HashSet;

/// Blocks to remove and blocks to add between two declarations
///
/// Membership is decided by full structural equality. An unchanged block
/// appears in neither list; a block whose key stayed but whose fields
/// changed appears in both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<B> {
    /// Blocks present in the old declaration only
    pub to_remove: Vec<B>,
    /// Blocks present in the new declaration only
    pub to_add: Vec<B>,
}

impl<B> SetDiff<B> {
    /// Check if there are any changes
    pub fn is_empty(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }
}

impl<B> Default for SetDiff<B> {
    fn default() -> Self {
        Self {
            to_remove: Vec::new(),
            to_add: Vec::new(),
        }
    }
}

/// Compute the set difference between an old and a new declaration
///
/// `None` on either side is an empty collection. Both inputs are treated as
/// sets: repeated identical blocks are reported once. Output follows input
/// order, but the collections are unordered and callers must not depend on
/// it.
pub fn diff<B: Keyed>(old: Option<&[B]>, new: Option<&[B]>) -> SetDiff<B> {
    let old = old.unwrap_or_default();
    let new = new.unwrap_or_default();

    SetDiff {
        to_remove: difference(old, new),
        to_add: difference(new, old),
    }
}

/// Blocks in `left` that are not in `right`, deduplicated
fn difference<B: Keyed>(left: &[B], right: &[B]) -> Vec<B> {
    let right: HashSet<&B> = right.iter().collect();
    let mut seen: HashSet<&B> = HashSet::new();

    left.iter()
        .filter(|b| !right.contains(b) && seen.insert(*b))
        .cloned()
        .collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Keys only being created
    pub additions: usize,
    /// Keys only being removed
    pub removals: usize,
    /// Keys being removed and recreated with different fields
    pub replacements: usize,
}

impl DiffSummary {
    /// Create a summary from a diff
    pub fn from_diff<B: Keyed>(diff: &SetDiff<B>) -> Self {
        let removed: HashSet<B::Key> = diff.to_remove.iter().map(Keyed::key).collect();
        let added: HashSet<B::Key> = diff.to_add.iter().map(Keyed::key).collect();
        let replacements = removed.intersection(&added).count();

        Self {
            additions: added.len() - replacements,
            removals: removed.len() - replacements,
            replacements,
        }
    }

    /// Total number of changed keys
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.replacements
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}
