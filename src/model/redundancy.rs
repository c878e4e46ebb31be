//! Redundancy filter: drop clusters already covered by a wider one.
//!
//! Clusters are walked widest first. Each accepted pattern goes into a
//! [`ContainmentIndex`]; a later cluster is dropped when some accepted
//! pattern contains it.

use crate::kernel::pattern::{concrete_mask, Pattern};
use crate::model::cluster::Cluster;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Accepted patterns grouped by wildcard set.
///
/// A pattern is contained by an accepted one iff that pattern's wildcard
/// set is a superset of its own and the two agree on the accepted
/// pattern's concrete positions. Grouping by wildcard set turns the second
/// check into one hash lookup per group.
#[derive(Clone, Debug, Default)]
pub struct ContainmentIndex {
    groups: HashMap<u32, HashSet<u128>>,
    len: usize,
}

impl ContainmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `true` if an accepted pattern contains `pattern`.
    pub fn covers(&self, pattern: &Pattern) -> bool {
        let wild = pattern.wild_bits();
        self.groups.iter().any(|(&group_wild, values)| {
            wild & !group_wild == 0 && values.contains(&(pattern.value() & concrete_mask(group_wild)))
        })
    }

    /// Accept `pattern` unless it is already covered. Returns whether it was
    /// accepted.
    pub fn insert(&mut self, pattern: &Pattern) -> bool {
        if self.covers(pattern) {
            return false;
        }
        self.groups
            .entry(pattern.wild_bits())
            .or_default()
            .insert(pattern.value());
        self.len += 1;
        true
    }
}

/// Keep only clusters not contained in a wider, already-kept cluster.
///
/// Output is ordered by descending pattern size (stable for equal sizes).
/// Exact duplicates collapse to their first occurrence.
pub fn remove_redundant(mut clusters: Vec<Cluster>) -> Vec<Cluster> {
    let before = clusters.len();
    clusters.sort_by(|a, b| b.size().total_cmp(&a.size()));
    let mut index = ContainmentIndex::new();
    clusters.retain(|c| index.insert(c.pattern()));
    debug!(before, after = clusters.len(), "removed redundant clusters");
    clusters
}
