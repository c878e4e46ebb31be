//! Candidate queue: clusters ordered by non-increasing density.
//!
//! A sorted `VecDeque` rather than a binary heap. Insertion is a binary
//! search plus a shift, and entries of equal density stay in arrival order,
//! which a heap would not guarantee.

use crate::model::cluster::Cluster;
use std::collections::VecDeque;
use std::ops::Range;

#[derive(Clone, Debug, Default)]
pub struct CandidateQueue {
    entries: VecDeque<Cluster>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load and sort once, densest first.
    ///
    /// The sort is stable, but callers should not rely on tie order here.
    pub fn from_unsorted(mut clusters: Vec<Cluster>) -> Self {
        clusters.sort_by(|a, b| b.density().total_cmp(&a.density()));
        Self {
            entries: clusters.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Densest entry without removing it.
    pub fn peek_max(&self) -> Option<&Cluster> {
        self.entries.front()
    }

    /// Remove and return the densest entry (oldest first among ties).
    pub fn pop_max(&mut self) -> Option<Cluster> {
        self.entries.pop_front()
    }

    /// Index range of the run of entries with exactly `density`.
    ///
    /// Empty when no entry matches; its start is then where such an entry
    /// would go.
    pub fn tie_run(&self, density: f64) -> Range<usize> {
        let start = self.entries.partition_point(|c| c.density() > density);
        let len = self
            .entries
            .range(start..)
            .take_while(|c| c.density() == density)
            .count();
        start..start + len
    }

    /// Insert keeping the order; a new entry goes after its equal-density run.
    pub fn insert_sorted(&mut self, cluster: Cluster) {
        let at = self.tie_run(cluster.density()).end;
        self.entries.insert(at, cluster);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.entries.iter()
    }
}
