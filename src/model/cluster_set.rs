//! Cluster set: accepted clusters plus aggregate coverage.

use crate::error::{GenError, Result};
use crate::kernel::{AddressIndex, AddressSet, UniqueSet};
use crate::model::cluster::Cluster;
use crate::model::persist;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;
use std::path::Path;
use tracing::info;

/// An unordered collection of clusters and their combined statistics.
///
/// - `captured`: distinct corpus addresses inside any member pattern.
/// - `range_size`: sum of member pattern sizes, overlaps counted once per
///   member. This is the synthesis search space, not the union size.
/// - `density`: `captured / range_size`, 0 for an empty set.
///
/// The aggregates are only ever recomputed wholesale by
/// [`ClusterSet::reset_counts`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSet {
    clusters: Vec<Cluster>,
    captured: usize,
    range_size: f64,
    density: f64,
}

impl ClusterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set and compute its aggregates against `index`.
    pub fn from_clusters<I: AddressIndex + ?Sized>(clusters: Vec<Cluster>, index: &I) -> Result<Self> {
        let mut set = Self {
            clusters,
            ..Self::default()
        };
        set.reset_counts(index)?;
        Ok(set)
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn captured(&self) -> usize {
        self.captured
    }

    pub fn range_size(&self) -> f64 {
        self.range_size
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    /// Recompute `captured`, `range_size` and `density` from scratch.
    pub fn reset_counts<I: AddressIndex + ?Sized>(&mut self, index: &I) -> Result<()> {
        let mut covered = AddressSet::new();
        let mut range_size = 0.0;
        for cluster in &self.clusters {
            covered.add_all(index.addresses_in_range(cluster.pattern())?);
            range_size += cluster.size();
        }
        self.captured = covered.size();
        self.range_size = range_size;
        self.density = if range_size > 0.0 {
            self.captured as f64 / range_size
        } else {
            0.0
        };
        Ok(())
    }

    /// Draw `count` unique addresses from the clusters alone.
    ///
    /// Jitter replaces fixed symbols with uniform ones; there are no
    /// empirical tables at this level. Stops after
    /// `count * max_attempts_per_address` draws, the same budget
    /// [`Sampler`](crate::model::Sampler) uses.
    pub fn generate<R: Rng>(
        &self,
        count: usize,
        jitter: f64,
        max_attempts_per_address: usize,
        rng: &mut R,
    ) -> Result<Vec<Ipv6Addr>> {
        if self.clusters.is_empty() {
            return Err(GenError::EmptyModel);
        }
        let max_attempts = count.saturating_mul(max_attempts_per_address.max(1));
        let mut out = AddressSet::with_capacity(count);
        let mut attempts = 0;
        while out.size() < count {
            if attempts >= max_attempts {
                return Err(GenError::GenerationExhausted {
                    requested: count,
                    produced: out.size(),
                });
            }
            let cluster = &self.clusters[rng.gen_range(0..self.clusters.len())];
            out.add(cluster.sample(rng, jitter));
            attempts += 1;
        }
        info!(count, attempts, "generated addresses from cluster set");
        Ok(out.into_vec())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        persist::to_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        persist::from_bytes(bytes)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persist::save(path, self)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        persist::load(path)
    }
}
