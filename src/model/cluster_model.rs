//! The built model: a cluster set plus dust frequency tables.

use crate::config::Config;
use crate::error::Result;
use crate::kernel::nybble::NYBBLE_COUNT;
use crate::model::cluster_set::ClusterSet;
use crate::model::distribution::{DistributionCache, NybbleCounts, NybbleDistribution};
use crate::model::persist;
use crate::model::sampler::Sampler;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parameters for turning dust counts into sampling pools.
#[derive(Clone, Copy, Debug, PartialEq)]
struct PoolParams {
    min_nybble_percent: f64,
    distribution_size: usize,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PoolParams {
    fn from(config: &Config) -> Self {
        Self {
            min_nybble_percent: config.min_nybble_percent,
            distribution_size: config.distribution_size,
        }
    }
}

/// Generative model of an address space.
///
/// Immutable after construction apart from the per-position distribution
/// cache, which is filled at most once per position and is safe to share
/// between threads. Only the cluster set and the counts are persisted;
/// a loaded model uses default pool parameters until
/// [`ClusterModel::with_config`] is applied.
///
/// # Example
///
/// ```rust
/// use addrgen::{ClusterModel, Config, ModelBuilder};
/// use std::net::Ipv6Addr;
///
/// let corpus: Vec<Ipv6Addr> = (0..16u128)
///     .map(|i| Ipv6Addr::from(0x2001_0db8_u128 << 96 | i))
///     .collect();
/// let model = ModelBuilder::new(Config::default()).unwrap().build(&corpus).unwrap();
/// assert_eq!(model.cluster_set().len(), 1);
///
/// let bytes = model.to_bytes().unwrap();
/// assert_eq!(ClusterModel::from_bytes(&bytes).unwrap(), model);
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClusterModel {
    cluster_set: ClusterSet,
    nybble_counts: NybbleCounts,
    #[serde(skip)]
    params: PoolParams,
    #[serde(skip)]
    distributions: DistributionCache,
}

impl ClusterModel {
    pub fn new(cluster_set: ClusterSet, nybble_counts: NybbleCounts, config: &Config) -> Self {
        Self {
            cluster_set,
            nybble_counts,
            params: PoolParams::from(config),
            distributions: DistributionCache::new(),
        }
    }

    /// Use `config`'s pool parameters. Drops any distributions built so far.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.params = PoolParams::from(config);
        self.distributions = DistributionCache::new();
        self
    }

    pub fn cluster_set(&self) -> &ClusterSet {
        &self.cluster_set
    }

    pub fn nybble_counts(&self) -> &NybbleCounts {
        &self.nybble_counts
    }

    pub fn is_empty(&self) -> bool {
        self.cluster_set.is_empty()
    }

    /// Sampling pool for `position`, built on first use.
    pub fn distribution(&self, position: usize) -> &NybbleDistribution {
        self.distributions.get_or_build(
            position,
            &self.nybble_counts,
            self.params.min_nybble_percent,
            self.params.distribution_size,
        )
    }

    /// Build every position's pool now instead of on first draw.
    pub fn precompute_distributions(&self) {
        for position in 0..NYBBLE_COUNT {
            self.distribution(position);
        }
    }

    /// Sampler seeded from OS entropy, using `config`'s jitter and limits.
    pub fn sampler(&self, config: &Config) -> Sampler<'_, ChaCha8Rng> {
        Sampler::new(self, config)
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

impl PartialEq for ClusterModel {
    fn eq(&self, other: &Self) -> bool {
        self.cluster_set == other.cluster_set && self.nybble_counts == other.nybble_counts
    }
}

impl Clone for ClusterModel {
    /// Clones start with an empty distribution cache.
    fn clone(&self) -> Self {
        Self {
            cluster_set: self.cluster_set.clone(),
            nybble_counts: self.nybble_counts.clone(),
            params: self.params,
            distributions: DistributionCache::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Pattern, SortedCorpus};
    use crate::model::cluster::Cluster;
    use std::net::Ipv6Addr;

    fn sample_model() -> ClusterModel {
        let addrs: Vec<Ipv6Addr> = ["2001:db8::1", "2001:db8::2", "2001:db8::1:5"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        let index = SortedCorpus::new(&addrs);
        let p = Pattern::from_addr(&addrs[0]).upgrade_all(&[27, 31]);
        let set = ClusterSet::from_clusters(vec![Cluster::measure(p, &index).unwrap()], &index).unwrap();
        let dust = NybbleCounts::from_addresses(&["fe80::1".parse().unwrap(), "3fff::abcd".parse().unwrap()]);
        ClusterModel::new(set, dust, &Config::default())
    }

    #[test]
    fn test_file_round_trip() {
        let model = sample_model();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        model.save(&path).unwrap();
        let loaded = ClusterModel::load(&path).unwrap();
        assert_eq!(loaded, model);
        assert_eq!(loaded.cluster_set().clusters()[0].pattern(), model.cluster_set().clusters()[0].pattern());
        assert_eq!(loaded.nybble_counts().position(0), model.nybble_counts().position(0));
        assert_eq!(loaded.cluster_set().captured(), 3);
    }

    #[test]
    fn test_bytes_round_trip() {
        let model = sample_model();
        let back = ClusterModel::from_bytes(&model.to_bytes().unwrap()).unwrap();
        assert_eq!(back, model);
        assert_eq!(back.cluster_set().density(), model.cluster_set().density());
    }

    #[test]
    fn test_distribution_uses_config() {
        let config = Config {
            distribution_size: 50,
            ..Config::default()
        };
        let model = sample_model().with_config(&config);
        // Position 31 saw symbols 1 and d; 14 floored symbols at 1% of 50 -> 1 each
        let d = model.distribution(31);
        assert!(d.pool().len() >= 50);
        assert!(d.weight(1) > d.weight(0));
        model.precompute_distributions();
        assert_eq!(model.distributions.built(), NYBBLE_COUNT);
    }
}
