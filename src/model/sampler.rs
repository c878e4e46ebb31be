//! Address synthesis from a built [`ClusterModel`].
//!
//! Each draw picks a cluster uniformly, then fills the 32 positions:
//! wildcards get a uniform symbol, fixed positions keep their symbol unless
//! the jitter draw hits, in which case the position's empirical
//! distribution is sampled instead.
//!
//! A `Sampler` borrows the model immutably and owns its RNG, so parallel
//! generation is one sampler per thread. [`derive_worker_seed`] gives each
//! worker an independent reproducible stream.
//!
//! # Example
//!
//! ```rust
//! use addrgen::{Config, ModelBuilder, Sampler};
//! use std::net::Ipv6Addr;
//!
//! let corpus: Vec<Ipv6Addr> = (0..16u128)
//!     .map(|i| Ipv6Addr::from(0x2001_0db8_u128 << 96 | i))
//!     .collect();
//! let config = Config::default();
//! let model = ModelBuilder::new(config.clone()).unwrap().build(&corpus).unwrap();
//!
//! let mut sampler = Sampler::with_seed(&model, &config, 42);
//! let addrs = sampler.generate(10).unwrap();
//! assert_eq!(addrs.len(), 10);
//! ```

use crate::config::Config;
use crate::error::{GenError, Result};
use crate::kernel::nybble::{self, Ipv6Network, Nybbles, NYBBLE_COUNT, SYMBOL_COUNT};
use crate::kernel::{AddressSet, UniqueSet};
use crate::model::cluster::Cluster;
use crate::model::cluster_model::ClusterModel;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::net::Ipv6Addr;
use tracing::info;

/// Whether a fixed position is replaced by noise.
///
/// Draws 0..10000, scales to a 0-100 percentage and compares against
/// `jitter * 100`. Strictly less-than, so `jitter == 0.0` never hits and
/// `jitter == 1.0` always does.
#[inline]
pub(crate) fn jitter_hit<R: Rng>(rng: &mut R, jitter: f64) -> bool {
    f64::from(rng.gen_range(0..10_000u32)) / 100.0 < jitter * 100.0
}

/// Seed for worker `worker` derived from a shared `global_seed`.
///
/// SHA-256 of both values, first 8 bytes little-endian.
pub fn derive_worker_seed(global_seed: u64, worker: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(worker.to_le_bytes());
    let hash = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(seed)
}

/// Draws addresses from a [`ClusterModel`].
pub struct Sampler<'m, R = ChaCha8Rng> {
    model: &'m ClusterModel,
    rng: R,
    jitter: f64,
    log_every: usize,
    max_attempts_per_address: usize,
    max_filtered_attempts_per_address: usize,
}

impl<'m> Sampler<'m, ChaCha8Rng> {
    /// Sampler seeded from OS entropy.
    pub fn new(model: &'m ClusterModel, config: &Config) -> Self {
        Self::from_rng(model, config, ChaCha8Rng::from_entropy())
    }

    /// Reproducible sampler.
    pub fn with_seed(model: &'m ClusterModel, config: &Config, seed: u64) -> Self {
        Self::from_rng(model, config, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<'m, R: Rng> Sampler<'m, R> {
    pub fn from_rng(model: &'m ClusterModel, config: &Config, rng: R) -> Self {
        Self {
            model,
            rng,
            jitter: config.generation_jitter,
            log_every: config.log_loop_emit_freq.max(1),
            max_attempts_per_address: config.max_attempts_per_address.max(1),
            max_filtered_attempts_per_address: config.max_filtered_attempts_per_address.max(1),
        }
    }

    /// Override the jitter (0.0-1.0).
    pub fn with_jitter(mut self, jitter: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&jitter) {
            return Err(GenError::InvalidInput(format!(
                "jitter must be in [0, 1], got {jitter}"
            )));
        }
        self.jitter = jitter;
        Ok(self)
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    fn pick_cluster(&mut self) -> Result<&'m Cluster> {
        let clusters = self.model.cluster_set().clusters();
        if clusters.is_empty() {
            return Err(GenError::EmptyModel);
        }
        Ok(&clusters[self.rng.gen_range(0..clusters.len())])
    }

    fn draw_symbol(&mut self, cluster: &Cluster, position: usize) -> u8 {
        match cluster.pattern().symbol(position) {
            None => self.rng.gen_range(0..SYMBOL_COUNT as u8),
            Some(symbol) => {
                if jitter_hit(&mut self.rng, self.jitter) {
                    self.model.distribution(position).sample(&mut self.rng)
                } else {
                    symbol
                }
            }
        }
    }

    /// One address anywhere in the modeled space.
    pub fn sample(&mut self) -> Result<Ipv6Addr> {
        self.sample_with_prefix(&[])
    }

    /// One address whose leading nybbles are `prefix`.
    ///
    /// Only positions after the prefix are drawn from the chosen cluster.
    pub fn sample_with_prefix(&mut self, prefix: &[u8]) -> Result<Ipv6Addr> {
        if prefix.len() > NYBBLE_COUNT {
            return Err(GenError::InvalidInput(format!(
                "prefix of {} nybbles is longer than an address",
                prefix.len()
            )));
        }
        let cluster = self.pick_cluster()?;
        let mut out: Nybbles = [0; NYBBLE_COUNT];
        out[..prefix.len()].copy_from_slice(prefix);
        for position in prefix.len()..NYBBLE_COUNT {
            out[position] = self.draw_symbol(cluster, position);
        }
        Ok(nybble::from_nybbles(&out))
    }

    /// `count` unique addresses, unconstrained.
    pub fn generate(&mut self, count: usize) -> Result<Vec<Ipv6Addr>> {
        let mut seen = AddressSet::with_capacity(count);
        self.generate_into(count, &[], &mut seen)
    }

    /// `count` unique addresses inside `network`.
    ///
    /// Fails with [`GenError::InvalidPrefixLength`] before drawing anything
    /// if the prefix length is not a multiple of 4.
    pub fn generate_in_network(
        &mut self,
        count: usize,
        network: &Ipv6Network,
    ) -> Result<Vec<Ipv6Addr>> {
        let prefix = network.nybbles()?;
        let mut seen = AddressSet::with_capacity(count);
        self.generate_into(count, &prefix, &mut seen)
    }

    /// Draw until `count` addresses were newly added to `seen`.
    ///
    /// Returns just the new addresses, in draw order. Addresses already in
    /// `seen` before the call are never returned.
    pub fn generate_into<U: UniqueSet>(
        &mut self,
        count: usize,
        prefix: &[u8],
        seen: &mut U,
    ) -> Result<Vec<Ipv6Addr>> {
        let budget = count.saturating_mul(self.max_attempts_per_address);
        let mut out = Vec::with_capacity(count);
        let mut iteration = 0usize;
        while out.len() < count {
            if iteration >= budget {
                return Err(GenError::GenerationExhausted {
                    requested: count,
                    produced: out.len(),
                });
            }
            if iteration % self.log_every == 0 {
                info!(
                    iteration,
                    unique = seen.size(),
                    "generating candidate addresses from cluster model"
                );
            }
            let addr = self.sample_with_prefix(prefix)?;
            if seen.add(addr) {
                out.push(addr);
            }
            iteration += 1;
        }
        info!(count = out.len(), iteration, "generated addresses");
        Ok(out)
    }

    /// `count` addresses inside `network` that pass `is_filtered`.
    ///
    /// The callback returns `Ok(true)` to drop an address. Its first error
    /// aborts generation and is returned as [`GenError::Collaborator`].
    /// Results are not deduplicated. The draw budget is
    /// `count * max_filtered_attempts_per_address`, independent of the
    /// unique-generation budget.
    pub fn generate_in_network_filtered<F, E>(
        &mut self,
        count: usize,
        network: &Ipv6Network,
        mut is_filtered: F,
    ) -> Result<Vec<Ipv6Addr>>
    where
        F: FnMut(&Ipv6Addr) -> std::result::Result<bool, E>,
        E: Into<crate::error::BoxError>,
    {
        let prefix = network.nybbles()?;
        let budget = count.saturating_mul(self.max_filtered_attempts_per_address);
        let mut out = Vec::with_capacity(count);
        let mut iteration = 0usize;
        while out.len() < count {
            if iteration >= budget {
                return Err(GenError::GenerationExhausted {
                    requested: count,
                    produced: out.len(),
                });
            }
            let addr = self.sample_with_prefix(&prefix)?;
            if !is_filtered(&addr).map_err(GenError::collaborator)? {
                out.push(addr);
            }
            iteration += 1;
        }
        Ok(out)
    }
}
