//! Empirical symbol distributions built from dust addresses.
//!
//! Each position's raw counts are normalized into probabilities by one of
//! three policies, then materialized as a weighted pool so a draw is a
//! single uniform index.
//!
//! | observed symbols | policy |
//! |---|---|
//! | none | uniform over all 16 |
//! | 1-15 | missing or rare symbols get the floor, the rest share what is left |
//! | all 16 | shrink toward the mean just enough to lift the rarest to the floor |

use crate::error::{GenError, Result};
use crate::kernel::nybble::{self, NYBBLE_COUNT, SYMBOL_COUNT};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;
use std::sync::OnceLock;

/// Observed symbol counts for each of the 32 positions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<[u64; SYMBOL_COUNT]>", into = "Vec<[u64; SYMBOL_COUNT]>")]
pub struct NybbleCounts {
    counts: [[u64; SYMBOL_COUNT]; NYBBLE_COUNT],
}

impl Default for NybbleCounts {
    fn default() -> Self {
        Self {
            counts: [[0; SYMBOL_COUNT]; NYBBLE_COUNT],
        }
    }
}

impl NybbleCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_addresses(addrs: &[Ipv6Addr]) -> Self {
        let mut counts = Self::new();
        for addr in addrs {
            counts.add(addr);
        }
        counts
    }

    pub fn add(&mut self, addr: &Ipv6Addr) {
        for (position, symbol) in nybble::to_nybbles(addr).iter().enumerate() {
            self.counts[position][usize::from(*symbol)] += 1;
        }
    }

    /// Counts for one position, indexed by symbol.
    pub fn position(&self, position: usize) -> &[u64; SYMBOL_COUNT] {
        &self.counts[position]
    }

    /// Number of addresses recorded (the same at every position).
    pub fn total(&self) -> u64 {
        self.counts[0].iter().sum()
    }
}

impl TryFrom<Vec<[u64; SYMBOL_COUNT]>> for NybbleCounts {
    type Error = GenError;

    fn try_from(rows: Vec<[u64; SYMBOL_COUNT]>) -> Result<Self> {
        let counts: [[u64; SYMBOL_COUNT]; NYBBLE_COUNT] = rows.try_into().map_err(|rows: Vec<_>| {
            GenError::InvalidInput(format!(
                "expected {NYBBLE_COUNT} count rows, got {}",
                rows.len()
            ))
        })?;
        Ok(Self { counts })
    }
}

impl From<NybbleCounts> for Vec<[u64; SYMBOL_COUNT]> {
    fn from(c: NybbleCounts) -> Self {
        c.counts.to_vec()
    }
}

/// Normalize one position's counts into per-symbol probabilities.
pub fn probabilities(counts: &[u64; SYMBOL_COUNT], min_percent: f64) -> [f64; SYMBOL_COUNT] {
    let observed = counts.iter().filter(|&&c| c > 0).count();
    match observed {
        0 => even_percents(),
        SYMBOL_COUNT => shrink_to_min(counts, min_percent),
        _ => fill_to_min(counts, min_percent),
    }
}

fn even_percents() -> [f64; SYMBOL_COUNT] {
    [1.0 / SYMBOL_COUNT as f64; SYMBOL_COUNT]
}

/// Unobserved or below-floor symbols get exactly `min_percent`; the
/// remaining mass is split among the others by observed count.
fn fill_to_min(counts: &[u64; SYMBOL_COUNT], min_percent: f64) -> [f64; SYMBOL_COUNT] {
    let total: u64 = counts.iter().sum();
    let floored: Vec<bool> = counts
        .iter()
        .map(|&c| c == 0 || (c as f64 / total as f64) < min_percent)
        .collect();
    let kept: u64 = counts
        .iter()
        .zip(&floored)
        .filter(|(_, &f)| !f)
        .map(|(&c, _)| c)
        .sum();
    if kept == 0 {
        return even_percents();
    }
    let remaining = 1.0 - min_percent * floored.iter().filter(|&&f| f).count() as f64;
    let mut out = [0.0; SYMBOL_COUNT];
    for (symbol, p) in out.iter_mut().enumerate() {
        *p = if floored[symbol] {
            min_percent
        } else {
            counts[symbol] as f64 / kept as f64 * remaining
        };
    }
    out
}

/// All symbols observed. If the rarest is below the floor, pull every
/// count toward the mean by the same factor so the rarest lands on it.
fn shrink_to_min(counts: &[u64; SYMBOL_COUNT], min_percent: f64) -> [f64; SYMBOL_COUNT] {
    let total = counts.iter().sum::<u64>() as f64;
    let min_found = counts.iter().copied().min().unwrap_or(0) as f64;
    let mut out = [0.0; SYMBOL_COUNT];
    if min_found / total < min_percent {
        let middle = total / SYMBOL_COUNT as f64;
        let to_grow = min_percent * total - min_found;
        let middle_distance = middle - min_found;
        let shrink = (middle_distance - to_grow) / middle_distance;
        for (p, &c) in out.iter_mut().zip(counts) {
            *p = (middle - (middle - c as f64) * shrink) / total;
        }
    } else {
        for (p, &c) in out.iter_mut().zip(counts) {
            *p = c as f64 / total;
        }
    }
    out
}

/// Weighted pool of symbols for constant-time sampling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NybbleDistribution {
    pool: Vec<u8>,
}

impl NybbleDistribution {
    /// Each symbol appears `ceil(p * pool_size)` times.
    pub fn from_probabilities(probs: &[f64; SYMBOL_COUNT], pool_size: usize) -> Self {
        let mut pool = Vec::with_capacity(pool_size + SYMBOL_COUNT);
        for (symbol, &p) in probs.iter().enumerate() {
            let copies = (p * pool_size as f64).ceil() as usize;
            pool.extend(std::iter::repeat(symbol as u8).take(copies));
        }
        Self { pool }
    }

    pub fn from_counts(counts: &[u64; SYMBOL_COUNT], min_percent: f64, pool_size: usize) -> Self {
        Self::from_probabilities(&probabilities(counts, min_percent), pool_size)
    }

    pub fn pool(&self) -> &[u8] {
        &self.pool
    }

    /// Share of the pool held by `symbol`.
    pub fn weight(&self, symbol: u8) -> f64 {
        if self.pool.is_empty() {
            return 0.0;
        }
        self.pool.iter().filter(|&&s| s == symbol).count() as f64 / self.pool.len() as f64
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> u8 {
        if self.pool.is_empty() {
            return rng.gen_range(0..SYMBOL_COUNT as u8);
        }
        self.pool[rng.gen_range(0..self.pool.len())]
    }
}

/// Per-position distributions, each built once on first use.
#[derive(Clone, Debug, Default)]
pub struct DistributionCache {
    slots: [OnceLock<NybbleDistribution>; NYBBLE_COUNT],
}

impl DistributionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(
        &self,
        position: usize,
        counts: &NybbleCounts,
        min_percent: f64,
        pool_size: usize,
    ) -> &NybbleDistribution {
        self.slots[position].get_or_init(|| {
            NybbleDistribution::from_counts(counts.position(position), min_percent, pool_size)
        })
    }

    /// Positions built so far.
    pub fn built(&self) -> usize {
        self.slots.iter().filter(|s| s.get().is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn assert_sums_to_one(p: &[f64; SYMBOL_COUNT]) {
        let sum: f64 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum was {sum}");
    }

    #[test]
    fn test_no_data_is_uniform() {
        let p = probabilities(&[0; 16], 0.01);
        assert!(p.iter().all(|&x| x == 1.0 / 16.0));
        let d = NybbleDistribution::from_probabilities(&p, 200);
        assert_eq!(d.pool().len(), 16 * 13);
        assert_eq!(d.weight(0), d.weight(15));
    }

    #[test]
    fn test_partial_observations_get_floor() {
        let mut counts = [0u64; 16];
        counts[0] = 90;
        counts[1] = 10;
        let p = probabilities(&counts, 0.01);
        assert_sums_to_one(&p);
        for &x in &p[2..] {
            assert_eq!(x, 0.01);
        }
        assert!((p[0] - 0.9 * 0.86).abs() < 1e-12);
        assert!((p[1] - 0.1 * 0.86).abs() < 1e-12);
    }

    #[test]
    fn test_rare_observed_symbol_is_floored() {
        let mut counts = [0u64; 16];
        counts[3] = 999;
        counts[4] = 1;
        let p = probabilities(&counts, 0.01);
        assert_sums_to_one(&p);
        assert_eq!(p[4], 0.01);
        assert!((p[3] - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_full_observations_shrink_to_floor() {
        let mut counts = [99u64; 16];
        counts[0] = 1;
        let p = probabilities(&counts, 0.01);
        assert_sums_to_one(&p);
        assert!((p[0] - 0.01).abs() < 1e-12);
        // Order is preserved and everything else stays equal
        assert!(p[1] > p[0]);
        assert!(p[1..].iter().all(|&x| (x - p[1]).abs() < 1e-12));
    }

    #[test]
    fn test_full_observations_above_floor_are_raw() {
        let mut counts = [10u64; 16];
        counts[7] = 40;
        let p = probabilities(&counts, 0.01);
        assert_eq!(p[7], 40.0 / 190.0);
        assert_eq!(p[0], 10.0 / 190.0);
    }

    #[test]
    fn test_pool_sampling_follows_weights() {
        let mut counts = [0u64; 16];
        counts[0xa] = 1;
        let d = NybbleDistribution::from_counts(&counts, 0.0, 100);
        assert_eq!(d.pool(), &[0xa; 100][..]);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!((0..50).all(|_| d.sample(&mut rng) == 0xa));
    }

    #[test]
    fn test_counts_serde_rejects_wrong_length() {
        let counts = NybbleCounts::from_addresses(&["::1".parse().unwrap()]);
        let json = serde_json::to_string(&counts).unwrap();
        assert_eq!(serde_json::from_str::<NybbleCounts>(&json).unwrap(), counts);
        assert!(serde_json::from_str::<NybbleCounts>("[[0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0]]").is_err());
    }

    #[test]
    fn test_cache_builds_once_per_position() {
        let counts = NybbleCounts::from_addresses(&["2001:db8::1".parse().unwrap()]);
        let cache = DistributionCache::new();
        assert_eq!(cache.built(), 0);
        let first = cache.get_or_build(0, &counts, 0.01, 100) as *const _;
        let again = cache.get_or_build(0, &counts, 0.5, 7) as *const _;
        assert_eq!(first, again);
        assert_eq!(cache.built(), 1);
    }
}
