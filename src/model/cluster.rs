//! Cluster: a [`Pattern`] plus how much of the corpus it captures.

use crate::error::Result;
use crate::kernel::nybble::{self, NYBBLE_COUNT};
use crate::kernel::{AddressIndex, Pattern};
use crate::model::sampler::jitter_hit;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::net::Ipv6Addr;

/// A pattern with its coverage statistics.
///
/// Statistics are fixed at construction; upgrading always produces a new
/// cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pattern: Pattern,
    captured: usize,
    density: f64,
    size: f64,
}

/// Best single-position upgrades of a cluster.
///
/// Every position in `positions` yields the same `density` and `captured`.
#[derive(Clone, Debug, PartialEq)]
pub struct UpgradeOptions {
    pub density: f64,
    pub captured: usize,
    pub positions: Vec<usize>,
}

impl Cluster {
    /// Singleton cluster for one observed address.
    pub fn seed(addr: &Ipv6Addr) -> Self {
        Self::new(Pattern::from_addr(addr), 1)
    }

    pub fn new(pattern: Pattern, captured: usize) -> Self {
        let size = pattern.size();
        Self {
            pattern,
            captured,
            density: captured as f64 / size,
            size,
        }
    }

    /// Cluster for `pattern` with its count taken from `index`.
    pub fn measure<I: AddressIndex + ?Sized>(pattern: Pattern, index: &I) -> Result<Self> {
        Ok(Self::new(pattern, index.count_in_range(&pattern)?))
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn captured(&self) -> usize {
        self.captured
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    /// Try every concrete position as a wildcard and keep the densest.
    ///
    /// Ties are all kept, in position order. A fully wildcarded pattern has
    /// no options and returns an empty position list.
    pub fn best_upgrades<I: AddressIndex + ?Sized>(&self, index: &I) -> Result<UpgradeOptions> {
        let mut best = UpgradeOptions {
            density: -1.0,
            captured: 0,
            positions: Vec::new(),
        };
        for position in self.pattern.concrete_positions() {
            let upgraded = self.pattern.upgrade(position);
            let captured = index.count_in_range(&upgraded)?;
            let density = captured as f64 / upgraded.size();
            if density > best.density {
                best.density = density;
                best.captured = captured;
                best.positions.clear();
                best.positions.push(position);
            } else if density == best.density {
                best.positions.push(position);
            }
        }
        Ok(best)
    }

    /// Draw an address from this cluster alone.
    ///
    /// Wildcards get a uniform symbol; each fixed position is replaced by a
    /// uniform symbol when the jitter draw hits.
    pub fn sample<R: Rng>(&self, rng: &mut R, jitter: f64) -> Ipv6Addr {
        let mut out = [0u8; NYBBLE_COUNT];
        for (i, n) in out.iter_mut().enumerate() {
            *n = match self.pattern.symbol(i) {
                Some(s) if !jitter_hit(rng, jitter) => s,
                _ => rng.gen_range(0..16),
            };
        }
        nybble::from_nybbles(&out)
    }
}

impl UpgradeOptions {
    /// Materialize one upgraded cluster per tied position.
    pub fn clusters<'a>(&'a self, parent: &'a Cluster) -> impl Iterator<Item = Cluster> + 'a {
        self.positions
            .iter()
            .map(move |&i| Cluster::new(parent.pattern.upgrade(i), self.captured))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::SortedCorpus;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn addrs(list: &[&str]) -> Vec<Ipv6Addr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_seed_stats() {
        for a in addrs(&["::", "2001:db8::1", "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff"]) {
            let c = Cluster::seed(&a);
            assert_eq!(c.captured(), 1);
            assert_eq!(c.density(), 1.0);
            assert_eq!(c.size(), 1.0);
            assert_eq!(c.pattern().wildcard_count(), 0);
        }
    }

    #[test]
    fn test_best_upgrade_single_winner() {
        let corpus = addrs(&["2001:db8::1", "2001:db8::2"]);
        let index = SortedCorpus::new(&corpus);
        let opts = Cluster::seed(&corpus[0]).best_upgrades(&index).unwrap();
        assert_eq!(opts.positions, vec![31]);
        assert_eq!(opts.captured, 2);
        assert_eq!(opts.density, 2.0 / 16.0);

        let parent = Cluster::seed(&corpus[0]);
        let up: Vec<Cluster> = opts.clusters(&parent).collect();
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].captured(), 2);
        assert!(up[0].pattern().is_wild(31));
    }

    #[test]
    fn test_best_upgrade_all_tied() {
        let corpus = addrs(&["::", "1111:1111:1111:1111:1111:1111:1111:1111"]);
        let index = SortedCorpus::new(&corpus);
        let opts = Cluster::seed(&corpus[0]).best_upgrades(&index).unwrap();
        assert_eq!(opts.len(), 32);
        assert_eq!(opts.density, 1.0 / 16.0);
    }

    #[test]
    fn test_fully_wild_has_no_upgrades() {
        let all: Vec<usize> = (0..32).collect();
        let p = Pattern::from_addr(&"::".parse().unwrap()).upgrade_all(&all);
        let index = SortedCorpus::new(&addrs(&["::1"]));
        let c = Cluster::measure(p, &index).unwrap();
        assert_eq!(c.captured(), 1);
        assert!(c.best_upgrades(&index).unwrap().is_empty());
    }

    #[test]
    fn test_sample_respects_fixed_positions() {
        let base: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let c = Cluster::new(Pattern::from_addr(&base).upgrade(31), 1);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(c.pattern().matches(&c.sample(&mut rng, 0.0)));
        }
    }
}
