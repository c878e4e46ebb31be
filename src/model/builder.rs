//! Greedy density-driven model construction.
//!
//! Every corpus address starts as a singleton cluster. Seeds whose
//! single-position upgrades all score the same carry no structure and are
//! set aside as dust; the rest are widened one position at a time, always
//! expanding the densest candidate next. Every `check_count` iterations the
//! accumulated candidates are filtered for redundancy and scored against
//! the last accepted cluster set, and construction stops as soon as the
//! score turns negative.

use crate::config::Config;
use crate::error::Result;
use crate::kernel::nybble::NYBBLE_COUNT;
use crate::kernel::{AddressIndex, AddressSet, Pattern, SortedCorpus, UniqueSet};
use crate::model::cluster::Cluster;
use crate::model::cluster_model::ClusterModel;
use crate::model::cluster_set::ClusterSet;
use crate::model::distribution::NybbleCounts;
use crate::model::queue::CandidateQueue;
use crate::model::redundancy::remove_redundant;
use std::collections::HashSet;
use std::net::Ipv6Addr;
use tracing::{debug, info};

/// Convergence score between two consecutive cluster sets.
///
/// `score = 3 * density_delta + 2 * size_delta - cluster_count_delta`,
/// each delta relative to the previous set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CheckpointScore {
    pub density_delta: f64,
    pub size_delta: f64,
    pub cluster_count_delta: f64,
    pub score: f64,
}

impl CheckpointScore {
    pub fn between(prev: &ClusterSet, next: &ClusterSet) -> Self {
        if prev.is_empty() {
            return Self {
                density_delta: 0.0,
                size_delta: 0.0,
                cluster_count_delta: 0.0,
                score: f64::INFINITY,
            };
        }
        let density_delta = relative(prev.density(), next.density());
        let size_delta = relative(prev.range_size(), next.range_size());
        let cluster_count_delta = relative(prev.len() as f64, next.len() as f64);
        Self {
            density_delta,
            size_delta,
            cluster_count_delta,
            score: 3.0 * density_delta + 2.0 * size_delta - cluster_count_delta,
        }
    }

    pub fn accepts(&self) -> bool {
        self.score >= 0.0
    }
}

/// `(next - prev) / prev`, 0 when `prev` is 0.
fn relative(prev: f64, next: f64) -> f64 {
    if prev == 0.0 {
        0.0
    } else {
        (next - prev) / prev
    }
}

/// Builds a [`ClusterModel`] from an address corpus.
///
/// # Example
///
/// ```rust
/// use addrgen::{Config, ModelBuilder};
/// use std::net::Ipv6Addr;
///
/// let corpus: Vec<Ipv6Addr> = vec!["2001:db8::1".parse().unwrap(), "2001:db8::2".parse().unwrap()];
/// let model = ModelBuilder::new(Config::default()).unwrap().build(&corpus).unwrap();
///
/// let cluster = &model.cluster_set().clusters()[0];
/// assert_eq!(cluster.pattern().signature(), "20010db800000000000000000000000?");
/// assert_eq!(cluster.captured(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct ModelBuilder {
    config: Config,
}

impl ModelBuilder {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build against an in-memory [`SortedCorpus`] of `addrs`.
    pub fn build(&self, addrs: &[Ipv6Addr]) -> Result<ClusterModel> {
        let index = SortedCorpus::new(addrs);
        self.build_with_index(addrs, &index)
    }

    /// Build with seeds from `addrs` and coverage queries against `index`.
    ///
    /// `index` should hold exactly the addresses in `addrs`. Its errors abort
    /// construction unchanged.
    pub fn build_with_index<I: AddressIndex + ?Sized>(
        &self,
        addrs: &[Ipv6Addr],
        index: &I,
    ) -> Result<ClusterModel> {
        let log_every = self.config.log_loop_emit_freq;

        let mut seeds = AddressSet::with_capacity(addrs.len());
        seeds.add_all(addrs.iter().copied());
        let seeds = seeds.into_vec();
        info!(input = addrs.len(), unique = seeds.len(), "building cluster model");

        let mut dust = NybbleCounts::new();
        let mut dust_count = 0usize;
        let mut accepted: HashSet<Pattern> = HashSet::new();
        let mut model_candidates: Vec<Cluster> = Vec::new();

        for (i, addr) in seeds.iter().enumerate() {
            if i % log_every == 0 {
                info!(seed = i, total = seeds.len(), "scanning seed upgrades");
            }
            let seed = Cluster::seed(addr);
            let options = seed.best_upgrades(index)?;
            if options.len() == NYBBLE_COUNT {
                dust.add(addr);
                dust_count += 1;
                continue;
            }
            for upgraded in options.clusters(&seed) {
                if accepted.insert(*upgraded.pattern()) {
                    model_candidates.push(upgraded);
                }
            }
        }
        info!(
            dust = dust_count,
            candidates = model_candidates.len(),
            "seed scan complete"
        );

        let mut queued: HashSet<Pattern> = HashSet::new();
        let mut pool: Vec<Cluster> = Vec::new();
        for (i, candidate) in model_candidates.iter().enumerate() {
            if i % log_every == 0 {
                info!(candidate = i, total = model_candidates.len(), "scanning candidate upgrades");
            }
            let options = candidate.best_upgrades(index)?;
            if options.len() == NYBBLE_COUNT - 1 {
                continue;
            }
            for upgraded in options.clusters(candidate) {
                if queued.insert(*upgraded.pattern()) {
                    pool.push(upgraded);
                }
            }
        }
        let mut queue = CandidateQueue::from_unsorted(pool);
        info!(queued = queue.len(), "candidate queue seeded");

        let mut current = ClusterSet::from_clusters(model_candidates.clone(), index)?;
        let mut iteration = 0usize;
        let mut pending = 0usize;

        loop {
            let Some(candidate) = queue.pop_max() else {
                if pending > 0 {
                    if let Some(next) = self.checkpoint(&mut model_candidates, &current, iteration, index)? {
                        current = next;
                    }
                }
                debug!(iteration, "candidate queue exhausted");
                break;
            };
            if !accepted.insert(*candidate.pattern()) {
                continue;
            }

            let options = candidate.best_upgrades(index)?;
            if options.len() + candidate.pattern().wildcard_count() != NYBBLE_COUNT {
                for upgraded in options.clusters(&candidate) {
                    if !accepted.contains(upgraded.pattern()) && queued.insert(*upgraded.pattern()) {
                        queue.insert_sorted(upgraded);
                    }
                }
            }
            model_candidates.push(candidate);
            iteration += 1;
            pending += 1;

            if iteration % log_every == 0 {
                info!(iteration, queued = queue.len(), candidates = model_candidates.len(), "refining clusters");
            }
            if pending == self.config.check_count {
                pending = 0;
                match self.checkpoint(&mut model_candidates, &current, iteration, index)? {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }

        info!(
            clusters = current.len(),
            captured = current.captured(),
            range_size = current.range_size(),
            density = current.density(),
            "cluster model built"
        );
        Ok(ClusterModel::new(current, dust, &self.config))
    }

    /// Prune `candidates` to its non-redundant members and score them.
    /// `None` means stop and keep `current`.
    fn checkpoint<I: AddressIndex + ?Sized>(
        &self,
        candidates: &mut Vec<Cluster>,
        current: &ClusterSet,
        iteration: usize,
        index: &I,
    ) -> Result<Option<ClusterSet>> {
        *candidates = remove_redundant(std::mem::take(candidates));
        let next = ClusterSet::from_clusters(candidates.clone(), index)?;
        let score = CheckpointScore::between(current, &next);
        info!(
            iteration,
            clusters = next.len(),
            captured = next.captured(),
            range_size = next.range_size(),
            density = next.density(),
            density_delta = score.density_delta,
            size_delta = score.size_delta,
            cluster_count_delta = score.cluster_count_delta,
            score = score.score,
            accepted = score.accepts(),
            "checkpoint"
        );
        Ok(score.accepts().then_some(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, GenError};

    fn addrs(list: &[&str]) -> Vec<Ipv6Addr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn builder(check_count: usize) -> ModelBuilder {
        ModelBuilder::new(Config {
            check_count,
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn test_two_addresses_one_cluster() {
        let corpus = addrs(&["2001:db8::1", "2001:db8::2"]);
        let model = builder(64).build(&corpus).unwrap();
        let set = model.cluster_set();
        assert_eq!(set.len(), 1);
        let c = &set.clusters()[0];
        assert_eq!(c.pattern().wild_positions().collect::<Vec<_>>(), vec![31]);
        assert_eq!(c.captured(), 2);
        assert_eq!(c.density(), 2.0 / 16.0);
        assert_eq!(set.density(), 2.0 / 16.0);
        assert_eq!(model.nybble_counts().total(), 0);
    }

    #[test]
    fn test_unstructured_corpus_is_all_dust() {
        // Every position of address i holds symbol i
        let corpus: Vec<Ipv6Addr> = (0..16u128)
            .map(|i| Ipv6Addr::from(i * 0x1111_1111_1111_1111_1111_1111_1111_1111))
            .collect();
        let model = builder(64).build(&corpus).unwrap();
        assert!(model.is_empty());
        assert_eq!(model.cluster_set().captured(), 0);
        let counts = model.nybble_counts();
        assert_eq!(counts.total(), 16);
        for position in 0..NYBBLE_COUNT {
            assert_eq!(counts.position(position), &[1u64; 16]);
        }
    }

    #[test]
    fn test_siblings_merge_into_wider_cluster() {
        let mut list: Vec<String> = (0..16).map(|i| format!("2001:db8::{i:x}")).collect();
        list.extend((0..4).map(|i| format!("2001:db8::1:{i:x}")));
        list.push("fe80::1".into());
        list.push("3fff::abcd".into());
        let corpus: Vec<Ipv6Addr> = list.iter().map(|s| s.parse().unwrap()).collect();

        for check_count in [1, 64] {
            let model = builder(check_count).build(&corpus).unwrap();
            let set = model.cluster_set();
            assert_eq!(set.len(), 1, "check_count = {check_count}");
            let c = &set.clusters()[0];
            assert_eq!(c.pattern().wild_positions().collect::<Vec<_>>(), vec![27, 31]);
            assert_eq!(c.captured(), 20);
            assert_eq!(set.captured(), 20);
            assert_eq!(model.nybble_counts().total(), 2);
        }
    }

    #[test]
    fn test_empty_and_duplicate_corpus() {
        let model = builder(64).build(&[]).unwrap();
        assert!(model.is_empty());
        assert_eq!(model.nybble_counts().total(), 0);

        let corpus = addrs(&["2001:db8::1", "2001:db8::2", "2001:db8::1", "2001:db8::2"]);
        let model = builder(64).build(&corpus).unwrap();
        assert_eq!(model.cluster_set().captured(), 2);
        assert_eq!(model.cluster_set().len(), 1);
    }

    #[test]
    fn test_single_address_is_dust() {
        let model = builder(64).build(&addrs(&["2001:db8::1"])).unwrap();
        assert!(model.is_empty());
        assert_eq!(model.nybble_counts().total(), 1);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = ModelBuilder::new(Config {
            check_count: 0,
            ..Config::default()
        })
        .unwrap_err();
        assert!(matches!(err, GenError::InvalidConfig(_)));
    }

    struct FailingIndex;

    impl AddressIndex for FailingIndex {
        fn count_in_range(&self, _pattern: &Pattern) -> Result<usize> {
            Err(GenError::collaborator("index offline"))
        }

        fn addresses_in_range(&self, _pattern: &Pattern) -> Result<Vec<Ipv6Addr>> {
            Err(GenError::collaborator("index offline"))
        }
    }

    #[test]
    fn test_index_failure_propagates() {
        let corpus = addrs(&["2001:db8::1", "2001:db8::2"]);
        let err = builder(64).build_with_index(&corpus, &FailingIndex).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CollaboratorFailure);
        assert!(err.to_string().contains("index offline"));
    }

    #[test]
    fn test_checkpoint_score() {
        let corpus = addrs(&["2001:db8::1", "2001:db8::2"]);
        let index = SortedCorpus::new(&corpus);
        let base = Pattern::from_addr(&"2001:db8::".parse().unwrap());
        let narrow = Cluster::measure(base.upgrade(31), &index).unwrap();
        let wide = Cluster::measure(base.upgrade_all(&[30, 31]), &index).unwrap();
        let prev = ClusterSet::from_clusters(vec![narrow], &index).unwrap();
        let next = ClusterSet::from_clusters(vec![wide], &index).unwrap();

        // density 2/16 -> 2/256, range 16 -> 256, one cluster each
        let s = CheckpointScore::between(&prev, &next);
        assert_eq!(s.density_delta, -0.9375);
        assert_eq!(s.size_delta, 15.0);
        assert_eq!(s.cluster_count_delta, 0.0);
        assert_eq!(s.score, 27.1875);
        assert!(s.accepts());

        // Same size, half the coverage
        let other = Cluster::measure(Pattern::from_addr(&"2001:db8::1:0".parse().unwrap()).upgrade(31), &index).unwrap();
        let sparse = ClusterSet::from_clusters(
            vec![Cluster::new(*other.pattern(), 1)],
            &SortedCorpus::new(&addrs(&["2001:db8::1:5"])),
        )
        .unwrap();
        let s = CheckpointScore::between(&prev, &sparse);
        assert_eq!(s.score, -1.5);
        assert!(!s.accepts());

        let s = CheckpointScore::between(&ClusterSet::new(), &next);
        assert!(s.accepts());
    }

    /// Six blocks of increasing size with stride-3 hosts, plus scattered noise.
    fn layered_corpus() -> Vec<Ipv6Addr> {
        let mut corpus = Vec::new();
        for block in 0..6u128 {
            for host in 0..(3 + block * 7) {
                corpus.push(Ipv6Addr::from(0x2001_0db8_u128 << 96 | block << 20 | host * 3));
            }
        }
        let mut x: u128 = 0x1234_5678_9abc_def0_1122_3344_5566_7788;
        for _ in 0..30 {
            x = x
                .wrapping_mul(0x2545_f491_4f6c_dd1d_2545_f491_4f6c_dd1d)
                .wrapping_add(0x9e37_79b9_7f4a_7c15);
            corpus.push(Ipv6Addr::from(x));
        }
        corpus
    }

    #[test]
    fn test_negative_score_keeps_previous_set() {
        let model = builder(1).build(&layered_corpus()).unwrap();
        let set = model.cluster_set();
        assert_eq!(set.len(), 10);
        assert_eq!(set.captured(), 123);
        assert_eq!(set.range_size(), 1120.0);
        assert_eq!(remove_redundant(set.clusters().to_vec()).len(), set.len());
    }

    #[test]
    fn test_checkpoint_prunes_candidates() {
        let corpus = addrs(&["2001:db8::1", "2001:db8::2", "2001:db8::13"]);
        let index = SortedCorpus::new(&corpus);
        let base = Pattern::from_addr(&"2001:db8::".parse().unwrap());
        let mut candidates = vec![
            Cluster::measure(base.upgrade(31), &index).unwrap(),
            Cluster::measure(base.upgrade_all(&[30, 31]), &index).unwrap(),
            Cluster::measure(base.upgrade(31), &index).unwrap(),
        ];

        let next = builder(1)
            .checkpoint(&mut candidates, &ClusterSet::new(), 1, &index)
            .unwrap()
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].pattern(), &base.upgrade_all(&[30, 31]));
        assert_eq!(next.clusters(), candidates.as_slice());
        assert_eq!(next.captured(), 3);
    }
}
