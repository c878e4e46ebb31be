//! Model layer: cluster construction and address synthesis.
//!
//! This module provides:
//!
//! - [`Cluster`] and [`ClusterSet`]: patterns with their corpus coverage.
//! - [`ModelBuilder`]: greedy density-driven construction, from seed
//!   addresses through the [`CandidateQueue`] and redundancy filtering to a
//!   converged [`ClusterModel`].
//! - [`NybbleCounts`] and [`NybbleDistribution`]: per-position symbol
//!   statistics of the dust addresses, used for jitter.
//! - [`Sampler`]: draws new addresses from a built model.
//!
//! # Usage
//!
//! ```rust
//! use addrgen::{Config, Ipv6Network, ModelBuilder, Sampler};
//! use std::net::Ipv6Addr;
//!
//! let corpus: Vec<Ipv6Addr> = (0..32u128)
//!     .map(|i| Ipv6Addr::from(0x2001_0db8_u128 << 96 | i << 4 | 1))
//!     .collect();
//! let config = Config::default();
//! let model = ModelBuilder::new(config.clone()).unwrap().build(&corpus).unwrap();
//! assert!(!model.is_empty());
//!
//! let network: Ipv6Network = "2001:db8::/32".parse().unwrap();
//! let mut sampler = Sampler::with_seed(&model, &config, 7);
//! let addrs = sampler.generate_in_network(5, &network).unwrap();
//! assert!(addrs.iter().all(|a| network.contains(a)));
//! ```

pub mod builder;
pub mod cluster;
pub mod cluster_model;
pub mod cluster_set;
pub mod distribution;
pub mod persist;
pub mod queue;
pub mod redundancy;
pub mod sampler;

pub use builder::{CheckpointScore, ModelBuilder};
pub use cluster::{Cluster, UpgradeOptions};
pub use cluster_model::ClusterModel;
pub use cluster_set::ClusterSet;
pub use distribution::{DistributionCache, NybbleCounts, NybbleDistribution};
pub use queue::CandidateQueue;
pub use redundancy::{remove_redundant, ContainmentIndex};
pub use sampler::{derive_worker_seed, Sampler};
