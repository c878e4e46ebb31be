//! # addrgen: generative models of the IPv6 address space
//!
//! addrgen learns where addresses cluster in an observed corpus and
//! synthesizes new candidate addresses with the same structure.
//!
//! ## Quick Start
//!
//! ```rust
//! use addrgen::{Config, ModelBuilder, Sampler};
//! use std::net::Ipv6Addr;
//!
//! // Sixteen hosts in one /124 plus a stray address
//! let mut corpus: Vec<Ipv6Addr> = (0..16u128)
//!     .map(|i| Ipv6Addr::from(0x2001_0db8_u128 << 96 | i))
//!     .collect();
//! corpus.push("fe80::1".parse().unwrap());
//!
//! let config = Config::default();
//! let model = ModelBuilder::new(config.clone())?.build(&corpus)?;
//! assert_eq!(model.cluster_set().len(), 1);
//!
//! let mut sampler = Sampler::with_seed(&model, &config, 1);
//! let fresh = sampler.generate(4)?;
//! assert_eq!(fresh.len(), 4);
//! # Ok::<(), addrgen::GenError>(())
//! ```
//!
//! ## Core Concepts
//!
//! - **Pattern**: 32 nybble positions, each fixed or wildcard
//! - **Density**: corpus addresses captured divided by pattern size
//! - **Dust**: addresses with no structure, kept only as symbol statistics
//! - **Checkpoint**: periodic scoring that decides when construction stops
//! - **Jitter**: chance that synthesis swaps a fixed symbol for a sampled one

pub mod config;
pub mod error;
pub mod highlevel;
pub mod kernel;
pub mod model;

// Re-exports for convenience
pub use config::Config;
pub use error::{ErrorKind, GenError, Result};
pub use highlevel::AddrGen;
pub use kernel::{AddressIndex, AddressSet, Ipv6Network, Pattern, SortedCorpus, UniqueSet};
pub use model::{
    derive_worker_seed, CandidateQueue, CheckpointScore, Cluster, ClusterModel, ClusterSet,
    ModelBuilder, NybbleCounts, Sampler,
};
