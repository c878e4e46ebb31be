//! Kernel layer: address primitives.
//!
//! The kernel provides the foundation the model layer is built on:
//! - Nybble codec and network prefixes ([`nybble`], [`Ipv6Network`])
//! - Address templates with wildcard positions ([`Pattern`])
//! - Corpus membership queries ([`AddressIndex`], [`SortedCorpus`])
//! - Uniqueness tracking ([`UniqueSet`], [`AddressSet`])
//!
//! This layer has no dependencies on [`model`](crate::model) or
//! [`highlevel`](crate::highlevel).
//!
//! # Example
//!
//! ```rust
//! use addrgen::kernel::{AddressIndex, AddressSet, Pattern, SortedCorpus, UniqueSet};
//! use std::net::Ipv6Addr;
//!
//! let corpus: Vec<Ipv6Addr> = ["2001:db8::1", "2001:db8::2", "fe80::1"]
//!     .iter()
//!     .map(|s| s.parse().unwrap())
//!     .collect();
//! let index = SortedCorpus::new(&corpus);
//!
//! let p = Pattern::from_addr(&corpus[0]).upgrade(31);
//! assert_eq!(index.count_in_range(&p).unwrap(), 2);
//!
//! let mut seen = AddressSet::new();
//! assert!(seen.add(corpus[0]));
//! assert!(!seen.add(corpus[0]));
//! assert_eq!(seen.size(), 1);
//! ```

pub mod index;
pub mod nybble;
pub mod pattern;
pub mod unique;

pub use index::{AddressIndex, SortedCorpus};
pub use nybble::{Ipv6Network, Nybbles, NYBBLE_COUNT, SYMBOL_COUNT};
pub use pattern::{HalfMask, Pattern, PatternMask, WILDCARD};
pub use unique::{AddressSet, UniqueSet};
