//! Uniqueness tracking for address streams.

use std::collections::HashSet;
use std::net::Ipv6Addr;

/// Set of addresses that reports whether an insert was new.
pub trait UniqueSet {
    /// Insert `addr`; `true` if it was not present before.
    fn add(&mut self, addr: Ipv6Addr) -> bool;

    /// Number of distinct addresses held.
    fn size(&self) -> usize;

    /// Every distinct address held.
    fn all(&self) -> Vec<Ipv6Addr>;

    /// Insert many addresses, returning how many were new.
    fn add_all<I: IntoIterator<Item = Ipv6Addr>>(&mut self, addrs: I) -> usize
    where
        Self: Sized,
    {
        addrs.into_iter().filter(|&a| self.add(a)).count()
    }
}

/// Hash-backed [`UniqueSet`] that remembers first-insertion order.
#[derive(Clone, Debug, Default)]
pub struct AddressSet {
    seen: HashSet<u128>,
    order: Vec<Ipv6Addr>,
}

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            seen: HashSet::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
        }
    }

    pub fn contains(&self, addr: &Ipv6Addr) -> bool {
        self.seen.contains(&u128::from(*addr))
    }

    pub fn into_vec(self) -> Vec<Ipv6Addr> {
        self.order
    }
}

impl UniqueSet for AddressSet {
    fn add(&mut self, addr: Ipv6Addr) -> bool {
        if self.seen.insert(u128::from(addr)) {
            self.order.push(addr);
            true
        } else {
            false
        }
    }

    fn size(&self) -> usize {
        self.order.len()
    }

    fn all(&self) -> Vec<Ipv6Addr> {
        self.order.clone()
    }
}
