//! Corpus index: which observed addresses fall inside a pattern.
//!
//! Model construction only depends on the [`AddressIndex`] trait. The
//! [`SortedCorpus`] implementation keeps the corpus as a sorted `u128` array
//! and answers queries by binary-searching the pattern's numeric range, then
//! filtering with its bitmask.

use crate::error::Result;
use crate::kernel::pattern::Pattern;
use std::net::Ipv6Addr;

/// Membership queries against an observed address corpus.
///
/// Results must be exact: an address is inside a pattern iff it matches
/// every concrete position.
pub trait AddressIndex {
    /// Number of corpus addresses inside `pattern`.
    fn count_in_range(&self, pattern: &Pattern) -> Result<usize>;

    /// Corpus addresses inside `pattern`.
    fn addresses_in_range(&self, pattern: &Pattern) -> Result<Vec<Ipv6Addr>>;
}

/// In-memory corpus sorted by numeric address value.
#[derive(Clone, Debug, Default)]
pub struct SortedCorpus {
    addrs: Vec<u128>,
}

impl SortedCorpus {
    /// Build from any address list. Duplicates are collapsed.
    pub fn new(addrs: &[Ipv6Addr]) -> Self {
        let mut bits: Vec<u128> = addrs.iter().map(|&a| u128::from(a)).collect();
        bits.sort_unstable();
        bits.dedup();
        Self { addrs: bits }
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Distinct corpus addresses in ascending order.
    pub fn addresses(&self) -> impl Iterator<Item = Ipv6Addr> + '_ {
        self.addrs.iter().map(|&b| Ipv6Addr::from(b))
    }

    /// Slice of addresses between the pattern's lower and upper bound.
    fn candidates(&self, pattern: &Pattern) -> &[u128] {
        let lo = u128::from(pattern.lower_bound());
        let hi = u128::from(pattern.upper_bound());
        let start = self.addrs.partition_point(|&a| a < lo);
        let end = self.addrs.partition_point(|&a| a <= hi);
        &self.addrs[start..end]
    }
}

impl AddressIndex for SortedCorpus {
    fn count_in_range(&self, pattern: &Pattern) -> Result<usize> {
        let mask = pattern.to_bit_mask();
        Ok(self
            .candidates(pattern)
            .iter()
            .filter(|&&a| mask.matches(a))
            .count())
    }

    fn addresses_in_range(&self, pattern: &Pattern) -> Result<Vec<Ipv6Addr>> {
        let mask = pattern.to_bit_mask();
        Ok(self
            .candidates(pattern)
            .iter()
            .filter(|&&a| mask.matches(a))
            .map(|&a| Ipv6Addr::from(a))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> SortedCorpus {
        let addrs: Vec<Ipv6Addr> = [
            "2001:db8::1",
            "2001:db8::2",
            "2001:db8::1:1",
            "2001:db8::1",
            "fe80::1",
        ]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
        SortedCorpus::new(&addrs)
    }

    #[test]
    fn test_dedup() {
        assert_eq!(corpus().len(), 4);
    }

    #[test]
    fn test_counts() {
        let c = corpus();
        let one = Pattern::from_addr(&"2001:db8::1".parse().unwrap());
        assert_eq!(c.count_in_range(&one).unwrap(), 1);
        assert_eq!(c.count_in_range(&one.upgrade(31)).unwrap(), 2);
        // Wildcard in the middle: range scan must still filter by mask
        assert_eq!(c.count_in_range(&one.upgrade(27)).unwrap(), 2);
        assert_eq!(c.count_in_range(&one.upgrade(0)).unwrap(), 1);
    }

    #[test]
    fn test_addresses_match_count() {
        let c = corpus();
        let p = Pattern::from_addr(&"2001:db8::".parse().unwrap()).upgrade_all(&[27, 31]);
        let found = c.addresses_in_range(&p).unwrap();
        assert_eq!(found.len(), c.count_in_range(&p).unwrap());
        assert!(found.iter().all(|a| p.matches(a)));
        assert_eq!(found.len(), 3);
    }
}
