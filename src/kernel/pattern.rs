//! Pattern: a 32-position address template.
//!
//! Each position either holds a fixed symbol or is a wildcard. Patterns are
//! `Copy` values packed into a `u128` of symbols plus a 32-bit wildcard set,
//! so equality, hashing and containment are a handful of bitwise operations.
//!
//! Wildcard positions always store symbol 0, which makes the derived
//! `PartialEq`/`Hash` agree exactly with [`Pattern::signature`] equality.
//!
//! # Example
//!
//! ```rust
//! use addrgen::Pattern;
//! use std::net::Ipv6Addr;
//!
//! let addr: Ipv6Addr = "2001:db8::1".parse().unwrap();
//! let p = Pattern::from_addr(&addr).upgrade(31);
//! assert_eq!(p.signature(), "20010db800000000000000000000000?");
//! assert_eq!(p.size(), 16.0);
//! assert!(p.matches(&"2001:db8::f".parse().unwrap()));
//! ```

use crate::error::{GenError, Result};
use crate::kernel::nybble::{self, Nybbles, NYBBLE_COUNT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

/// Character used for wildcard positions in signatures.
pub const WILDCARD: char = '?';

/// Bitmask/range view of one 64-bit half of a [`Pattern`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalfMask {
    /// 0xF for every concrete position, 0 for wildcards.
    pub mask: u64,
    /// Concrete symbols, 0 for wildcards.
    pub expected: u64,
    /// Smallest value inside the pattern.
    pub min: u64,
    /// Largest value inside the pattern.
    pub max: u64,
}

impl HalfMask {
    #[inline]
    pub fn matches(&self, half: u64) -> bool {
        half & self.mask == self.expected
    }

    #[inline]
    pub fn in_range(&self, half: u64) -> bool {
        self.min <= half && half <= self.max
    }
}

/// Bitmask form of a [`Pattern`], split into high (positions 0-15) and low
/// (positions 16-31) halves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatternMask {
    pub first: HalfMask,
    pub second: HalfMask,
}

impl PatternMask {
    /// `true` if the packed address lies inside the pattern.
    #[inline]
    pub fn matches(&self, bits: u128) -> bool {
        self.first.matches((bits >> 64) as u64) && self.second.matches(bits as u64)
    }
}

/// A fixed-width symbolic address pattern.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    /// Packed symbols, zero at wildcard positions.
    value: u128,
    /// Bit `i` set when position `i` is a wildcard.
    wild: u32,
}

impl Pattern {
    /// Pattern matching exactly one address.
    pub fn from_addr(addr: &Ipv6Addr) -> Self {
        Self {
            value: u128::from(*addr),
            wild: 0,
        }
    }

    pub fn from_nybbles(nybbles: &Nybbles) -> Self {
        Self::from_addr(&nybble::from_nybbles(nybbles))
    }

    /// Smallest pattern covering every address in `addrs`.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_addresses(addrs: &[Ipv6Addr]) -> Option<Self> {
        let (first, rest) = addrs.split_first()?;
        let mut pattern = Self::from_addr(first);
        for addr in rest {
            pattern.absorb(addr);
        }
        Some(pattern)
    }

    /// Symbol stored at `position`, or `None` for a wildcard.
    pub fn symbol(&self, position: usize) -> Option<u8> {
        if self.is_wild(position) {
            None
        } else {
            Some(nybble::nybble_at(self.value, position))
        }
    }

    #[inline]
    pub fn is_wild(&self, position: usize) -> bool {
        self.wild & (1 << position) != 0
    }

    /// Raw wildcard set, bit `i` for position `i`.
    #[inline]
    pub fn wild_bits(&self) -> u32 {
        self.wild
    }

    /// Packed concrete symbols with wildcards zeroed.
    #[inline]
    pub fn value(&self) -> u128 {
        self.value
    }

    pub fn wildcard_count(&self) -> usize {
        self.wild.count_ones() as usize
    }

    pub fn wild_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..NYBBLE_COUNT).filter(move |&i| self.is_wild(i))
    }

    pub fn concrete_positions(&self) -> impl Iterator<Item = usize> + '_ {
        (0..NYBBLE_COUNT).filter(move |&i| !self.is_wild(i))
    }

    /// Copy of this pattern with `position` turned into a wildcard.
    ///
    /// Callers only upgrade concrete positions; upgrading a wildcard again
    /// returns an identical pattern.
    pub fn upgrade(&self, position: usize) -> Self {
        debug_assert!(position < NYBBLE_COUNT, "position {position} out of range");
        let wild = self.wild | (1 << position);
        Self {
            value: self.value & concrete_mask(wild),
            wild,
        }
    }

    /// Copy with every position in `positions` turned into a wildcard.
    pub fn upgrade_all(&self, positions: &[usize]) -> Self {
        positions.iter().fold(*self, |p, &i| p.upgrade(i))
    }

    /// `true` if every address inside `other` is also inside `self`.
    ///
    /// Each concrete position of `self` must be concrete in `other` with the
    /// same symbol; a wildcard in `other` never matches a fixed symbol.
    pub fn contains(&self, other: &Pattern) -> bool {
        other.wild & !self.wild == 0 && other.value & concrete_mask(self.wild) == self.value
    }

    /// `true` if `addr` lies inside this pattern.
    pub fn matches(&self, addr: &Ipv6Addr) -> bool {
        self.matches_bits(u128::from(*addr))
    }

    #[inline]
    pub fn matches_bits(&self, bits: u128) -> bool {
        bits & concrete_mask(self.wild) == self.value
    }

    /// Widen to wildcard every concrete position where `addr` differs.
    pub fn absorb(&mut self, addr: &Ipv6Addr) {
        let bits = u128::from(*addr);
        for i in 0..NYBBLE_COUNT {
            if !self.is_wild(i) && nybble::nybble_at(bits, i) != nybble::nybble_at(self.value, i)
            {
                self.wild |= 1 << i;
            }
        }
        self.value &= concrete_mask(self.wild);
    }

    /// Number of addresses matched: 16^wildcards.
    pub fn size(&self) -> f64 {
        16f64.powi(self.wildcard_count() as i32)
    }

    /// Canonical key: hex digit per concrete position, `?` per wildcard.
    pub fn signature(&self) -> String {
        (0..NYBBLE_COUNT)
            .map(|i| match self.symbol(i) {
                Some(s) => char::from_digit(u32::from(s), 16).unwrap_or(WILDCARD),
                None => WILDCARD,
            })
            .collect()
    }

    /// Lowest address inside the pattern.
    pub fn lower_bound(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.value)
    }

    /// Highest address inside the pattern.
    pub fn upper_bound(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.value | !concrete_mask(self.wild))
    }

    /// Bitmask and numeric range form for fast index lookups.
    pub fn to_bit_mask(&self) -> PatternMask {
        let mask = concrete_mask(self.wild);
        let max = self.value | !mask;
        PatternMask {
            first: HalfMask {
                mask: (mask >> 64) as u64,
                expected: (self.value >> 64) as u64,
                min: (self.value >> 64) as u64,
                max: (max >> 64) as u64,
            },
            second: HalfMask {
                mask: mask as u64,
                expected: self.value as u64,
                min: self.value as u64,
                max: max as u64,
            },
        }
    }
}

/// 0xF in every position not set in `wild`.
#[inline]
pub(crate) fn concrete_mask(wild: u32) -> u128 {
    let mut mask = u128::MAX;
    let mut rest = wild;
    while rest != 0 {
        let i = rest.trailing_zeros() as usize;
        mask &= !(0x0f_u128 << nybble::shift_for(i));
        rest &= rest - 1;
    }
    mask
}

impl FromStr for Pattern {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        if s.chars().count() != NYBBLE_COUNT {
            return Err(GenError::InvalidInput(format!(
                "pattern '{s}' must have {NYBBLE_COUNT} positions"
            )));
        }
        let mut value = 0u128;
        let mut wild = 0u32;
        for (i, c) in s.chars().enumerate() {
            value <<= 4;
            if c == WILDCARD {
                wild |= 1 << i;
            } else {
                let digit = c.to_digit(16).ok_or_else(|| {
                    GenError::InvalidInput(format!("pattern '{s}' has invalid symbol '{c}'"))
                })?;
                value |= u128::from(digit);
            }
        }
        Ok(Self { value, wild })
    }
}

impl TryFrom<String> for Pattern {
    type Error = GenError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Pattern> for String {
    fn from(p: Pattern) -> String {
        p.signature()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({})", self.signature())
    }
}
