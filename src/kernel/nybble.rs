//! Address codec: IPv6 addresses as 32 four-bit symbols.
//!
//! Position 0 is the most significant nybble.

use crate::error::{GenError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

/// Number of nybbles in an address.
pub const NYBBLE_COUNT: usize = 32;

/// Number of distinct symbols per position.
pub const SYMBOL_COUNT: usize = 16;

/// A full address, one symbol (0-15) per position.
pub type Nybbles = [u8; NYBBLE_COUNT];

/// Split an address into its 32 nybbles.
pub fn to_nybbles(addr: &Ipv6Addr) -> Nybbles {
    let bits = u128::from(*addr);
    let mut out = [0u8; NYBBLE_COUNT];
    for (i, n) in out.iter_mut().enumerate() {
        *n = nybble_at(bits, i);
    }
    out
}

/// Reassemble an address from its 32 nybbles.
///
/// Only the low four bits of each entry are used.
pub fn from_nybbles(nybbles: &Nybbles) -> Ipv6Addr {
    let bits = nybbles
        .iter()
        .fold(0u128, |acc, &n| (acc << 4) | u128::from(n & 0x0f));
    Ipv6Addr::from(bits)
}

/// Nybble at `position` of a packed 128-bit address.
#[inline]
pub fn nybble_at(bits: u128, position: usize) -> u8 {
    ((bits >> shift_for(position)) & 0x0f) as u8
}

/// Bit offset of `position` inside a packed 128-bit address.
#[inline]
pub(crate) fn shift_for(position: usize) -> u32 {
    ((NYBBLE_COUNT - 1 - position) * 4) as u32
}

/// Leading nybbles of a network prefix.
///
/// Fails with [`GenError::InvalidPrefixLength`] unless `prefix_len` is a
/// multiple of 4 no greater than 128.
pub fn network_nybbles(addr: &Ipv6Addr, prefix_len: u8) -> Result<Vec<u8>> {
    if prefix_len % 4 != 0 || prefix_len > 128 {
        return Err(GenError::InvalidPrefixLength(prefix_len));
    }
    let count = usize::from(prefix_len / 4);
    Ok(to_nybbles(addr)[..count].to_vec())
}

/// Render an address as 32 lowercase hex digits.
pub fn to_hex(addr: &Ipv6Addr) -> String {
    format!("{:032x}", u128::from(*addr))
}

/// Parse either IPv6 text (`2001:db8::1`) or 32 hex digits.
pub fn parse_address(text: &str) -> Result<Ipv6Addr> {
    let text = text.trim();
    if text.len() == NYBBLE_COUNT && text.bytes().all(|b| b.is_ascii_hexdigit()) {
        let bits = u128::from_str_radix(text, 16)
            .map_err(|e| GenError::InvalidInput(format!("{text}: {e}")))?;
        return Ok(Ipv6Addr::from(bits));
    }
    text.parse::<Ipv6Addr>()
        .map_err(|e| GenError::InvalidInput(format!("{text}: {e}")))
}

/// An IPv6 network in `addr/len` form.
///
/// Host bits are cleared on construction. Any prefix length up to 128 parses;
/// the divisible-by-4 rule is applied when the prefix is turned into nybbles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ipv6Network {
    addr: Ipv6Addr,
    prefix_len: u8,
}

impl Ipv6Network {
    pub fn new(addr: Ipv6Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 128 {
            return Err(GenError::InvalidPrefixLength(prefix_len));
        }
        let mask = if prefix_len == 0 {
            0
        } else {
            u128::MAX << (128 - u32::from(prefix_len))
        };
        Ok(Self {
            addr: Ipv6Addr::from(u128::from(addr) & mask),
            prefix_len,
        })
    }

    pub fn addr(&self) -> Ipv6Addr {
        self.addr
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Fixed leading nybbles of this network.
    pub fn nybbles(&self) -> Result<Vec<u8>> {
        network_nybbles(&self.addr, self.prefix_len)
    }

    pub fn contains(&self, addr: &Ipv6Addr) -> bool {
        Ipv6Network::new(*addr, self.prefix_len)
            .map(|n| n.addr == self.addr)
            .unwrap_or(false)
    }
}

impl FromStr for Ipv6Network {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, len) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| GenError::InvalidInput(format!("{s}: missing prefix length")))?;
        let addr = addr
            .parse::<Ipv6Addr>()
            .map_err(|e| GenError::InvalidInput(format!("{s}: {e}")))?;
        let len = len
            .parse::<u8>()
            .map_err(|e| GenError::InvalidInput(format!("{s}: {e}")))?;
        Ipv6Network::new(addr, len)
    }
}

impl fmt::Display for Ipv6Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nybble_order() {
        let addr: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let n = to_nybbles(&addr);
        assert_eq!(&n[..8], &[2, 0, 0, 1, 0, 0xd, 0xb, 8]);
        assert_eq!(n[31], 1);
        assert_eq!(from_nybbles(&n), addr);
    }

    #[test]
    fn test_network_nybbles() {
        let addr: Ipv6Addr = "2001:db8::".parse().unwrap();
        assert_eq!(network_nybbles(&addr, 32).unwrap(), vec![2, 0, 0, 1, 0, 0xd, 0xb, 8]);
        assert!(network_nybbles(&addr, 0).unwrap().is_empty());
        assert!(matches!(
            network_nybbles(&addr, 37),
            Err(GenError::InvalidPrefixLength(37))
        ));
    }

    #[test]
    fn test_parse_address_forms() {
        let a = parse_address("2001:db8::1").unwrap();
        let b = parse_address("20010db8000000000000000000000001").unwrap();
        assert_eq!(a, b);
        assert_eq!(to_hex(&a), "20010db8000000000000000000000001");
        assert!(parse_address("not-an-address").is_err());
    }

    #[test]
    fn test_network_parse_and_contains() {
        let net: Ipv6Network = "2001:db8::ff/32".parse().unwrap();
        assert_eq!(net.addr(), "2001:db8::".parse::<Ipv6Addr>().unwrap());
        assert!(net.contains(&"2001:db8:1::5".parse().unwrap()));
        assert!(!net.contains(&"2001:db9::".parse().unwrap()));
        assert_eq!(net.to_string(), "2001:db8::/32");

        let odd: Ipv6Network = "2001:db8::/37".parse().unwrap();
        assert!(odd.nybbles().is_err());
        assert!("2001:db8::/129".parse::<Ipv6Network>().is_err());
    }
}
