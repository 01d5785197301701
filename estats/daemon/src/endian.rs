//! Host byte order resolution
//!
//! The tracing programs write every multi-byte field in the host's native
//! order. The order is resolved once into [`NATIVE`] and every reader and
//! writer in the crate goes through it.

use bytes::{Buf, BufMut};
use std::net::Ipv4Addr;

/// Multi-byte integer layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Least significant byte first
    Little,
    /// Most significant byte first
    Big,
}

/// Byte order of the running host
pub static NATIVE: ByteOrder = ByteOrder::detect();

impl ByteOrder {
    /// Probe the layout of a known integer
    pub const fn detect() -> Self {
        if 1u16.to_ne_bytes()[0] == 1 {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    pub fn get_u16(self, buf: &mut impl Buf) -> u16 {
        match self {
            ByteOrder::Little => buf.get_u16_le(),
            ByteOrder::Big => buf.get_u16(),
        }
    }

    pub fn get_u32(self, buf: &mut impl Buf) -> u32 {
        match self {
            ByteOrder::Little => buf.get_u32_le(),
            ByteOrder::Big => buf.get_u32(),
        }
    }

    pub fn get_u64(self, buf: &mut impl Buf) -> u64 {
        match self {
            ByteOrder::Little => buf.get_u64_le(),
            ByteOrder::Big => buf.get_u64(),
        }
    }

    pub fn put_u16(self, buf: &mut impl BufMut, n: u16) {
        match self {
            ByteOrder::Little => buf.put_u16_le(n),
            ByteOrder::Big => buf.put_u16(n),
        }
    }

    pub fn put_u32(self, buf: &mut impl BufMut, n: u32) {
        match self {
            ByteOrder::Little => buf.put_u32_le(n),
            ByteOrder::Big => buf.put_u32(n),
        }
    }

    pub fn put_u64(self, buf: &mut impl BufMut, n: u64) {
        match self {
            ByteOrder::Little => buf.put_u64_le(n),
            ByteOrder::Big => buf.put_u64(n),
        }
    }

    /// Interpret a packed address as the four bytes it occupies in memory
    ///
    /// The kernel stores IPv4 addresses as raw network bytes, so laying the
    /// integer back out in this order recovers the dotted quad.
    pub fn ipv4(self, packed: u32) -> Ipv4Addr {
        let octets = match self {
            ByteOrder::Little => packed.to_le_bytes(),
            ByteOrder::Big => packed.to_be_bytes(),
        };
        Ipv4Addr::from(octets)
    }

    /// Inverse of [`ByteOrder::ipv4`]
    pub fn pack_ipv4(self, addr: Ipv4Addr) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(addr.octets()),
            ByteOrder::Big => u32::from_be_bytes(addr.octets()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_matches_target() {
        if cfg!(target_endian = "big") {
            assert_eq!(NATIVE, ByteOrder::Big);
        } else {
            assert_eq!(NATIVE, ByteOrder::Little);
        }
    }

    #[test]
    fn test_ipv4_little_endian() {
        assert_eq!(ByteOrder::Little.ipv4(16777343), Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(ByteOrder::Little.pack_ipv4(Ipv4Addr::new(127, 0, 0, 1)), 16777343);
    }

    #[test]
    fn test_ipv4_big_endian() {
        assert_eq!(ByteOrder::Big.ipv4(0x7f00_0001), Ipv4Addr::new(127, 0, 0, 1));
    }

    #[test]
    fn test_readers_honor_order() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(ByteOrder::Little.get_u32(&mut &data[..]), 0x0403_0201);
        assert_eq!(ByteOrder::Big.get_u32(&mut &data[..]), 0x0102_0304);

        let mut out = Vec::new();
        ByteOrder::Little.put_u16(&mut out, 0x0102);
        ByteOrder::Big.put_u16(&mut out, 0x0102);
        assert_eq!(out, vec![0x02, 0x01, 0x01, 0x02]);
    }
}
