//! Pluggable 32-bit hashing for keys and virtual nodes.
//!
//! The ring treats the hasher as an opaque `bytes -> u32` capability. It must
//! be deterministic for the lifetime of the process; nothing else is assumed.
//! Placement compensates for low-quality hashers through segment
//! partitioning (see [`crate::placement`]), so even a constant function keeps
//! the ring consistent, only badly balanced.

use std::fmt;
use std::hash::Hasher as _;

use siphasher::sip::SipHasher13;

/// A hash function producing positions on the 32-bit ring.
///
/// Hashers are shared across threads behind an `Arc` and are called under the
/// ring's lock, so implementations must be `Send + Sync` and should not block.
pub trait Hasher32: Send + Sync + 'static {
    /// Hashes `data` to a ring coordinate.
    fn hash32(&self, data: &[u8]) -> u32;

    /// Name of this hasher, used in diagnostics.
    fn name(&self) -> &'static str {
        "custom"
    }
}

/// CRC-32 (IEEE polynomial). The default hasher.
#[derive(Clone, Copy, Debug, Default)]
pub struct Crc32;

impl Hasher32 for Crc32 {
    fn hash32(&self, data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }

    fn name(&self) -> &'static str {
        "crc32"
    }
}

/// xxHash32 with a zero seed.
#[derive(Clone, Copy, Debug, Default)]
pub struct Xxh32;

impl Hasher32 for Xxh32 {
    fn hash32(&self, data: &[u8]) -> u32 {
        xxhash_rust::xxh32::xxh32(data, 0)
    }

    fn name(&self) -> &'static str {
        "xxh32"
    }
}

/// SipHash-1-3 with zero keys, folded to 32 bits.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sip13;

impl Hasher32 for Sip13 {
    fn hash32(&self, data: &[u8]) -> u32 {
        let mut hasher = SipHasher13::new();
        hasher.write(data);
        let h = hasher.finish();
        (h as u32) ^ ((h >> 32) as u32)
    }

    fn name(&self) -> &'static str {
        "sip13"
    }
}

/// Adapts a plain closure or function pointer into a [`Hasher32`].
#[derive(Clone)]
pub struct FnHasher<F> {
    f: F,
}

impl<F> Hasher32 for FnHasher<F>
where
    F: Fn(&[u8]) -> u32 + Send + Sync + 'static,
{
    fn hash32(&self, data: &[u8]) -> u32 {
        (self.f)(data)
    }
}

impl<F> fmt::Debug for FnHasher<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHasher").finish_non_exhaustive()
    }
}

/// Wraps `f` so it can be handed to the ring as a hasher.
///
/// ```rust
/// use segring::{hash_fn, HashRing};
///
/// let ring = HashRing::with_hasher(16, hash_fn(|data: &[u8]| data.len() as u32));
/// assert_eq!(ring.hasher_name(), "custom");
/// ```
pub fn hash_fn<F>(f: F) -> FnHasher<F>
where
    F: Fn(&[u8]) -> u32 + Send + Sync + 'static,
{
    FnHasher { f }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_matches_ieee_check_value() {
        // Standard CRC-32/IEEE check value for "123456789".
        assert_eq!(Crc32.hash32(b"123456789"), 0xCBF4_3926);
        assert_eq!(Crc32.name(), "crc32");
    }

    #[test]
    fn test_xxh32_known_value() {
        assert_eq!(Xxh32.hash32(b""), 0x02CC_5D05);
    }

    #[test]
    fn test_hashers_are_deterministic() {
        let hashers: [&dyn Hasher32; 3] = [&Crc32, &Xxh32, &Sip13];
        for h in hashers {
            assert_eq!(h.hash32(b"node1"), h.hash32(b"node1"), "{}", h.name());
            assert_ne!(h.hash32(b"node1"), h.hash32(b"node2"), "{}", h.name());
        }
    }

    #[test]
    fn test_fn_hasher() {
        let h = hash_fn(|data: &[u8]| data.iter().map(|&b| b as u32).sum());
        assert_eq!(h.hash32(&[1, 2, 3]), 6);
        assert_eq!(h.name(), "custom");
    }
}
