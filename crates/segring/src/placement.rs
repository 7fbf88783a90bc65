//! Virtual node placement.
//!
//! # Segment partitioning
//!
//! The 32-bit coordinate space is cut into `replicas` contiguous segments of
//! equal width. Virtual node `i` of every physical node lands in segment `i`:
//!
//! ```text
//!   0                                                          u32::MAX
//!   |  seg 0   |  seg 1   |  seg 2   |   ...    | seg r-1  |
//!      ^ a#0      ^ a#1      ^ a#2                 ^ a#r-1
//!        ^ b#0        ^ b#1    ^ b#2                  ^ b#r-1
//! ```
//!
//! The offset inside the segment comes from hashing `"{i}{node}"` and folding
//! the hash into the segment width with a multiplicative step. A node's
//! replicas therefore cover the whole ring even when the hasher is skewed
//! and would otherwise cluster them around a single value.
//!
//! # Collisions
//!
//! When the chosen position is already owned, the position is rehashed as
//! `fold(position + 1)` inside the same segment, up to
//! [`COLLISION_RETRIES`] more times. If every attempt collides the replica is
//! dropped. That costs a little balance but never fails the operation.

use crate::config::COLLISION_RETRIES;
use crate::hasher::Hasher32;

/// Multiplier for the fold step (the 32-bit FNV prime).
pub const FOLD_PRIME: u32 = 16_777_619;

/// Folds an arbitrary 32-bit value into `0..width`.
///
/// The multiplication wraps on purpose; only the residue matters.
#[inline]
pub fn fold(value: u32, width: u32) -> u32 {
    value.wrapping_mul(FOLD_PRIME) % width
}

/// Hash input for virtual node `index` of `node`.
#[inline]
pub fn vnode_key(node: &str, index: u16) -> String {
    format!("{index}{node}")
}

/// Equal-width partition of the ring for a given replica count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segments {
    width: u32,
}

impl Segments {
    /// Partition for `replicas` segments. `replicas` must be non-zero.
    pub fn new(replicas: u16) -> Self {
        debug_assert!(replicas > 0);
        Self {
            width: u32::MAX / u32::from(replicas.max(1)),
        }
    }

    /// Width of every segment.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// First coordinate of segment `index`.
    #[inline]
    pub fn start(&self, index: u16) -> u32 {
        self.width * u32::from(index)
    }

    /// Computes the position of virtual node `index` of `node`.
    ///
    /// `occupied` reports whether a position is already taken. Returns `None`
    /// when the first attempt and all retries collide.
    ///
    /// # Performance
    /// - **Time**: one hash of the vnode key plus at most
    ///   `1 + COLLISION_RETRIES` calls to `occupied`
    pub fn place<F>(&self, hasher: &dyn Hasher32, node: &str, index: u16, occupied: F) -> Option<u32>
    where
        F: Fn(u32) -> bool,
    {
        let start = self.start(index);
        let mut position = start + fold(hasher.hash32(vnode_key(node, index).as_bytes()), self.width);
        if !occupied(position) {
            return Some(position);
        }
        for _ in 0..COLLISION_RETRIES {
            position = start + fold(position.wrapping_add(1), self.width);
            if !occupied(position) {
                return Some(position);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::{hash_fn, Crc32};
    use std::collections::HashSet;

    #[test]
    fn test_vnode_key_format() {
        assert_eq!(vnode_key("node1", 0), "0node1");
        assert_eq!(vnode_key("cache-a", 17), "17cache-a");
    }

    #[test]
    fn test_fold_stays_in_width() {
        for value in [0, 1, 12345, u32::MAX / 2, u32::MAX] {
            assert!(fold(value, 1000) < 1000);
        }
        // Wrapping multiplication, not widening.
        assert_eq!(fold(u32::MAX, u32::MAX), FOLD_PRIME.wrapping_neg() % u32::MAX);
    }

    #[test]
    fn test_segments_cover_ring() {
        let segs = Segments::new(4);
        assert_eq!(segs.width(), u32::MAX / 4);
        assert_eq!(segs.start(0), 0);
        assert_eq!(segs.start(3), 3 * (u32::MAX / 4));

        let single = Segments::new(1);
        assert_eq!(single.width(), u32::MAX);
        assert_eq!(single.start(0), 0);
    }

    #[test]
    fn test_placement_lands_in_own_segment() {
        let segs = Segments::new(64);
        for index in 0..64u16 {
            let pos = segs.place(&Crc32, "node1", index, |_| false).unwrap();
            assert!(pos >= segs.start(index));
            assert!(pos < segs.start(index) + segs.width());
        }
    }

    #[test]
    fn test_constant_hasher_still_spreads_replicas() {
        let constant = hash_fn(|_: &[u8]| 42);
        let segs = Segments::new(8);
        let positions: HashSet<u32> = (0..8u16)
            .map(|i| segs.place(&constant, "n", i, |_| false).unwrap())
            .collect();
        assert_eq!(positions.len(), 8);
    }

    #[test]
    fn test_collision_retries_then_skips() {
        let segs = Segments::new(2);
        let first = segs.place(&Crc32, "a", 1, |_| false).unwrap();

        // First attempt taken: the first retry wins.
        let retry = segs.place(&Crc32, "a", 1, |p| p == first).unwrap();
        assert_eq!(retry, segs.start(1) + fold(first + 1, segs.width()));

        // Everything taken: the replica is dropped.
        assert_eq!(segs.place(&Crc32, "a", 1, |_| true), None);
    }
}
