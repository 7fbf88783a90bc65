//! Segment-partitioned consistent hashing.
//!
//! This crate maps string keys onto a dynamic set of named physical nodes:
//! - Virtual-node placement over equal-width segments of the 32-bit ring
//! - Bounded collision retry with best-effort replica skipping
//! - Binary-search lookup with wraparound
//! - Add / remove / reset / reset-all under a single reader/writer lock
//!
//! ```rust
//! use segring::{HashRing, RingError};
//!
//! let ring = HashRing::new(100);
//! assert_eq!(ring.get("apple"), Err(RingError::Empty));
//!
//! ring.add(["node1", "node2", "node3"]).unwrap();
//! ring.reset(["node1", "node2", "node3", "node4"]).unwrap();
//! assert!(ring.nodes().contains(&ring.get("apple").unwrap()));
//! ```

pub mod config;
pub mod error;
pub mod hasher;
pub mod placement;
pub mod ring;

pub use config::{HasherKind, RingConfig, DEFAULT_REPLICAS, MAX_VNODES, MIN_REPLICAS};
pub use error::{Result, RingError};
pub use hasher::{hash_fn, Crc32, FnHasher, Hasher32, Sip13, Xxh32};
pub use ring::{HashRing, RingBuilder};
