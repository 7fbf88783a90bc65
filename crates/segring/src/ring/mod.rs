//! Consistent hash ring implementation.
//!
//! The ring keeps its virtual-node positions sorted and resolves keys with a
//! binary search over them.

mod store;
#[allow(clippy::module_inception)]
pub mod ring;

pub use ring::{HashRing, RingBuilder};
