//! Ring configuration.
//!
//! A ring is configured by two values: the number of virtual nodes per
//! physical node and the hash function. Both are fixed at construction and
//! can only be swapped afterwards through `HashRing::reset_all`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::hasher::{Crc32, Hasher32, Sip13, Xxh32};

/// Replica count used when none (or an invalid one) is given.
pub const DEFAULT_REPLICAS: u16 = 128;

/// Smallest accepted replica count. Anything lower falls back to
/// [`DEFAULT_REPLICAS`].
pub const MIN_REPLICAS: u16 = 1;

/// Ceiling on the total number of virtual nodes a ring may hold.
pub const MAX_VNODES: u64 = 1 << 30;

/// Extra placement attempts made after the first one collides.
pub const COLLISION_RETRIES: usize = 2;

/// Initial capacity reserved for the position sequence.
pub(crate) const DEFAULT_CAPACITY: usize = 1024;

/// Stock hashers selectable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HasherKind {
    /// CRC-32/IEEE.
    #[default]
    Crc32,
    /// xxHash32, seed 0.
    Xxh32,
    /// SipHash-1-3 folded to 32 bits.
    Sip13,
}

impl HasherKind {
    /// Instantiates the hasher this kind names.
    pub fn build(self) -> Arc<dyn Hasher32> {
        match self {
            HasherKind::Crc32 => Arc::new(Crc32),
            HasherKind::Xxh32 => Arc::new(Xxh32),
            HasherKind::Sip13 => Arc::new(Sip13),
        }
    }
}

/// Declarative ring configuration, loadable with serde.
///
/// Missing fields take their defaults:
///
/// ```rust
/// use segring::{HasherKind, RingConfig};
///
/// let config: RingConfig = serde_json::from_str(r#"{"hasher": "xxh32"}"#).unwrap();
/// assert_eq!(config.replicas, 128);
/// assert_eq!(config.hasher, HasherKind::Xxh32);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Virtual nodes per physical node.
    pub replicas: u16,
    /// Hash function for keys and virtual nodes.
    pub hasher: HasherKind,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            replicas: DEFAULT_REPLICAS,
            hasher: HasherKind::default(),
        }
    }
}

impl RingConfig {
    /// Replica count with the below-minimum fallback applied.
    pub fn normalized_replicas(&self) -> u16 {
        normalize_replicas(self.replicas)
    }
}

/// Maps invalid replica counts to [`DEFAULT_REPLICAS`].
pub(crate) fn normalize_replicas(replicas: u16) -> u16 {
    if replicas < MIN_REPLICAS {
        DEFAULT_REPLICAS
    } else {
        replicas
    }
}

/// Hasher used when none is given.
pub(crate) fn default_hasher() -> Arc<dyn Hasher32> {
    Arc::new(Crc32)
}
