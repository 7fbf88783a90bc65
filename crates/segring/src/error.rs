//! Error types for the hash ring.

/// Result type alias for ring operations.
pub type Result<T> = std::result::Result<T, RingError>;

/// Errors surfaced by ring operations.
///
/// Both variants are recoverable by the caller. A placement collision that
/// exhausts its retries is not an error: the replica is skipped instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RingError {
    /// The call would push the ring past its virtual-node ceiling.
    ///
    /// The ring is left exactly as it was before the call. Callers usually
    /// recover through `reset_all` with fewer replicas.
    #[error("ring full: {requested} virtual nodes requested, limit is {limit}")]
    Full {
        /// Prospective virtual-node count had the call gone through.
        requested: u64,
        /// The ceiling in force.
        limit: u64,
    },

    /// A lookup was attempted on a ring without any virtual nodes.
    #[error("ring empty")]
    Empty,
}

impl RingError {
    /// True for the capacity-exceeded condition.
    pub fn is_full(&self) -> bool {
        matches!(self, RingError::Full { .. })
    }
}
