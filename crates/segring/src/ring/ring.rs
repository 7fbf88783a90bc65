//! The concurrent hash ring.
//!
//! [`HashRing`] couples the ring store with its configuration behind one
//! `parking_lot::RwLock`. Membership changes (`add`, `remove`, `reset`,
//! `reset_all`) hold the write lock for their whole duration, sort pass
//! included; lookups and inspection hold the read lock and never mutate.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::config::{default_hasher, normalize_replicas, RingConfig, DEFAULT_REPLICAS, MAX_VNODES};
use crate::error::{Result, RingError};
use crate::hasher::Hasher32;
use crate::ring::store::RingStore;

struct RingState {
    replicas: u16,
    hasher: Arc<dyn Hasher32>,
    store: RingStore,
}

impl RingState {
    fn new(replicas: u16, hasher: Arc<dyn Hasher32>) -> Self {
        Self {
            replicas: normalize_replicas(replicas),
            hasher,
            store: RingStore::new(),
        }
    }
}

/// Rejects a prospective ring of `nodes` physical nodes.
fn check_capacity(nodes: usize, replicas: u16) -> Result<()> {
    let requested = nodes as u64 * u64::from(replicas);
    if requested > MAX_VNODES {
        warn!(requested, limit = MAX_VNODES, "ring capacity exceeded");
        return Err(RingError::Full {
            requested,
            limit: MAX_VNODES,
        });
    }
    Ok(())
}

/// Distinct identifiers in first-seen order.
fn dedup<'a, I, S>(nodes: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a S>,
    S: AsRef<str> + ?Sized + 'a,
{
    let mut seen = HashSet::new();
    nodes
        .into_iter()
        .map(|node| node.as_ref())
        .filter(|node| seen.insert(*node))
        .map(str::to_owned)
        .collect()
}

/// A consistent hash ring mapping string keys to physical nodes.
///
/// Each physical node owns `replicas` virtual nodes spread over the 32-bit
/// ring, one per segment. A key belongs to the first virtual node at or after
/// its hash, wrapping around past the largest position.
///
/// `HashRing` is `Send + Sync`; share it with an `Arc` and call it from any
/// number of threads.
///
/// # Example
///
/// ```rust
/// use segring::HashRing;
///
/// let ring = HashRing::new(100);
/// ring.add(["node1", "node2", "node3"]).unwrap();
///
/// let owner = ring.get("apple").unwrap();
/// assert_eq!(ring.get("apple").unwrap(), owner);
///
/// ring.remove(["node3"]);
/// assert_ne!(ring.get("apple").unwrap(), "node3");
/// ```
pub struct HashRing {
    state: RwLock<RingState>,
}

impl HashRing {
    /// Creates an empty ring hashing with CRC-32.
    ///
    /// A zero `replicas` falls back to [`DEFAULT_REPLICAS`].
    pub fn new(replicas: u16) -> Self {
        Self::from_parts(replicas, default_hasher())
    }

    /// Creates an empty ring with a custom hasher.
    pub fn with_hasher<H: Hasher32>(replicas: u16, hasher: H) -> Self {
        Self::from_parts(replicas, Arc::new(hasher))
    }

    /// Creates an empty ring from a declarative configuration.
    pub fn from_config(config: &RingConfig) -> Self {
        Self::from_parts(config.replicas, config.hasher.build())
    }

    fn from_parts(replicas: u16, hasher: Arc<dyn Hasher32>) -> Self {
        Self {
            state: RwLock::new(RingState::new(replicas, hasher)),
        }
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    /// Adds physical nodes to the ring.
    ///
    /// Nodes already present are skipped. If the resulting ring would hold
    /// more than [`MAX_VNODES`] virtual nodes the call fails with
    /// [`RingError::Full`] and nothing is inserted.
    ///
    /// # Performance
    /// - **Time**: O(k·r) placement for k new nodes and r replicas, plus one
    ///   O(n log n) sort of the n positions
    pub fn add<I, S>(&self, nodes: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes: Vec<S> = nodes.into_iter().collect();
        let mut state = self.state.write();
        let fresh: Vec<String> = dedup(nodes.iter())
            .into_iter()
            .filter(|node| !state.store.contains(node))
            .collect();
        check_capacity(state.store.node_count() + fresh.len(), state.replicas)?;
        if fresh.is_empty() {
            return Ok(());
        }

        let RingState {
            replicas,
            hasher,
            store,
        } = &mut *state;
        store.insert_nodes(fresh.iter().map(String::as_str), *replicas, &**hasher);
        store.sort();
        debug!(
            added = fresh.len(),
            nodes = store.node_count(),
            vnodes = store.vnode_count(),
            "added nodes to ring"
        );
        Ok(())
    }

    /// Removes physical nodes and all their virtual nodes.
    ///
    /// Absent nodes are ignored. Returns how many nodes were removed.
    pub fn remove<I, S>(&self, nodes: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes: Vec<S> = nodes.into_iter().collect();
        let mut state = self.state.write();
        let removed = state.store.remove_nodes(nodes.iter().map(|node| node.as_ref()));
        state.store.sort();
        if removed > 0 {
            debug!(
                removed,
                nodes = state.store.node_count(),
                vnodes = state.store.vnode_count(),
                "removed nodes from ring"
            );
        }
        removed
    }

    /// Makes `nodes` the exact membership of the ring.
    ///
    /// Only the difference is applied: nodes missing from `nodes` are
    /// removed, new ones are added, and the positions are sorted once for
    /// both. Nodes kept across the call keep their virtual nodes.
    pub fn reset<I, S>(&self, nodes: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes: Vec<S> = nodes.into_iter().collect();
        let target = dedup(nodes.iter());
        let mut state = self.state.write();
        check_capacity(target.len(), state.replicas)?;

        let RingState {
            replicas,
            hasher,
            store,
        } = &mut *state;
        let wanted: HashSet<&str> = target.iter().map(String::as_str).collect();
        let stale: Vec<Arc<str>> = store
            .node_names()
            .filter(|node| !wanted.contains(&***node))
            .cloned()
            .collect();
        let removed = store.remove_nodes(stale.iter().map(|node| &**node));
        let fresh: Vec<&str> = target
            .iter()
            .map(String::as_str)
            .filter(|node| !store.contains(node))
            .collect();
        let added = fresh.len();
        store.insert_nodes(fresh, *replicas, &**hasher);
        store.sort();
        debug!(
            removed,
            added,
            nodes = store.node_count(),
            vnodes = store.vnode_count(),
            "reset ring membership"
        );
        Ok(())
    }

    /// Discards all state, installs a new configuration and adds `nodes`.
    ///
    /// A zero `replicas` falls back to [`DEFAULT_REPLICAS`] and a missing
    /// hasher to CRC-32. The capacity check runs against the new
    /// configuration before anything is cleared, so a [`RingError::Full`]
    /// leaves the ring as it was.
    pub fn reset_all<I, S>(&self, replicas: u16, hasher: Option<Arc<dyn Hasher32>>, nodes: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let nodes: Vec<S> = nodes.into_iter().collect();
        let target = dedup(nodes.iter());
        let replicas = normalize_replicas(replicas);
        check_capacity(target.len(), replicas)?;

        let mut state = self.state.write();
        state.store.clear();
        state.replicas = replicas;
        state.hasher = hasher.unwrap_or_else(default_hasher);

        let RingState {
            replicas,
            hasher,
            store,
        } = &mut *state;
        store.insert_nodes(target.iter().map(String::as_str), *replicas, &**hasher);
        store.sort();
        debug!(
            replicas = *replicas,
            hasher = hasher.name(),
            nodes = store.node_count(),
            vnodes = store.vnode_count(),
            "rebuilt ring"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Returns the physical node owning `key`.
    ///
    /// Fails with [`RingError::Empty`] when the ring has no virtual nodes.
    ///
    /// # Algorithm
    ///
    /// 1. Hash the key with the configured hasher
    /// 2. Binary search for the first position `>= hash`
    /// 3. Past the last position, wrap to the first one
    ///
    /// # Performance
    /// - **Time**: O(log n) for n virtual nodes
    pub fn get<K: AsRef<[u8]>>(&self, key: K) -> Result<String> {
        let state = self.state.read();
        let positions = state.store.positions();
        if positions.is_empty() {
            return Err(RingError::Empty);
        }

        let hash = state.hasher.hash32(key.as_ref());
        let mut idx = positions.partition_point(|&p| p < hash);
        if idx == positions.len() {
            idx = 0;
        }
        state
            .store
            .owner(positions[idx])
            .map(|node| node.to_string())
            .ok_or(RingError::Empty)
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// True when the ring holds no virtual nodes.
    pub fn is_empty(&self) -> bool {
        self.state.read().store.vnode_count() == 0
    }

    /// True when `node` is a registered physical node.
    pub fn contains(&self, node: &str) -> bool {
        self.state.read().store.contains(node)
    }

    /// Number of physical nodes.
    pub fn node_count(&self) -> usize {
        self.state.read().store.node_count()
    }

    /// Number of virtual nodes.
    pub fn vnode_count(&self) -> usize {
        self.state.read().store.vnode_count()
    }

    /// Physical node identifiers, sorted.
    pub fn nodes(&self) -> Vec<String> {
        let state = self.state.read();
        let mut nodes: Vec<String> = state.store.node_names().map(|n| n.to_string()).collect();
        nodes.sort_unstable();
        nodes
    }

    /// Copy of the sorted position sequence.
    pub fn positions(&self) -> Vec<u32> {
        self.state.read().store.positions().to_vec()
    }

    /// Sorted positions owned by `node`, or `None` if it is not registered.
    pub fn positions_of(&self, node: &str) -> Option<Vec<u32>> {
        self.state.read().store.node_positions(node).map(<[u32]>::to_vec)
    }

    /// Virtual nodes per physical node.
    pub fn replicas(&self) -> u16 {
        self.state.read().replicas
    }

    /// Name of the configured hasher.
    pub fn hasher_name(&self) -> &'static str {
        self.state.read().hasher.name()
    }

    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.state.read().store.is_consistent()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS)
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("HashRing")
            .field("replicas", &state.replicas)
            .field("hasher", &state.hasher.name())
            .field("nodes", &state.store.node_count())
            .field("vnodes", &state.store.vnode_count())
            .finish()
    }
}

/// Diagnostic dump: counts, then every `position: node` pair in ring order.
impl fmt::Display for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        let store = &state.store;
        writeln!(
            f,
            "HashRing: vnode count = {}, node count = {}",
            store.vnode_count(),
            store.node_count()
        )?;
        for &position in store.positions() {
            if let Some(node) = store.owner(position) {
                writeln!(f, "{position:#010x}: {node}")?;
            }
        }
        Ok(())
    }
}

/// Builder for a pre-seeded ring.
///
/// ```rust
/// use segring::{RingBuilder, Xxh32};
///
/// let ring = RingBuilder::new()
///     .with_replicas(8)
///     .with_hasher(Xxh32)
///     .add_node("node1")
///     .add_node("node2")
///     .build()
///     .unwrap();
/// assert_eq!(ring.vnode_count(), 16);
/// ```
pub struct RingBuilder {
    replicas: u16,
    hasher: Arc<dyn Hasher32>,
    nodes: Vec<String>,
}

impl RingBuilder {
    /// Builder with default replicas and CRC-32.
    pub fn new() -> Self {
        Self {
            replicas: DEFAULT_REPLICAS,
            hasher: default_hasher(),
            nodes: Vec::new(),
        }
    }

    pub fn with_replicas(mut self, replicas: u16) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn with_hasher<H: Hasher32>(mut self, hasher: H) -> Self {
        self.hasher = Arc::new(hasher);
        self
    }

    /// Takes replicas and hasher from `config`.
    pub fn with_config(mut self, config: &RingConfig) -> Self {
        self.replicas = config.replicas;
        self.hasher = config.hasher.build();
        self
    }

    pub fn add_node(mut self, node: impl Into<String>) -> Self {
        self.nodes.push(node.into());
        self
    }

    pub fn add_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes.extend(nodes.into_iter().map(Into::into));
        self
    }

    /// Builds the ring. Fails with [`RingError::Full`] like [`HashRing::add`].
    pub fn build(self) -> Result<HashRing> {
        let ring = HashRing::from_parts(self.replicas, self.hasher);
        ring.add(&self.nodes)?;
        Ok(ring)
    }
}

impl Default for RingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RingBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuilder")
            .field("replicas", &self.replicas)
            .field("hasher", &self.hasher.name())
            .field("nodes", &self.nodes)
            .finish()
    }
}
