//! Ring store: the three collections behind the lock.
//!
//! - `positions`: every virtual-node position, sorted ascending once a public
//!   operation returns.
//! - `owners`: position -> physical node.
//! - `nodes`: physical node -> the positions it owns.
//!
//! `owners` and `nodes` are a dual index and change together. `positions`
//! mirrors the key set of `owners`; it may be unsorted between the internal
//! primitives below but [`RingStore::sort`] always runs before the write lock
//! is released.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::config::DEFAULT_CAPACITY;
use crate::hasher::Hasher32;
use crate::placement::Segments;

#[derive(Debug, Default)]
pub(crate) struct RingStore {
    positions: Vec<u32>,
    owners: HashMap<u32, Arc<str>>,
    nodes: HashMap<Arc<str>, Vec<u32>>,
}

impl RingStore {
    pub(crate) fn new() -> Self {
        Self {
            positions: Vec::with_capacity(DEFAULT_CAPACITY),
            owners: HashMap::new(),
            nodes: HashMap::new(),
        }
    }

    pub(crate) fn contains(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn vnode_count(&self) -> usize {
        self.owners.len()
    }

    pub(crate) fn positions(&self) -> &[u32] {
        &self.positions
    }

    pub(crate) fn owner(&self, position: u32) -> Option<&Arc<str>> {
        self.owners.get(&position)
    }

    pub(crate) fn node_positions(&self, node: &str) -> Option<&[u32]> {
        self.nodes.get(node).map(Vec::as_slice)
    }

    pub(crate) fn node_names(&self) -> impl Iterator<Item = &Arc<str>> {
        self.nodes.keys()
    }

    /// Places the virtual nodes of every node not yet present.
    ///
    /// Leaves `positions` unsorted; the caller must [`sort`](Self::sort).
    pub(crate) fn insert_nodes<'a, I>(&mut self, nodes: I, replicas: u16, hasher: &dyn Hasher32)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let segments = Segments::new(replicas);
        for node in nodes {
            if self.nodes.contains_key(node) {
                continue;
            }
            let name: Arc<str> = Arc::from(node);
            let mut owned = Vec::with_capacity(usize::from(replicas));
            for index in 0..replicas {
                let owners = &self.owners;
                match segments.place(hasher, node, index, |p| owners.contains_key(&p)) {
                    Some(position) => {
                        self.owners.insert(position, Arc::clone(&name));
                        self.positions.push(position);
                        owned.push(position);
                    }
                    None => {
                        debug!(node, index, "virtual node dropped after collision retries");
                    }
                }
            }
            owned.sort_unstable();
            self.nodes.insert(name, owned);
        }
    }

    /// Drops every listed node and its virtual nodes. Absent nodes are
    /// ignored. Returns how many nodes were removed.
    ///
    /// Filters `positions` in one pass, which keeps its relative order.
    pub(crate) fn remove_nodes<'a, I>(&mut self, nodes: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut removed = HashSet::new();
        let mut count = 0;
        for node in nodes {
            if let Some(owned) = self.nodes.remove(node) {
                for position in owned {
                    self.owners.remove(&position);
                    removed.insert(position);
                }
                count += 1;
            }
        }
        if !removed.is_empty() {
            self.positions.retain(|p| !removed.contains(p));
        }
        count
    }

    pub(crate) fn sort(&mut self) {
        self.positions.sort_unstable();
    }

    pub(crate) fn clear(&mut self) {
        self.positions = Vec::with_capacity(DEFAULT_CAPACITY);
        self.owners.clear();
        self.nodes.clear();
    }

    /// Checks that the three collections agree and `positions` is sorted.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        if self.positions.len() != self.owners.len() {
            return false;
        }
        if !self.positions.windows(2).all(|w| w[0] < w[1]) {
            return false;
        }
        if !self.positions.iter().all(|p| self.owners.contains_key(p)) {
            return false;
        }
        let indexed: usize = self.nodes.values().map(Vec::len).sum();
        if indexed != self.owners.len() {
            return false;
        }
        self.nodes.iter().all(|(node, owned)| {
            owned
                .iter()
                .all(|p| self.owners.get(p).is_some_and(|owner| owner == node))
        })
    }
}
