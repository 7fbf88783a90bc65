//! Property tests for ring membership and lookup.

use std::collections::BTreeSet;

use proptest::prelude::*;
use segring::HashRing;

fn node_names() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,6}[0-9]{0,2}", 1..12)
}

fn sorted_distinct(nodes: &[String]) -> Vec<String> {
    nodes.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect()
}

// =============================================================================
// Property Tests - Determinism
// =============================================================================

proptest! {
    /// Property: Same key always resolves to the same registered node
    #[test]
    fn prop_lookup_is_stable(
        nodes in node_names(),
        replicas in 1u16..64,
        keys in prop::collection::vec(".{0,16}", 1..20)
    ) {
        let ring = HashRing::new(replicas);
        ring.add(&nodes).unwrap();

        for key in &keys {
            let first = ring.get(key).unwrap();
            prop_assert_eq!(&ring.get(key).unwrap(), &first);
            prop_assert!(nodes.contains(&first));
        }
    }

    /// Property: Rings built from the same membership agree on every key
    #[test]
    fn prop_insertion_order_independent(
        nodes in node_names(),
        replicas in 1u16..64,
        keys in prop::collection::vec(".{0,16}", 1..20)
    ) {
        let forward = HashRing::new(replicas);
        forward.add(&nodes).unwrap();

        let backward = HashRing::new(replicas);
        for node in nodes.iter().rev() {
            backward.add([node]).unwrap();
        }

        prop_assert_eq!(forward.nodes(), backward.nodes());
        prop_assert_eq!(forward.positions(), backward.positions());
        for key in &keys {
            prop_assert_eq!(forward.get(key).unwrap(), backward.get(key).unwrap());
        }
    }
}

// =============================================================================
// Property Tests - Membership
// =============================================================================

proptest! {
    /// Property: Re-adding present nodes changes nothing
    #[test]
    fn prop_add_is_idempotent(nodes in node_names(), replicas in 1u16..64) {
        let ring = HashRing::new(replicas);
        ring.add(&nodes).unwrap();
        let positions = ring.positions();

        ring.add(&nodes).unwrap();
        prop_assert_eq!(ring.positions(), positions);
        prop_assert_eq!(ring.nodes(), sorted_distinct(&nodes));
    }

    /// Property: Reset ends where remove-then-add ends
    #[test]
    fn prop_reset_equals_remove_then_add(
        start in node_names(),
        target in node_names(),
        replicas in 1u16..32
    ) {
        let via_reset = HashRing::new(replicas);
        via_reset.add(&start).unwrap();
        via_reset.reset(&target).unwrap();

        let manual = HashRing::new(replicas);
        manual.add(&start).unwrap();
        let stale: Vec<&String> = start.iter().filter(|n| !target.contains(n)).collect();
        manual.remove(stale);
        manual.add(&target).unwrap();

        prop_assert_eq!(via_reset.nodes(), sorted_distinct(&target));
        prop_assert_eq!(via_reset.nodes(), manual.nodes());
        prop_assert_eq!(via_reset.positions(), manual.positions());
    }

    /// Property: The position sequence stays sorted and accounted for
    #[test]
    fn prop_positions_sorted_and_owned(
        start in node_names(),
        dropped in node_names(),
        replicas in 1u16..32
    ) {
        let ring = HashRing::new(replicas);
        ring.add(&start).unwrap();
        ring.remove(&dropped);

        let positions = ring.positions();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(positions.len(), ring.vnode_count());

        let owned: usize = ring
            .nodes()
            .iter()
            .map(|n| ring.positions_of(n).map_or(0, |p| p.len()))
            .sum();
        prop_assert_eq!(owned, positions.len());
        prop_assert_eq!(ring.is_empty(), positions.is_empty());
    }
}
