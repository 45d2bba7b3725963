//! Structural checks shared by the integration tests.

#![allow(dead_code)]

use core::fmt::Debug;

use balanced_skiplist::{NodeRef, Structure};

/// Column heights of a balanced container with `len` elements.
pub fn canonical_heights(len: usize) -> Vec<usize> {
    (1..=len).map(|index| index.trailing_zeros() as usize + 1).collect()
}

/// Walks every level through the read-only view and panics on the first broken invariant.
///
/// With `unique` set, keys must be strictly increasing on every level; otherwise non-decreasing.
pub fn validate<K: Ord + Debug, V: Debug>(structure: &Structure<'_, K, V>, unique: bool) {
    let levels = structure.levels();
    let len = structure.len();

    if len == 0 {
        assert_eq!(levels, 0, "empty container keeps levels");
        assert!(structure.top_sentinel().is_none());
        assert_eq!(structure.node_count(), 0);
        return;
    }
    assert!(
        (structure.count_min()..=structure.count_max()).contains(&len),
        "len {len} outside [{}, {}] for {levels} levels",
        structure.count_min(),
        structure.count_max()
    );
    assert_eq!(structure.count_min(), 1 << (levels - 1));
    assert_eq!(structure.count_max(), (1 << levels) - 1);

    let mut sentinel = structure.top_sentinel();
    let mut level = levels;
    let mut nodes = 0;
    let mut above: Option<Vec<NodeRef<'_, K, V>>> = None;
    while let Some(head) = sentinel {
        level -= 1;
        assert!(head.is_sentinel(), "level {level} starts with a sentinel");
        assert!(head.prev().is_none());
        assert!(head.key_value().is_none());
        if let Some(down) = head.down() {
            assert_eq!(down.up(), Some(head), "sentinel column links both ways");
        }

        let mut row = Vec::new();
        let mut previous = head;
        while let Some(node) = previous.next() {
            assert!(!node.is_sentinel(), "sentinel in the middle of level {level}");
            assert_eq!(node.prev(), Some(previous), "next/prev mismatch on level {level}");
            if let Some(prev_key) = previous.key() {
                let key = node.key().expect("element without a key");
                if unique {
                    assert!(prev_key < key, "level {level} out of order: {prev_key:?} then {key:?}");
                } else {
                    assert!(prev_key <= key, "level {level} out of order: {prev_key:?} then {key:?}");
                }
            }
            match node.down() {
                Some(down) => {
                    assert_eq!(down.up(), Some(node), "up/down mismatch on level {level}");
                    assert!(node.shares_payload_with(&down), "column payload differs on level {level}");
                }
                None => assert_eq!(level, 0, "element on level {level} has no down link"),
            }
            if let Some(up) = node.up() {
                assert_eq!(up.down(), Some(node));
            }
            row.push(node);
            previous = node;
        }

        // Every element above must also appear here, in the same order.
        if let Some(upper) = &above {
            let mut lowered = upper.iter().map(|node| node.down().expect("upper node without down link"));
            let mut expected = lowered.next();
            for node in &row {
                if expected == Some(*node) {
                    expected = lowered.next();
                }
            }
            assert!(expected.is_none(), "level {} is not a subsequence of level {level}", level + 1);
        }

        nodes += row.len() + 1;
        if level == 0 {
            assert_eq!(row.len(), len, "level 0 holds every element");
            assert!(head.down().is_none());
            assert_eq!(Some(head), structure.bottom_sentinel());
            assert_eq!(row.first().copied(), structure.first());
            assert_eq!(row.last().copied(), structure.last());
        }
        above = Some(row);
        sentinel = head.down();
    }
    assert_eq!(level, 0, "sentinel column is {levels} tall");
    assert_eq!(nodes, structure.node_count(), "unreachable nodes");

    let heights = structure.heights();
    assert!(heights.iter().all(|&height| (1..=levels).contains(&height)));
    assert_eq!(heights.iter().sum::<usize>() + levels, structure.node_count());
    if structure.is_balanced() {
        assert_eq!(heights, canonical_heights(len), "balanced flag set on an unbalanced shape");
    }
}
