mod common;

use balanced_skiplist::{SkipMap, SkipMultiMap};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// Builds an unbalanced map by inserting `keys` one by one.
fn shuffled(keys: &[i32], seed: u64) -> SkipMap<i32, i32> {
    let mut map = SkipMap::with_seed(seed);
    for &key in keys {
        map.insert(key, key);
    }
    map
}

// ─── Eager balancing ─────────────────────────────────────────────────────────

#[test]
fn six_names_need_thirteen_nodes() {
    let mut map = SkipMap::new();
    for name in ["Alex", "Sarah", "Robbie", "River", "Eden", "David"] {
        map.insert(name, name.len());
    }
    map.balance();
    let structure = map.structure();
    assert_eq!(structure.levels(), 3);
    assert_eq!(structure.heights(), [1, 2, 1, 3, 1, 2]);
    assert_eq!(structure.node_count(), 13);
    common::validate(&structure, true);
}

#[test]
fn balancing_twice_changes_nothing() {
    let mut map = shuffled(&(0..500).rev().collect::<Vec<_>>(), 11);
    map.balance();
    let heights = map.structure().heights();
    let nodes = map.structure().node_count();
    map.balance();
    assert_eq!(map.structure().heights(), heights);
    assert_eq!(map.structure().node_count(), nodes);
    assert_eq!(heights, common::canonical_heights(500));
}

#[test]
fn balanced_map_renders_evenly() {
    let mut map: SkipMap<u8, ()> = (1..=7).map(|key| (key, ())).collect();
    map.balance();
    assert_eq!(map.structure().render(), " 2 |       4\n 1 |   2   4   6\n 0 | 1 2 3 4 5 6 7\n");
}

// ─── Lazy balancing through cursors ──────────────────────────────────────────

#[test]
fn forward_sweep_matches_eager_balance() {
    let keys: Vec<i32> = (0..1_000).map(|i| (i * 7_919) % 1_000).collect();
    let mut swept = shuffled(&keys, 5);
    let mut eager = shuffled(&keys, 5);

    swept.for_each(|_, value| *value += 1);
    eager.balance();

    assert!(swept.is_balanced());
    assert_eq!(swept.structure().heights(), eager.structure().heights());
    assert_eq!(swept.structure().node_count(), eager.structure().node_count());
    common::validate(&swept.structure(), true);
}

#[test]
fn backward_sweep_matches_eager_balance() {
    let keys: Vec<i32> = (0..777).map(|i| (i * 31) % 777).collect();
    let mut map = shuffled(&keys, 6);

    let mut cursor = map.cursor_back_mut();
    assert_eq!(cursor.index(), Some(777));
    while cursor.index() != Some(0) {
        cursor.move_prev();
    }
    assert!(!cursor.is_balancing());
    assert!(map.is_balanced());
    assert_eq!(map.structure().heights(), common::canonical_heights(777));
}

#[test]
fn read_only_traversal_leaves_structure_alone() {
    let keys: Vec<i32> = (0..300).map(|i| (i * 101) % 300).collect();
    let map = shuffled(&keys, 7);
    let heights = map.structure().heights();

    let mut count = 0;
    map.for_each_no_balance(|_, _| count += 1);
    let mut cursor = map.cursor_front();
    while !cursor.is_end() {
        cursor.move_next();
    }

    assert_eq!(count, 300);
    assert!(!map.is_balanced());
    assert_eq!(map.structure().heights(), heights);
}

#[test]
fn edits_during_a_sweep_keep_the_flag_down() {
    let mut map = shuffled(&(0..100).collect::<Vec<_>>(), 8);
    let mut cursor = map.cursor_front_mut();
    while let Some(&key) = cursor.key() {
        if key % 10 == 0 {
            cursor.remove_current();
        } else {
            cursor.move_next();
        }
    }
    assert_eq!(cursor.index(), Some(90));
    assert!(!map.is_balanced());
    assert_eq!(map.len(), 90);
    common::validate(&map.structure(), true);

    map.for_each(|_, _| {});
    assert!(map.is_balanced());
    common::validate(&map.structure(), true);
}

#[test]
fn lookup_cursor_balances_after_reaching_an_end() {
    let mut map = shuffled(&(0..64).rev().collect::<Vec<_>>(), 9);
    let mut cursor = map.find_mut(&40);
    assert_eq!(cursor.index(), None);
    assert!(!cursor.is_balancing());

    while !cursor.is_end() {
        cursor.move_next();
    }
    assert_eq!(cursor.index(), Some(64));
    assert!(cursor.is_balancing());

    for _ in 0..64 {
        cursor.move_prev();
    }
    assert_eq!(cursor.key(), Some(&0));
    assert!(map.is_balanced());
    common::validate(&map.structure(), true);
}

#[test]
fn balanced_map_cursors_do_not_rebalance() {
    let mut map: SkipMap<i32, i32> = (0..10).map(|k| (k, k)).collect();
    map.balance();
    let cursor = map.cursor_front_mut();
    assert!(!cursor.is_balancing());
}

// ─── Clone and level bounds ──────────────────────────────────────────────────

#[test]
fn clone_round_trips_into_canonical_shape() {
    let keys: Vec<i32> = (0..200).map(|i| (i * 13) % 200).collect();
    let map = shuffled(&keys, 10);
    let copy = map.clone();
    assert!(copy.is_balanced());
    assert_eq!(copy, map);
    assert_eq!(copy.structure().heights(), common::canonical_heights(200));
    assert_eq!(copy.structure().levels(), 8);

    let mut rebalanced = map;
    rebalanced.balance();
    assert_eq!(rebalanced.structure().heights(), copy.structure().heights());
}

#[test]
fn removing_the_middle_joins_its_neighbours() {
    let mut map: SkipMultiMap<i32, ()> = (0..20).map(|k| (k, ())).collect();
    map.balance();
    let mut cursor = map.find_mut(&10);
    cursor.remove_current();
    assert_eq!(cursor.key(), Some(&11));
    assert!(map.find(&10).is_end());
    assert_eq!(map.lower_bound(&10).key(), Some(&11));
    common::validate(&map.structure(), false);
}

#[test]
fn level_count_tracks_size() {
    let mut map = SkipMap::new();
    for key in 0..1_024 {
        map.insert(key, ());
        let structure = map.structure();
        assert!(structure.count_min() <= map.len() && map.len() <= structure.count_max());
    }
    assert_eq!(map.structure().levels(), 11);
    for key in 0..1_024 {
        map.erase(&key);
        let structure = map.structure();
        assert!(map.is_empty() || structure.count_min() <= map.len());
    }
    assert_eq!(map.structure().levels(), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Any sequence of inserts and removals followed by a sweep ends in the eager shape.
    #[test]
    fn sweep_after_random_edits_is_canonical(
        inserts in proptest::collection::vec(-500i32..500, 0..1_000),
        removals in proptest::collection::vec(-500i32..500, 0..500),
        seed in any::<u64>(),
    ) {
        let mut map = shuffled(&inserts, seed);
        for key in &removals {
            map.remove(key);
        }
        common::validate(&map.structure(), true);

        map.for_each(|_, _| {});
        prop_assert!(map.is_balanced());
        prop_assert_eq!(map.structure().heights(), common::canonical_heights(map.len()));
        common::validate(&map.structure(), true);
    }
}
