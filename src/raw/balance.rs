//! Structural balancing: the eager rebuild and the per-column step used by balancing cursors.
//!
//! The canonical shape puts the `i`-th element (1-based) on `1 + trailing_zeros(i)` levels, so
//! level `k` holds every `2^(k-1)`-th element. Both paths below produce exactly that shape.

use tracing::debug;

use super::handle::Handle;
use super::node::Node;
use super::raw_skip_list::{LevelBuf, RawSkipList};

impl<K, V> RawSkipList<K, V> {
    /// Rebuilds every level above level 0 into the canonical shape. Does nothing if already balanced.
    pub(crate) fn balance(&mut self) {
        if self.balanced {
            return;
        }
        self.balanced = true;
        let Some(head) = self.head else {
            return;
        };

        // Strip the upper levels down to their sentinels; those sentinels become the per-level tails.
        let mut tails = LevelBuf::new();
        let mut sentinel = head;
        while let Some(down) = self.nodes.get(sentinel).down {
            let mut current = self.nodes.get_mut(sentinel).next.take();
            while let Some(node) = current {
                current = self.nodes.take(node).next;
            }
            tails.push(sentinel);
            sentinel = down;
        }
        tails.reverse();

        let mut current = self.nodes.get(sentinel).next;
        let mut index = 1;
        while let Some(node) = current {
            let Node { payload, next, .. } = *self.nodes.get(node);
            self.nodes.get_mut(node).up = None;
            if let Some(payload) = payload {
                let mut below = node;
                for tail in tails.iter_mut().take(self.balanced_height(index) - 1) {
                    let upper = self.link_after(*tail, payload, Some(below));
                    self.nodes.get_mut(below).up = Some(upper);
                    *tail = upper;
                    below = upper;
                }
            }
            current = next;
            index += 1;
        }

        debug!(len = self.len, levels = self.levels, nodes = self.nodes.len(), "rebalanced");
    }

    /// Brings one column to the canonical height for the element at `index` (0-based).
    ///
    /// Taller columns lose their excess top nodes; shorter ones grow through [`Self::insert_above`].
    pub(crate) fn balance_column(&mut self, node: Handle, index: usize) {
        let desired = self.balanced_height(index + 1);
        let mut top = node;
        let mut height = 1;
        while let Some(up) = self.nodes.get(top).up {
            if height == desired {
                self.erase_above(top);
                return;
            }
            top = up;
            height += 1;
        }
        if height < desired {
            self.insert_above(top, desired - height, top);
        }
    }

    /// Grows the column whose top node is `lower` by up to `remaining` levels.
    ///
    /// The predecessor on each new level is found by walking left from `current` until a node with
    /// an `up` link appears, then climbing it. Stops early at the top level.
    pub(super) fn insert_above(&mut self, mut current: Handle, mut remaining: usize, mut lower: Handle) {
        let Some(payload) = self.nodes.get(lower).payload else {
            return;
        };
        while remaining > 0 {
            let prev = loop {
                let node = self.nodes.get(current);
                if let Some(up) = node.up {
                    break up;
                }
                match node.prev {
                    Some(prev) => current = prev,
                    // Walked into the top sentinel: no higher level exists.
                    None => return,
                }
            };
            let upper = self.link_after(prev, payload, Some(lower));
            self.nodes.get_mut(lower).up = Some(upper);
            current = prev;
            lower = upper;
            remaining -= 1;
        }
    }

    /// Removes every node above `node` in its column, topmost first.
    pub(super) fn erase_above(&mut self, node: Handle) {
        let mut column = LevelBuf::new();
        let mut current = self.nodes.get_mut(node).up.take();
        while let Some(upper) = current {
            column.push(upper);
            current = self.nodes.get(upper).up;
        }
        for &upper in column.iter().rev() {
            self.unlink(upper);
        }
    }

    /// Records that a balancing sweep has visited every element.
    pub(crate) fn mark_balanced(&mut self) {
        if !self.balanced {
            self.balanced = true;
            debug!(len = self.len, levels = self.levels, "balancing sweep completed");
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::raw_skip_list::Duplicates;
    use super::*;

    fn filled(len: i32, seed: u64) -> RawSkipList<i32, i32> {
        let mut list = RawSkipList::new(Duplicates::Reject, seed);
        for key in 0..len {
            list.insert((key * 37) % len, || key);
        }
        list
    }

    fn canonical(list: &RawSkipList<i32, i32>) -> Vec<usize> {
        (1..=list.len()).map(|index| list.balanced_height(index)).collect()
    }

    #[test]
    fn eager_balance_builds_canonical_shape() {
        let mut list = filled(100, 1);
        assert!(!list.is_balanced());
        list.balance();
        assert!(list.is_balanced());
        assert_eq!(list.heights(), canonical(&list));
        list.validate_invariants();
    }

    #[test]
    fn balancing_twice_changes_nothing() {
        let mut list = filled(64, 2);
        list.balance();
        let nodes = list.node_count();
        let heights = list.heights();
        list.balance();
        assert_eq!((list.node_count(), list.heights()), (nodes, heights));
    }

    #[test]
    fn column_steps_match_eager_balance() {
        let mut stepped = filled(200, 3);
        let mut eager = filled(200, 3);
        let handles: Vec<Handle> = stepped.handles().collect();
        for (index, node) in handles.into_iter().enumerate() {
            stepped.balance_column(node, index);
        }
        eager.balance();
        assert_eq!(stepped.heights(), eager.heights());
        assert_eq!(stepped.node_count(), eager.node_count());
        stepped.mark_balanced();
        stepped.validate_invariants();
    }

    #[test]
    fn insert_above_stops_at_the_top_level() {
        let mut list = filled(3, 4);
        let node = list.find(&1).unwrap();
        list.erase_above(node);
        list.insert_above(node, 10, node);
        assert_eq!(list.heights()[1], list.levels());
        list.validate_invariants();
    }

    #[test]
    fn erase_above_leaves_a_single_node() {
        let mut list = filled(31, 5);
        list.balance();
        let node = list.find(&15).unwrap();
        assert_eq!(list.heights()[15], 5);
        list.erase_above(node);
        assert_eq!(list.heights()[15], 1);
        assert_eq!(list.node(node).up, None);
        list.balanced = false;
        list.validate_invariants();
    }
}
