//! Read-only access to the node graph behind a container.
//!
//! Nothing here can change the structure, so it is safe to use for checking invariants in tests or
//! for looking at the level layout while debugging:
//!
//! ```
//! use balanced_skiplist::SkipMap;
//!
//! let mut map: SkipMap<u32, ()> = (1..=7).map(|key| (key, ())).collect();
//! map.balance();
//! let structure = map.structure();
//! assert_eq!(structure.levels(), 3);
//! assert_eq!(structure.heights(), [1, 2, 1, 3, 1, 2, 1]);
//! print!("{}", structure.render());
//! //  2 |       4
//! //  1 |   2   4   6
//! //  0 | 1 2 3 4 5 6 7
//! ```

use core::fmt;
use core::ptr;

use crate::raw::{Handle, RawSkipList};

/// A read-only view of a container's levels.
pub struct Structure<'a, K, V> {
    raw: &'a RawSkipList<K, V>,
}

impl<'a, K, V> Structure<'a, K, V> {
    pub(crate) const fn new(raw: &'a RawSkipList<K, V>) -> Self {
        Self { raw }
    }

    /// Number of levels, counting level 0. Zero for an empty container.
    #[must_use]
    pub const fn levels(&self) -> usize {
        self.raw.levels()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Smallest element count the current level count allows: `2^(levels - 1)`.
    #[must_use]
    pub const fn count_min(&self) -> usize {
        self.raw.count_min()
    }

    /// Largest element count the current level count allows: `2^levels - 1`.
    #[must_use]
    pub const fn count_max(&self) -> usize {
        self.raw.count_max()
    }

    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        self.raw.is_balanced()
    }

    /// Number of nodes on all levels, sentinels included.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.raw.node_count()
    }

    /// The sentinel heading the top level.
    #[must_use]
    pub fn top_sentinel(&self) -> Option<NodeRef<'a, K, V>> {
        self.raw.head().map(|handle| NodeRef::new(self.raw, handle))
    }

    /// The sentinel heading level 0.
    #[must_use]
    pub fn bottom_sentinel(&self) -> Option<NodeRef<'a, K, V>> {
        self.raw.bottom_sentinel().map(|handle| NodeRef::new(self.raw, handle))
    }

    /// The first element on level 0.
    #[must_use]
    pub fn first(&self) -> Option<NodeRef<'a, K, V>> {
        self.raw.first().map(|handle| NodeRef::new(self.raw, handle))
    }

    /// The last element on level 0.
    #[must_use]
    pub fn last(&self) -> Option<NodeRef<'a, K, V>> {
        self.raw.last().map(|handle| NodeRef::new(self.raw, handle))
    }

    /// Column height of every element, in order.
    #[must_use]
    pub fn heights(&self) -> Vec<usize> {
        self.raw.handles().map(|handle| NodeRef::new(self.raw, handle).height()).collect()
    }

    /// Draws the levels top to bottom, one line each, with every key in its own column.
    #[must_use]
    pub fn render(&self) -> String
    where
        K: fmt::Display,
    {
        let labels: Vec<String> = self.raw.handles().map(|handle| self.raw.key(handle).to_string()).collect();
        let heights = self.heights();
        let mut out = String::new();
        for level in (0..self.levels()).rev() {
            out.push_str(&format!("{level:>2} |"));
            for (label, &height) in labels.iter().zip(&heights) {
                if height > level {
                    out.push(' ');
                    out.push_str(label);
                } else {
                    out.push_str(&" ".repeat(label.chars().count() + 1));
                }
            }
            out.truncate(out.trim_end().len());
            out.push('\n');
        }
        out
    }
}

impl<K, V> fmt::Debug for Structure<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Structure")
            .field("levels", &self.levels())
            .field("len", &self.len())
            .field("nodes", &self.node_count())
            .field("balanced", &self.is_balanced())
            .finish()
    }
}

/// One node of the graph: a sentinel, or one level of an element's column.
pub struct NodeRef<'a, K, V> {
    raw: &'a RawSkipList<K, V>,
    handle: Handle,
}

impl<'a, K, V> NodeRef<'a, K, V> {
    const fn new(raw: &'a RawSkipList<K, V>, handle: Handle) -> Self {
        Self { raw, handle }
    }

    fn link(&self, link: Option<Handle>) -> Option<Self> {
        link.map(|handle| Self::new(self.raw, handle))
    }

    #[must_use]
    pub fn next(&self) -> Option<Self> {
        self.link(self.raw.node(self.handle).next)
    }

    #[must_use]
    pub fn prev(&self) -> Option<Self> {
        self.link(self.raw.node(self.handle).prev)
    }

    #[must_use]
    pub fn up(&self) -> Option<Self> {
        self.link(self.raw.node(self.handle).up)
    }

    #[must_use]
    pub fn down(&self) -> Option<Self> {
        self.link(self.raw.node(self.handle).down)
    }

    /// Sentinels head each level and are the only nodes without a `prev` link.
    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.raw.node(self.handle).is_sentinel()
    }

    #[must_use]
    pub fn key(&self) -> Option<&'a K> {
        self.key_value().map(|(key, _)| key)
    }

    #[must_use]
    pub fn value(&self) -> Option<&'a V> {
        self.key_value().map(|(_, value)| value)
    }

    /// The element this node belongs to; `None` for sentinels.
    #[must_use]
    pub fn key_value(&self) -> Option<(&'a K, &'a V)> {
        let raw = self.raw;
        if self.is_sentinel() { None } else { Some(raw.key_value(self.handle)) }
    }

    /// Returns `true` if both nodes belong to the same element's column.
    #[must_use]
    pub fn shares_payload_with(&self, other: &Self) -> bool {
        ptr::eq(self.raw, other.raw) && self.raw.same_payload(self.handle, other.handle)
    }

    /// Number of nodes from this one to the top of its column, inclusive.
    #[must_use]
    pub fn height(&self) -> usize {
        core::iter::successors(Some(self.handle), |&handle| self.raw.node(handle).up).count()
    }
}

impl<K, V> Clone for NodeRef<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for NodeRef<'_, K, V> {}

impl<K, V> PartialEq for NodeRef<'_, K, V> {
    /// Node identity, not key equality.
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.raw, other.raw) && self.handle == other.handle
    }
}

impl<K, V> Eq for NodeRef<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for NodeRef<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key_value() {
            Some((key, value)) => f.debug_tuple("NodeRef").field(key).field(value).finish(),
            None => f.write_str("NodeRef(sentinel)"),
        }
    }
}
