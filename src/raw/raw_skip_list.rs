use core::borrow::Borrow;
use core::cmp::Ordering;
use core::ops::{Bound, RangeBounds};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use smallvec::SmallVec;
use tracing::trace;

use super::arena::Arena;
use super::handle::Handle;
use super::node::Node;

/// Scratch buffer holding one handle per level.
///
/// Level counts never exceed the bit width of a handle, so this stays inline.
pub(crate) type LevelBuf = SmallVec<[Handle; 32]>;

/// Whether equivalent keys may coexist.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Duplicates {
    Reject,
    Allow,
}

/// Where a hinted insert ends up after checking the hint against its neighbours.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum HintFit {
    /// The hint is good: link directly after this bottom-level node (`None` when the list is empty).
    After(Option<Handle>),
    /// An equivalent key already exists (unique keys only).
    Blocked(Handle),
    /// Fall back to a search that lands after any equivalent keys.
    UpperBound,
    /// Fall back to a search that lands before any equivalent keys.
    LowerBound,
}

/// The node graph behind both public containers.
///
/// Level 0 links every element in order; each level above links a subset of the one below. Every
/// level starts at a sentinel, and the sentinels form a column of their own with `head` on top.
/// Payloads live in their own arena, one slot per column, so upper-level nodes never own data.
pub(crate) struct RawSkipList<K, V> {
    pub(super) nodes: Arena<Node>,
    pub(super) pairs: Arena<(K, V)>,
    /// Top sentinel; `None` exactly when there are no levels.
    pub(super) head: Option<Handle>,
    /// First element on level 0.
    pub(super) first: Option<Handle>,
    /// Last element on level 0.
    pub(super) last: Option<Handle>,
    pub(super) len: usize,
    pub(super) levels: usize,
    pub(super) count_min: usize,
    pub(super) count_max: usize,
    pub(super) balanced: bool,
    duplicates: Duplicates,
    rng: SmallRng,
}

/// Smallest element count that still needs `levels` levels.
const fn count_min_for(levels: usize) -> usize {
    if levels == 0 { 0 } else { 1 << (levels - 1) }
}

/// Largest element count `levels` levels can hold.
const fn count_max_for(levels: usize) -> usize {
    if levels >= usize::BITS as usize { usize::MAX } else { (1 << levels) - 1 }
}

impl<K, V> RawSkipList<K, V> {
    pub(crate) fn new(duplicates: Duplicates, seed: u64) -> Self {
        Self::from_parts(duplicates, Arena::new(), Arena::new(), SmallRng::seed_from_u64(seed))
    }

    pub(crate) fn with_capacity(duplicates: Duplicates, capacity: usize, seed: u64) -> Self {
        Self::from_parts(
            duplicates,
            // A column averages two nodes; sentinels are few enough to ignore.
            Arena::with_capacity(capacity.saturating_mul(2)),
            Arena::with_capacity(capacity),
            SmallRng::seed_from_u64(seed),
        )
    }

    const fn from_parts(duplicates: Duplicates, nodes: Arena<Node>, pairs: Arena<(K, V)>, rng: SmallRng) -> Self {
        Self {
            nodes,
            pairs,
            head: None,
            first: None,
            last: None,
            len: 0,
            levels: 0,
            count_min: 0,
            count_max: 0,
            balanced: true,
            duplicates,
            rng,
        }
    }

    /// Builds a canonically balanced list from pairs that are already in order.
    pub(crate) fn from_sorted<I>(duplicates: Duplicates, rng: SmallRng, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let pairs = pairs.into_iter();
        let (lower, _) = pairs.size_hint();
        let mut list =
            Self::from_parts(duplicates, Arena::with_capacity(lower.saturating_mul(2)), Arena::with_capacity(lower), rng);

        let mut tail = None;
        for pair in pairs {
            let prev = match tail {
                Some(tail) => tail,
                None => {
                    list.add_level();
                    list.bottom_sentinel().expect("`RawSkipList::from_sorted()` - missing bottom sentinel!")
                }
            };
            let payload = list.pairs.alloc(pair);
            let node = list.link_after(prev, payload, None);
            if list.first.is_none() {
                list.first = Some(node);
            }
            tail = Some(node);
            list.len += 1;
        }
        list.last = tail;

        // floor(log2(len)) + 1 levels puts len inside [count_min, count_max].
        let levels = (usize::BITS - list.len.leading_zeros()) as usize;
        while list.levels < levels {
            list.add_level();
        }
        list.balanced = false;
        list.balance();
        list
    }

    /// Returns the number of elements.
    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of levels, counting level 0.
    #[inline]
    pub(crate) const fn levels(&self) -> usize {
        self.levels
    }

    #[inline]
    pub(crate) const fn count_min(&self) -> usize {
        self.count_min
    }

    #[inline]
    pub(crate) const fn count_max(&self) -> usize {
        self.count_max
    }

    #[inline]
    pub(crate) const fn is_balanced(&self) -> bool {
        self.balanced
    }

    #[inline]
    pub(crate) const fn head(&self) -> Option<Handle> {
        self.head
    }

    #[inline]
    pub(crate) const fn first(&self) -> Option<Handle> {
        self.first
    }

    #[inline]
    pub(crate) const fn last(&self) -> Option<Handle> {
        self.last
    }

    pub(crate) fn capacity(&self) -> usize {
        self.pairs.capacity()
    }

    /// Number of nodes on every level, sentinels included.
    pub(crate) const fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub(crate) fn node(&self, handle: Handle) -> &Node {
        self.nodes.get(handle)
    }

    /// Returns the payload slot of a non-sentinel node.
    #[inline]
    fn payload(&self, node: Handle) -> Handle {
        self.nodes.get(node).payload.expect("`RawSkipList::payload()` - node is a sentinel!")
    }

    #[inline]
    pub(crate) fn key(&self, node: Handle) -> &K {
        &self.pairs.get(self.payload(node)).0
    }

    #[inline]
    pub(crate) fn key_value(&self, node: Handle) -> (&K, &V) {
        let (key, value) = self.pairs.get(self.payload(node));
        (key, value)
    }

    #[inline]
    pub(crate) fn key_value_mut(&mut self, node: Handle) -> (&K, &mut V) {
        let payload = self.payload(node);
        let (key, value) = self.pairs.get_mut(payload);
        (key, value)
    }

    /// Returns whether two nodes belong to the same column.
    pub(crate) fn same_payload(&self, a: Handle, b: Handle) -> bool {
        let (a, b) = (self.nodes.get(a).payload, self.nodes.get(b).payload);
        a.is_some() && a == b
    }

    /// Returns the sentinel heading level 0.
    pub(crate) fn bottom_sentinel(&self) -> Option<Handle> {
        let mut current = self.head?;
        while let Some(down) = self.nodes.get(current).down {
            current = down;
        }
        Some(current)
    }

    /// Returns the element before `node` on level 0, or `None` if `node` is the first element.
    #[inline]
    pub(crate) fn predecessor(&self, node: Handle) -> Option<Handle> {
        self.nodes.get(node).prev.filter(|&prev| !self.nodes.get(prev).is_sentinel())
    }

    #[inline]
    pub(crate) fn successor(&self, node: Handle) -> Option<Handle> {
        self.nodes.get(node).next
    }

    #[inline]
    pub(crate) fn is_first(&self, node: Handle) -> bool {
        self.first == Some(node)
    }

    /// Level-0 nodes in order.
    pub(crate) fn handles(&self) -> impl Iterator<Item = Handle> + '_ {
        core::iter::successors(self.first, |&node| self.nodes.get(node).next)
    }

    /// Reads a node through a raw pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawSkipList<K, V>`.
    /// - No mutable reference to the node arena may be live.
    #[inline]
    pub(crate) unsafe fn node_at(ptr: *const Self, handle: Handle) -> Node {
        // SAFETY: Caller guarantees `ptr` is valid; only the `nodes` field is borrowed.
        unsafe { *(*core::ptr::addr_of!((*ptr).nodes)).get(handle) }
    }

    /// Returns the payload of a level-0 node through a raw pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawSkipList<K, V>`.
    /// - No other reference to this payload may be live for `'a`.
    #[inline]
    pub(crate) unsafe fn pair_mut_at<'a>(ptr: *mut Self, node: Handle) -> &'a mut (K, V) {
        // SAFETY: Caller guarantees `ptr` is valid and the payload is not aliased. The nodes arena and
        // the payload arena are separate fields, so reading one never touches the other.
        unsafe {
            let payload = Self::node_at(ptr, node).payload.expect("`RawSkipList::pair_mut_at()` - node is a sentinel!");
            Arena::slot_mut(core::ptr::addr_of_mut!((*ptr).pairs), payload)
        }
    }

    /// Removes every element and every level. The random generator keeps its state.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.pairs.clear();
        self.head = None;
        self.first = None;
        self.last = None;
        self.len = 0;
        self.set_levels(0);
        self.balanced = true;
    }

    /// Moves every element out in order, leaving the list empty.
    pub(crate) fn drain_to_vec(&mut self) -> Vec<(K, V)> {
        let mut entries = Vec::with_capacity(self.len);
        let mut current = self.first;
        while let Some(node) = current {
            let Node { payload, next, .. } = *self.nodes.get(node);
            if let Some(payload) = payload {
                entries.push(self.pairs.take(payload));
            }
            current = next;
        }
        self.clear();
        entries
    }

    // ─── Level manager ───────────────────────────────────────────────────────

    fn set_levels(&mut self, levels: usize) {
        self.levels = levels;
        self.count_min = count_min_for(levels);
        self.count_max = count_max_for(levels);
    }

    /// Draws a column height from the geometric distribution P(height >= k) = 2^-(k-1), capped at
    /// the current level count.
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn choose_level(&mut self) -> usize {
        let r: f64 = self.rng.gen_range(0.0..1.0);
        if r == 0.0 {
            return self.levels;
        }
        let level = (r.ln() / 0.5_f64.ln()) as usize + 1;
        level.min(self.levels)
    }

    /// Stacks an empty level on top.
    pub(super) fn add_level(&mut self) {
        let sentinel = self.nodes.alloc(Node::sentinel(self.head));
        if let Some(head) = self.head {
            self.nodes.get_mut(head).up = Some(sentinel);
        }
        self.head = Some(sentinel);
        self.set_levels(self.levels + 1);
        trace!(levels = self.levels, len = self.len, "added level");
    }

    /// Drops the top level along with every node on it.
    fn remove_level(&mut self) {
        let Some(head) = self.head else {
            return;
        };
        let below = self.nodes.get(head).down;
        let mut current = Some(head);
        while let Some(node) = current {
            let Node { next, down, .. } = self.nodes.take(node);
            if let Some(down) = down {
                self.nodes.get_mut(down).up = None;
            }
            current = next;
        }
        self.head = below;
        self.set_levels(self.levels - 1);
        trace!(levels = self.levels, len = self.len, "removed level");
    }

    fn shrink_levels(&mut self) {
        while self.len < self.count_min {
            self.remove_level();
        }
    }

    /// Column height of the `index`-th element (1-based) in the canonical shape.
    ///
    /// Index 0 stands for the sentinel column, which spans every level.
    pub(crate) const fn balanced_height(&self, index: usize) -> usize {
        if index == 0 { self.levels } else { index.trailing_zeros() as usize + 1 }
    }

    // ─── Linking ─────────────────────────────────────────────────────────────

    /// Links a new node for `payload` right after `prev` on `prev`'s level.
    pub(super) fn link_after(&mut self, prev: Handle, payload: Handle, down: Option<Handle>) -> Handle {
        let next = self.nodes.get(prev).next;
        let node = self.nodes.alloc(Node::linked(payload, prev, next, down));
        self.nodes.get_mut(prev).next = Some(node);
        if let Some(next) = next {
            self.nodes.get_mut(next).prev = Some(node);
        }
        node
    }

    /// Unlinks `node` from its level and frees it, returning its links.
    pub(super) fn unlink(&mut self, node: Handle) -> Node {
        let removed = self.nodes.take(node);
        if let Some(prev) = removed.prev {
            self.nodes.get_mut(prev).next = removed.next;
        }
        if let Some(next) = removed.next {
            self.nodes.get_mut(next).prev = removed.prev;
        }
        removed
    }

    /// Inserts a new element directly after `after` on level 0, then grows its column to a random
    /// height. `None` means the list is empty.
    fn insert_after<G>(&mut self, after: Option<Handle>, key: K, make_value: G) -> Handle
    where
        G: FnOnce() -> V,
    {
        let payload = self.pairs.alloc((key, make_value()));
        self.len += 1;
        self.balanced = false;

        let mut height = self.choose_level();
        if self.len > self.count_max {
            self.add_level();
            height = self.levels;
        }

        let after = match after {
            Some(after) => after,
            None => self.bottom_sentinel().expect("`RawSkipList::insert_after()` - missing bottom sentinel!"),
        };
        let node = self.link_after(after, payload, None);
        if self.nodes.get(node).next.is_none() {
            self.last = Some(node);
        }
        if self.nodes.get(after).is_sentinel() {
            self.first = Some(node);
        }
        if height > 1 {
            self.insert_above(after, height - 1, node);
        }
        node
    }

    // ─── Erasure by position ─────────────────────────────────────────────────

    /// Removes the element at a level-0 node and returns the following node with the removed pair.
    ///
    /// # Panics
    ///
    /// Panics if `node` is a sentinel or not on level 0.
    pub(crate) fn remove_at(&mut self, node: Handle) -> (Option<Handle>, (K, V)) {
        let Node { payload, down, .. } = *self.nodes.get(node);
        let Some(payload) = payload else {
            panic!("`RawSkipList::remove_at()` - cannot remove a sentinel!");
        };
        assert!(down.is_none(), "`RawSkipList::remove_at()` - node is not on level 0!");

        self.erase_above(node);
        let Node { prev, next, .. } = self.unlink(node);
        if next.is_none() {
            self.last = prev;
        }
        if self.first == Some(node) {
            self.first = next;
        }
        let pair = self.pairs.take(payload);

        self.len -= 1;
        if self.len == 0 {
            self.last = None;
        }
        // An empty list is trivially in canonical shape.
        self.balanced = self.len == 0;
        self.shrink_levels();
        (next, pair)
    }
}

impl<K: Ord, V> RawSkipList<K, V> {
    // ─── Search ──────────────────────────────────────────────────────────────

    /// Descends from the top, moving right until `stop` accepts the next key or the level ends, and
    /// returns the level-0 node where the descent finished (possibly the bottom sentinel).
    fn descend<F>(&self, mut stop: F) -> Option<Handle>
    where
        F: FnMut(&K) -> bool,
    {
        let mut current = self.head?;
        loop {
            let node = self.nodes.get(current);
            match node.next {
                Some(next) if !stop(self.key(next)) => current = next,
                _ => match node.down {
                    Some(down) => current = down,
                    None => return Some(current),
                },
            }
        }
    }

    /// Returns the first element not less than `key`.
    pub(crate) fn lower_bound<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let prev = self.descend(|node| key.cmp(node.borrow()) != Ordering::Greater)?;
        self.nodes.get(prev).next
    }

    /// Returns the first element greater than `key`.
    pub(crate) fn upper_bound<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let prev = self.descend(|node| key.cmp(node.borrow()) == Ordering::Less)?;
        self.nodes.get(prev).next
    }

    /// Returns the first level-0 element equivalent to `key`.
    pub(crate) fn find<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.lower_bound(key).filter(|&node| self.matches(node, key))
    }

    /// Returns the highest node of the first column met on the way down whose key is `key`.
    fn find_top<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.head?;
        loop {
            let node = self.nodes.get(current);
            if let Some(next) = node.next {
                match key.cmp(self.key(next).borrow()) {
                    Ordering::Greater => {
                        current = next;
                        continue;
                    }
                    Ordering::Equal => return Some(next),
                    Ordering::Less => {}
                }
            }
            current = node.down?;
        }
    }

    /// Returns whether `node` is an element with a key equivalent to `key`.
    fn matches<Q>(&self, node: Handle, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.nodes.get(node).payload.is_some_and(|payload| key.cmp(self.pairs.get(payload).0.borrow()) == Ordering::Equal)
    }

    /// Counts the elements equivalent to `key`.
    pub(crate) fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        core::iter::successors(self.find(key), |&node| self.nodes.get(node).next)
            .take_while(|&node| self.matches(node, key))
            .count()
    }

    /// Resolves `range` to a half-open span of level-0 nodes: the first element inside it and the
    /// first element past it (`None` for past-the-end).
    ///
    /// # Panics
    /// Panics if the start bound is greater than the end bound, or if both are equal and excluded.
    pub(crate) fn span<Q, R>(&self, range: &R) -> (Option<Handle>, Option<Handle>)
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        R: RangeBounds<Q>,
    {
        if let (Bound::Included(start) | Bound::Excluded(start), Bound::Included(end) | Bound::Excluded(end)) =
            (range.start_bound(), range.end_bound())
        {
            let valid = if matches!(range.start_bound(), Bound::Excluded(_))
                && matches!(range.end_bound(), Bound::Excluded(_))
            {
                start < end
            } else {
                start <= end
            };
            assert!(valid, "range start is greater than range end in skip list");
        }
        let start = match range.start_bound() {
            Bound::Included(key) => self.lower_bound(key),
            Bound::Excluded(key) => self.upper_bound(key),
            Bound::Unbounded => self.first,
        };
        let end = match range.end_bound() {
            Bound::Included(key) => self.upper_bound(key),
            Bound::Excluded(key) => self.lower_bound(key),
            Bound::Unbounded => None,
        };
        (start, end)
    }

    // ─── Insertion ───────────────────────────────────────────────────────────

    /// Inserts by searching from the top, placing the new element after any equivalent ones.
    ///
    /// With unique keys an equivalent element blocks the insert: `make_value` is not called and the
    /// blocking node is returned with `false`.
    pub(crate) fn insert<G>(&mut self, key: K, make_value: G) -> (Handle, bool)
    where
        G: FnOnce() -> V,
    {
        self.insert_by_search(key, make_value, |key, node| key < node)
    }

    /// Inserts using `hint` as the would-be successor (`None` for past-the-end).
    ///
    /// A good hint links the element in O(1) amortized; a bad one falls back to a full search.
    pub(crate) fn insert_hinted<G>(&mut self, hint: Option<Handle>, key: K, make_value: G) -> (Handle, bool)
    where
        G: FnOnce() -> V,
    {
        let after = match hint {
            Some(hint) => self.nodes.get(hint).prev,
            None => self.last,
        };
        match self.hint_fit(hint, after, &key) {
            HintFit::After(after) => (self.insert_after(after, key, make_value), true),
            HintFit::Blocked(node) => (node, false),
            HintFit::UpperBound => {
                trace!(len = self.len, "hint missed, searching for upper bound");
                self.insert_by_search(key, make_value, |key, node| key < node)
            }
            HintFit::LowerBound => {
                trace!(len = self.len, "hint missed, searching for lower bound");
                self.insert_by_search(key, make_value, |key, node| key <= node)
            }
        }
    }

    fn hint_fit(&self, before: Option<Handle>, after: Option<Handle>, key: &K) -> HintFit {
        let after_key = after.and_then(|after| self.nodes.get(after).payload.map(|payload| (after, &self.pairs.get(payload).0)));
        match self.duplicates {
            Duplicates::Reject => match before {
                Some(before) if self.key(before) < key => HintFit::UpperBound,
                Some(before) if self.key(before) == key => HintFit::Blocked(before),
                _ => match after_key {
                    Some((_, after_key)) if key < after_key => HintFit::UpperBound,
                    Some((after, after_key)) if key == after_key => HintFit::Blocked(after),
                    _ => HintFit::After(after),
                },
            },
            // A wrong hint lands as close to the hint as the order allows.
            Duplicates::Allow => match (before, after_key) {
                (_, Some((_, after_key))) if key < after_key => HintFit::UpperBound,
                (Some(before), _) if self.key(before) < key => HintFit::LowerBound,
                _ => HintFit::After(after),
            },
        }
    }

    /// Top-down insert. `stop(new_key, node_key)` decides when to step down a level.
    fn insert_by_search<F, G>(&mut self, key: K, make_value: G, mut stop: F) -> (Handle, bool)
    where
        F: FnMut(&K, &K) -> bool,
        G: FnOnce() -> V,
    {
        let mut height = self.choose_level();
        if self.len + 1 > self.count_max {
            self.add_level();
            height = self.levels;
        }

        // Predecessors on every level the new column will occupy, top first.
        let mut predecessors = LevelBuf::new();
        let mut current = self.head.expect("`RawSkipList::insert_by_search()` - list has no levels!");
        let mut level = self.levels;
        loop {
            let node = *self.nodes.get(current);
            match node.next {
                Some(next) if !stop(&key, self.key(next)) => current = next,
                _ => {
                    if level <= height {
                        predecessors.push(current);
                    }
                    match node.down {
                        Some(down) => {
                            current = down;
                            level -= 1;
                        }
                        None => break,
                    }
                }
            }
        }

        let blocked = self.duplicates == Duplicates::Reject
            && self.nodes.get(current).payload.is_some_and(|payload| self.pairs.get(payload).0 >= key);
        if blocked {
            // Undo a level added for an element that never arrived.
            self.shrink_levels();
            return (current, false);
        }

        let payload = self.pairs.alloc((key, make_value()));
        let bottom = self.link_after(current, payload, None);
        let mut below = bottom;
        for &prev in predecessors.iter().rev().skip(1) {
            let node = self.link_after(prev, payload, Some(below));
            self.nodes.get_mut(below).up = Some(node);
            below = node;
        }

        if self.nodes.get(current).is_sentinel() {
            self.first = Some(bottom);
        }
        if self.nodes.get(bottom).next.is_none() {
            self.last = Some(bottom);
        }
        self.len += 1;
        self.balanced = false;
        (bottom, true)
    }

    // ─── Erasure by key ──────────────────────────────────────────────────────

    /// Removes every element equivalent to `key` and returns how many were removed.
    pub(crate) fn remove_key<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut target = self.find_top(key);
        let mut removed = 0;

        while let Some(node) = target {
            let on_bottom = self.nodes.get(node).down.is_none();
            target = self.nodes.get(node).down;

            // Equivalent keys are adjacent, so the run around `node` covers all of them on this level.
            let mut start = node;
            while let Some(prev) = self.nodes.get(start).prev.filter(|&prev| self.matches(prev, key)) {
                start = prev;
            }
            let mut end = node;
            while let Some(next) = self.nodes.get(end).next.filter(|&next| self.matches(next, key)) {
                end = next;
            }

            let before = self.nodes.get(start).prev;
            let after = self.nodes.get(end).next;
            if let Some(before) = before {
                self.nodes.get_mut(before).next = after;
            }
            if let Some(after) = after {
                self.nodes.get_mut(after).prev = before;
            }

            let mut current = Some(start);
            while let Some(doomed) = current {
                let Node { payload, next, .. } = self.nodes.take(doomed);
                if on_bottom {
                    if let Some(payload) = payload {
                        self.pairs.free(payload);
                    }
                    removed += 1;
                }
                current = if doomed == end { None } else { next };
            }

            if on_bottom {
                if before.is_some_and(|before| self.nodes.get(before).is_sentinel()) {
                    self.first = after;
                }
                if after.is_none() {
                    self.last = before;
                }
            }
        }

        self.len -= removed;
        if self.len == 0 {
            self.first = None;
            self.last = None;
        }
        if removed > 0 {
            self.balanced = self.len == 0;
        }
        self.shrink_levels();
        removed
    }
}

impl<K: Clone, V: Clone> Clone for RawSkipList<K, V> {
    /// Copies into the canonical shape regardless of the source's structure.
    fn clone(&self) -> Self {
        Self::from_sorted(
            self.duplicates,
            self.rng.clone(),
            self.handles().map(|node| {
                let (key, value) = self.key_value(node);
                (key.clone(), value.clone())
            }),
        )
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    impl<K: Ord + core::fmt::Debug, V> RawSkipList<K, V> {
        /// Walks the whole graph and panics with every broken invariant it finds.
        pub(crate) fn validate_invariants(&self) {
            let mut errors: Vec<String> = Vec::new();

            if self.levels == 0 {
                if self.head.is_some() || self.len != 0 || self.first.is_some() || self.last.is_some() {
                    errors.push("no levels but head, len or ends are set".into());
                }
            } else if !(self.count_min <= self.len && self.len <= self.count_max) {
                errors.push(format!("len {} outside [{}, {}]", self.len, self.count_min, self.count_max));
            }

            let mut sentinel = self.head;
            let mut level = self.levels;
            let mut upper_keys: Option<Vec<Handle>> = None;
            while let Some(s) = sentinel {
                let node = self.nodes.get(s);
                if node.payload.is_some() || node.prev.is_some() {
                    errors.push(format!("level {level}: sentinel has a payload or prev link"));
                }
                let mut columns = Vec::new();
                let mut prev = s;
                let mut current = node.next;
                while let Some(n) = current {
                    let here = self.nodes.get(n);
                    if here.prev != Some(prev) {
                        errors.push(format!("level {level}: prev link of {n:?} does not point back"));
                    }
                    if let Some(up) = here.up {
                        if self.nodes.get(up).down != Some(n) || !self.same_payload(up, n) {
                            errors.push(format!("level {level}: broken up link at {n:?}"));
                        }
                    }
                    if let Some(down) = here.down {
                        if self.nodes.get(down).up != Some(n) || !self.same_payload(down, n) {
                            errors.push(format!("level {level}: broken down link at {n:?}"));
                        }
                    }
                    if !self.nodes.get(prev).is_sentinel() {
                        let ordering = self.key(prev).cmp(self.key(n));
                        let in_order = match self.duplicates {
                            Duplicates::Reject => ordering == Ordering::Less,
                            Duplicates::Allow => ordering != Ordering::Greater,
                        };
                        if !in_order {
                            errors.push(format!("level {level}: {:?} before {:?}", self.key(prev), self.key(n)));
                        }
                    }
                    columns.push(self.nodes.get(n).payload.unwrap());
                    prev = n;
                    current = here.next;
                }
                if let Some(upper) = &upper_keys {
                    if !upper.iter().all(|payload| columns.contains(payload)) {
                        errors.push(format!("level {level} is not a superset of the level above"));
                    }
                }
                if node.down.is_none() {
                    if columns.len() != self.len {
                        errors.push(format!("level 0 holds {} elements, len is {}", columns.len(), self.len));
                    }
                    if self.last != (if self.len == 0 { None } else { Some(prev) }) {
                        errors.push("last does not match the end of level 0".into());
                    }
                    if self.first != node.next {
                        errors.push("first does not match the start of level 0".into());
                    }
                }
                upper_keys = Some(columns);
                sentinel = node.down;
                level = level.saturating_sub(1);
            }

            if self.balanced {
                for (index, node) in self.handles().enumerate() {
                    let mut height = 1;
                    let mut top = node;
                    while let Some(up) = self.nodes.get(top).up {
                        height += 1;
                        top = up;
                    }
                    if height != self.balanced_height(index + 1) {
                        errors.push(format!("flagged balanced but element {index} has height {height}"));
                    }
                }
            }

            assert!(errors.is_empty(), "Skip list invariant violations:\n{}", errors.join("\n"));
        }

        pub(crate) fn keys(&self) -> Vec<K>
        where
            K: Clone,
        {
            self.handles().map(|node| self.key(node).clone()).collect()
        }

        pub(crate) fn heights(&self) -> Vec<usize> {
            self.handles()
                .map(|node| core::iter::successors(Some(node), |&n| self.nodes.get(n).up).count())
                .collect()
        }
    }

    fn unique() -> RawSkipList<i32, i32> {
        RawSkipList::new(Duplicates::Reject, 7)
    }

    #[test]
    fn thresholds_follow_level_count() {
        assert_eq!((count_min_for(0), count_max_for(0)), (0, 0));
        assert_eq!((count_min_for(1), count_max_for(1)), (1, 1));
        assert_eq!((count_min_for(3), count_max_for(3)), (4, 7));
        assert_eq!(count_max_for(usize::BITS as usize), usize::MAX);
    }

    #[test]
    fn balanced_height_counts_trailing_zeros() {
        let mut list = unique();
        for key in 0..7 {
            list.insert(key, || key);
        }
        assert_eq!(list.levels(), 3);
        let heights: Vec<usize> = (0..=8).map(|index| list.balanced_height(index)).collect();
        assert_eq!(heights, vec![3, 1, 2, 1, 3, 1, 2, 1, 4]);
    }

    #[test]
    fn chosen_level_stays_within_level_count() {
        let mut list = unique();
        list.add_level();
        list.add_level();
        list.add_level();
        for _ in 0..1_000 {
            let level = list.choose_level();
            assert!((1..=3).contains(&level));
        }
    }

    #[test]
    fn levels_grow_and_shrink_at_thresholds() {
        let mut list = unique();
        let mut expected = Vec::new();
        for key in 0..8 {
            list.insert(key, || 0);
            expected.push(list.levels());
        }
        assert_eq!(expected, vec![1, 2, 2, 3, 3, 3, 3, 4]);

        list.remove_key(&0);
        assert_eq!(list.levels(), 3);
        for key in 1..5 {
            list.remove_key(&key);
        }
        assert_eq!((list.len(), list.levels()), (3, 2));
        for key in 5..8 {
            list.remove_key(&key);
        }
        assert_eq!((list.len(), list.levels(), list.head(), list.first(), list.last()), (0, 0, None, None, None));
        assert_eq!(list.node_count(), 0);
    }

    #[test]
    fn rejected_duplicate_leaves_no_trace() {
        let mut list = unique();
        for key in [1, 2, 3] {
            list.insert(key, || key * 10);
        }
        let nodes = list.node_count();
        let levels = list.levels();
        // A fourth element would add a level; the duplicate must not.
        let (blocking, inserted) = list.insert(2, || unreachable!("value built for a rejected key"));
        assert!(!inserted);
        assert_eq!(list.key_value(blocking), (&2, &20));
        assert_eq!((list.node_count(), list.levels(), list.len()), (nodes, levels, 3));
        list.validate_invariants();
    }

    #[test]
    fn hinted_insert_at_end_appends() {
        let mut list = unique();
        for key in 0..100 {
            let (_, inserted) = list.insert_hinted(None, key, || key);
            assert!(inserted);
        }
        list.validate_invariants();
        assert_eq!(list.keys(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn wrong_hint_still_sorts() {
        let mut list = unique();
        for key in (0..50).rev() {
            list.insert_hinted(None, key, || key);
        }
        let hint = list.find(&10);
        list.insert_hinted(hint, 60, || 60);
        list.insert_hinted(hint, -1, || -1);
        let (blocking, inserted) = list.insert_hinted(hint, 10, || 0);
        assert!(!inserted);
        assert_eq!(Some(blocking), hint);
        list.validate_invariants();
        assert_eq!(list.len(), 52);
    }

    #[test]
    fn hinted_duplicates_land_next_to_the_hint() {
        let mut list = RawSkipList::new(Duplicates::Allow, 3);
        for value in 0..3 {
            list.insert(1, || value);
            list.insert(5, || value);
        }
        let first_five = list.find(&5);
        let second_five = first_five.and_then(|node| list.successor(node));

        // Too high: the new 1 joins the end of the run of 1s.
        let (node, inserted) = list.insert_hinted(second_five, 1, || 100);
        assert!(inserted);
        assert_eq!(list.successor(node), first_five);
        assert_eq!(list.key_value(list.predecessor(node).unwrap()), (&1, &2));

        // Too low: the new 5 joins the start of the run of 5s.
        let hint = list.find(&1);
        let (node, _) = list.insert_hinted(hint, 5, || 200);
        assert_eq!(list.successor(node), first_five);
        assert_eq!(list.key_value(list.predecessor(node).unwrap()), (&1, &100));
        list.validate_invariants();
    }

    #[test]
    fn remove_at_relinks_neighbours() {
        let mut list = unique();
        for key in 0..20 {
            list.insert(key, || key);
        }
        list.balance();
        let node = list.find(&10).unwrap();
        let (next, pair) = list.remove_at(node);
        assert_eq!(pair, (10, 10));
        let next = next.unwrap();
        assert_eq!(list.key(next), &11);
        assert_eq!(list.key(list.predecessor(next).unwrap()), &9);
        assert_eq!(list.find(&10), None);
        assert!(!list.is_balanced());
        list.validate_invariants();
    }

    #[test]
    #[should_panic(expected = "`RawSkipList::remove_at()` - cannot remove a sentinel!")]
    fn removing_a_sentinel_panics() {
        let mut list = unique();
        list.insert(1, || 1);
        let sentinel = list.bottom_sentinel().unwrap();
        list.remove_at(sentinel);
    }

    #[test]
    fn remove_key_takes_every_duplicate() {
        let mut list = RawSkipList::new(Duplicates::Allow, 11);
        for value in 0..20 {
            list.insert(7, || value);
            list.insert(value, || value);
        }
        assert_eq!(list.count(&7), 21);
        assert_eq!(list.remove_key(&7), 21);
        assert_eq!(list.len(), 19);
        assert_eq!(list.find(&7), None);
        list.validate_invariants();
    }

    #[test]
    fn clone_is_balanced() {
        let mut list = unique();
        for key in [5, 3, 9, 1, 7, 2, 8] {
            list.insert(key, || key);
        }
        let copy = list.clone();
        assert!(copy.is_balanced());
        assert_eq!(copy.levels(), 3);
        assert_eq!(copy.keys(), list.keys());
        copy.validate_invariants();
    }

    #[test]
    fn drain_empties_the_list() {
        let mut list = unique();
        for key in [3, 1, 2] {
            list.insert(key, || key * 2);
        }
        assert_eq!(list.drain_to_vec(), vec![(1, 2), (2, 4), (3, 6)]);
        assert!(list.is_empty());
        assert_eq!(list.node_count(), 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn random_mutations_keep_invariants(
            seed in any::<u64>(),
            ops in prop::collection::vec((any::<bool>(), 0..64_i32), 0..400),
        ) {
            let mut list = RawSkipList::new(Duplicates::Reject, seed);
            let mut model = std::collections::BTreeSet::new();
            for (insert, key) in ops {
                if insert {
                    let (_, inserted) = list.insert(key, || key);
                    prop_assert_eq!(inserted, model.insert(key));
                } else {
                    let removed = list.remove_key(&key);
                    prop_assert_eq!(removed, usize::from(model.remove(&key)));
                }
            }
            list.validate_invariants();
            prop_assert_eq!(list.keys(), model.into_iter().collect::<Vec<_>>());
        }

        #[test]
        fn hinted_multi_inserts_keep_invariants(
            seed in any::<u64>(),
            keys in prop::collection::vec(0..16_i32, 0..300),
            hints in prop::collection::vec(any::<prop::sample::Index>(), 300),
        ) {
            let mut list = RawSkipList::new(Duplicates::Allow, seed);
            for (key, hint) in keys.iter().zip(&hints) {
                let handles: Vec<Handle> = list.handles().collect();
                let hint = if handles.is_empty() { None } else { handles.get(hint.index(handles.len() + 1)).copied() };
                list.insert_hinted(hint, *key, || 0);
            }
            list.validate_invariants();
            let mut sorted = keys.clone();
            sorted.sort_unstable();
            prop_assert_eq!(list.keys(), sorted);
        }
    }
}
