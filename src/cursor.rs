//! Positions inside a container.
//!
//! A [`Cursor`] only reads. A [`CursorMut`] can also edit the container, and while it walks it
//! rebalances the columns it passes over. Once a `CursorMut` has swept from the first element to
//! past-the-end (or back), the container is in the same shape [`SkipMap::balance`] would give it.
//!
//! Both kinds sit either on an element or at the past-the-end position.
//!
//! [`SkipMap::balance`]: crate::SkipMap::balance

use core::fmt;
use core::ptr;

use crate::raw::{Handle, RawSkipList};

/// A read-only cursor over a [`SkipMap`](crate::SkipMap) or [`SkipMultiMap`](crate::SkipMultiMap).
///
/// # Examples
///
/// ```
/// use balanced_skiplist::SkipMap;
///
/// let map = SkipMap::from([(1, "a"), (2, "b"), (3, "c")]);
/// let mut cursor = map.find(&2);
/// assert_eq!(cursor.key_value(), Some((&2, &"b")));
/// cursor.move_next();
/// assert_eq!(cursor.key(), Some(&3));
/// cursor.move_next();
/// assert!(cursor.is_end());
/// // Stepping back from past-the-end lands on the last element.
/// cursor.move_prev();
/// assert_eq!(cursor.key(), Some(&3));
/// ```
pub struct Cursor<'a, K, V> {
    raw: &'a RawSkipList<K, V>,
    current: Option<Handle>,
}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(crate) const fn new(raw: &'a RawSkipList<K, V>, current: Option<Handle>) -> Self {
        Self { raw, current }
    }

    /// Returns `true` at the past-the-end position.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.current.is_none()
    }

    #[must_use]
    pub fn key(&self) -> Option<&'a K> {
        self.key_value().map(|(key, _)| key)
    }

    #[must_use]
    pub fn value(&self) -> Option<&'a V> {
        self.key_value().map(|(_, value)| value)
    }

    #[must_use]
    pub fn key_value(&self) -> Option<(&'a K, &'a V)> {
        let raw = self.raw;
        self.current.map(|node| raw.key_value(node))
    }

    /// Moves to the next element, or to past-the-end from the last element.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is already past-the-end.
    pub fn move_next(&mut self) {
        let Some(node) = self.current else {
            panic!("`Cursor::move_next()` - cursor is past the end!");
        };
        self.current = self.raw.successor(node);
    }

    /// Moves to the previous element. From past-the-end this is the last element.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is on the first element, or the container is empty.
    pub fn move_prev(&mut self) {
        self.current = Some(match self.current {
            None => self.raw.last().expect("`Cursor::move_prev()` - container is empty!"),
            Some(node) => self.raw.predecessor(node).expect("`Cursor::move_prev()` - cursor is at the first element!"),
        });
    }
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Cursor<'_, K, V> {}

impl<K, V> PartialEq for Cursor<'_, K, V> {
    /// Two cursors are equal when they sit at the same position of the same container.
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.raw, other.raw) && self.current == other.current
    }
}

impl<K, V> Eq for Cursor<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.key_value()).finish()
    }
}

/// Where a balancing sweep began.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Start {
    Beginning,
    End,
    /// Somewhere else, or the sweep was interrupted by an edit.
    Elsewhere,
}

/// A cursor that can edit its container and rebalances it while moving.
///
/// Before each step the cursor resizes the column it is leaving to its canonical height, which
/// needs the element's index. Cursors from [`cursor_front_mut`] and [`cursor_back_mut`] know their
/// index from the start; cursors from lookups or inserts only learn it on reaching either end, and
/// do not rebalance until then. A sweep that runs from one end to the other marks the container
/// balanced, after which the cursor stops rebalancing.
///
/// [`cursor_front_mut`]: crate::SkipMap::cursor_front_mut
/// [`cursor_back_mut`]: crate::SkipMap::cursor_back_mut
///
/// # Examples
///
/// ```
/// use balanced_skiplist::SkipMap;
///
/// let mut map: SkipMap<u32, u32> = (0..100).map(|i| (i, i)).collect();
/// map.insert(1_000, 0);
/// assert!(!map.is_balanced());
///
/// let mut cursor = map.cursor_front_mut();
/// while let Some(value) = cursor.value_mut() {
///     *value += 1;
///     cursor.move_next();
/// }
/// assert!(map.is_balanced());
/// ```
pub struct CursorMut<'a, K, V> {
    raw: &'a mut RawSkipList<K, V>,
    current: Option<Handle>,
    index: Option<usize>,
    balancing: bool,
    start: Start,
}

impl<'a, K, V> CursorMut<'a, K, V> {
    /// Creates a cursor at a position with a known index: the first element (0) or past-the-end (len).
    pub(crate) fn indexed(raw: &'a mut RawSkipList<K, V>, current: Option<Handle>, index: usize) -> Self {
        let start = match current {
            None => Start::End,
            Some(node) if raw.is_first(node) => Start::Beginning,
            Some(_) => Start::Elsewhere,
        };
        let balancing = !raw.is_balanced();
        Self {
            raw,
            current,
            index: Some(index),
            balancing,
            start,
        }
    }

    /// Creates a cursor whose index is only known if it sits at either end.
    pub(crate) fn unindexed(raw: &'a mut RawSkipList<K, V>, current: Option<Handle>) -> Self {
        let mut cursor = Self {
            raw,
            current,
            index: None,
            balancing: false,
            start: Start::Elsewhere,
        };
        cursor.locate();
        cursor
    }

    /// Learns the index when sitting at either end, and arms balancing for a sweep from there.
    fn locate(&mut self) {
        let (index, start) = match self.current {
            None => (self.raw.len(), Start::End),
            Some(node) if self.raw.is_first(node) => (0, Start::Beginning),
            Some(_) => return,
        };
        self.index = Some(index);
        self.start = start;
        self.balancing = !self.raw.is_balanced();
    }

    fn finish_sweep(&mut self) {
        self.balancing = false;
        self.raw.mark_balanced();
    }

    fn balance_column(&mut self, node: Handle) {
        if let Some(index) = self.index.filter(|_| self.balancing) {
            self.raw.balance_column(node, index);
        }
    }

    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.current.is_none()
    }

    /// Returns the position of the current element in sorted order, if the cursor knows it.
    ///
    /// Past-the-end reports the container's length.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    /// Returns `true` while moving the cursor rebalances the container.
    #[must_use]
    pub const fn is_balancing(&self) -> bool {
        self.balancing
    }

    #[must_use]
    pub fn key(&self) -> Option<&K> {
        self.current.map(|node| self.raw.key(node))
    }

    #[must_use]
    pub fn value(&self) -> Option<&V> {
        self.current.map(|node| self.raw.key_value(node).1)
    }

    #[must_use]
    pub fn key_value(&self) -> Option<(&K, &V)> {
        self.current.map(|node| self.raw.key_value(node))
    }

    pub fn value_mut(&mut self) -> Option<&mut V> {
        let node = self.current?;
        Some(self.raw.key_value_mut(node).1)
    }

    pub fn key_value_mut(&mut self) -> Option<(&K, &mut V)> {
        let node = self.current?;
        Some(self.raw.key_value_mut(node))
    }

    /// Converts the cursor into a mutable reference to the current value, with the container's lifetime.
    #[must_use]
    pub fn into_value_mut(self) -> Option<&'a mut V> {
        let Self { raw, current, .. } = self;
        Some(raw.key_value_mut(current?).1)
    }

    /// Returns a read-only cursor at the same position.
    #[must_use]
    pub fn as_cursor(&self) -> Cursor<'_, K, V> {
        Cursor::new(&*self.raw, self.current)
    }

    /// Moves to the next element, or to past-the-end from the last element.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is already past-the-end.
    pub fn move_next(&mut self) {
        let Some(node) = self.current else {
            panic!("`CursorMut::move_next()` - cursor is past the end!");
        };
        self.balance_column(node);
        self.current = self.raw.successor(node);
        self.index = self.index.map(|index| index + 1);

        if self.current.is_none() {
            if self.balancing && self.start == Start::Beginning {
                self.finish_sweep();
            } else if self.index.is_none() {
                self.locate();
            }
        }
    }

    /// Moves to the previous element. From past-the-end this is the last element.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is on the first element, or the container is empty.
    pub fn move_prev(&mut self) {
        let node = match self.current {
            None => self.raw.last().expect("`CursorMut::move_prev()` - container is empty!"),
            Some(node) => self.raw.predecessor(node).expect("`CursorMut::move_prev()` - cursor is at the first element!"),
        };
        self.current = Some(node);
        self.index = self.index.map(|index| index - 1);

        if self.index.is_none() {
            self.locate();
            return;
        }
        self.balance_column(node);
        if self.balancing && self.start == Start::End && self.raw.is_first(node) {
            self.finish_sweep();
        }
    }

    /// Removes the current element and moves to the one after it, which takes over its index.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is past-the-end.
    pub fn remove_current(&mut self) -> (K, V) {
        let Some(node) = self.current else {
            panic!("`CursorMut::remove_current()` - cursor is past the end!");
        };
        let (next, pair) = self.raw.remove_at(node);
        self.current = next;
        self.start = Start::Elsewhere;
        if self.index.is_none() {
            self.locate();
        }
        pair
    }
}

impl<K: Ord, V> CursorMut<'_, K, V> {
    /// Inserts using the current position as a hint for where `key` belongs, right before the cursor.
    ///
    /// The cursor moves to the inserted element, or with unique keys to the element that blocked
    /// the insert. Returns whether the element was inserted. A wrong hint costs a full search but
    /// never misplaces the element.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let mut map = SkipMap::from([(1, "a"), (5, "e")]);
    /// let mut cursor = map.find_mut(&5);
    /// assert!(cursor.insert_before(3, "c"));
    /// assert_eq!(cursor.key(), Some(&3));
    /// assert!(!cursor.insert_before(1, "z"));
    /// assert_eq!(cursor.key_value(), Some((&1, &"a")));
    /// ```
    pub fn insert_before(&mut self, key: K, value: V) -> bool {
        self.try_insert_before_with(key, || value)
    }

    /// Like [`insert_before`](Self::insert_before), but only builds the value if it is inserted.
    pub fn try_insert_before_with<F>(&mut self, key: K, make_value: F) -> bool
    where
        F: FnOnce() -> V,
    {
        let hint = self.current;
        let (node, inserted) = self.raw.insert_hinted(hint, key, make_value);
        self.current = Some(node);
        self.start = Start::Elsewhere;
        // Landing right before the hint means the new element took over the hint's index.
        if !inserted || self.raw.successor(node) != hint {
            self.index = None;
            self.balancing = false;
        }
        if self.index.is_none() {
            self.locate();
        }
        inserted
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for CursorMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorMut")
            .field("current", &self.key_value())
            .field("index", &self.index)
            .field("balancing", &self.balancing)
            .finish()
    }
}
