use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::{Index, RangeBounds};

use crate::config::{Config, DEFAULT_SEED};
use crate::cursor::{Cursor, CursorMut};
use crate::error::{Error, Result};
use crate::introspect::Structure;
use crate::iter::{IntoIter, IntoKeys, IntoValues, Iter, IterMut, Keys, Range, Values, ValuesMut};
use crate::raw::{Duplicates, RawSkipList};

/// An ordered multimap based on a skip list.
///
/// Works like [`SkipMap`](crate::SkipMap) except that any number of entries may share a key.
/// Entries with equivalent keys sit next to each other in the order they were inserted, unless a
/// hinted insert through [`CursorMut::insert_before`] placed them elsewhere within their run.
///
/// # Examples
///
/// ```
/// use balanced_skiplist::SkipMultiMap;
///
/// let mut shifts = SkipMultiMap::new();
/// shifts.insert("mon", "ana");
/// shifts.insert("tue", "bo");
/// shifts.insert("mon", "cy");
///
/// assert_eq!(shifts.count("mon"), 2);
/// let monday: Vec<_> = shifts.equal_range("mon").map(|(_, name)| *name).collect();
/// assert_eq!(monday, ["ana", "cy"]);
///
/// assert_eq!(shifts.erase("mon"), 2);
/// assert_eq!(shifts.len(), 1);
/// ```
pub struct SkipMultiMap<K, V> {
    raw: RawSkipList<K, V>,
}

impl<K, V> SkipMultiMap<K, V> {
    /// Makes a new, empty `SkipMultiMap` seeded with [`DEFAULT_SEED`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Makes a new, empty `SkipMultiMap` whose level generator starts from `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            raw: RawSkipList::new(Duplicates::Allow, seed),
        }
    }

    /// Makes a new, empty `SkipMultiMap` with room for at least `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`Config::max_capacity`].
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::with_config(Config::new().capacity(capacity)) {
            Ok(map) => map,
            Err(error) => panic!("`SkipMultiMap::with_capacity()` - {error}!"),
        }
    }

    /// Makes a new, empty `SkipMultiMap` from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the requested capacity is larger than a map can hold.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            raw: RawSkipList::with_capacity(Duplicates::Allow, config.capacity, config.seed),
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    #[must_use]
    pub const fn max_size(&self) -> usize {
        Config::max_capacity()
    }

    /// Returns `true` if the levels are in their canonical shape.
    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        self.raw.is_balanced()
    }

    /// Rebuilds the levels into their canonical shape. See [`SkipMap::balance`](crate::SkipMap::balance).
    pub fn balance(&mut self) {
        self.raw.balance();
    }

    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns the first entry; among equivalent keys, the earliest inserted.
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.first().map(|node| self.raw.key_value(node))
    }

    /// Returns the last entry; among equivalent keys, the latest inserted.
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.last().map(|node| self.raw.key_value(node))
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let node = self.raw.first()?;
        Some(self.raw.remove_at(node).1)
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let node = self.raw.last()?;
        Some(self.raw.remove_at(node).1)
    }

    #[must_use]
    pub fn cursor_front(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.raw, self.raw.first())
    }

    #[must_use]
    pub fn cursor_back(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.raw, None)
    }

    /// Returns a balancing cursor at the first element.
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, K, V> {
        let first = self.raw.first();
        CursorMut::indexed(&mut self.raw, first, 0)
    }

    /// Returns a balancing cursor past the last element.
    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, K, V> {
        let len = self.raw.len();
        CursorMut::indexed(&mut self.raw, None, len)
    }

    /// Calls `f` on every element in order, rebalancing the map along the way.
    pub fn for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V),
    {
        let mut cursor = self.cursor_front_mut();
        while let Some((key, value)) = cursor.key_value_mut() {
            f(key, value);
            cursor.move_next();
        }
    }

    /// Calls `f` on every element in order without touching the structure.
    pub fn for_each_no_balance<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        for (key, value) in self {
            f(key, value);
        }
    }

    #[must_use]
    pub const fn structure(&self) -> Structure<'_, K, V> {
        Structure::new(&self.raw)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.raw)
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.raw)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.iter(),
        }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.iter(),
        }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    pub fn into_keys(self) -> IntoKeys<K, V> {
        IntoKeys {
            inner: self.into_iter(),
        }
    }

    pub fn into_values(self) -> IntoValues<K, V> {
        IntoValues {
            inner: self.into_iter(),
        }
    }
}

impl<K: Ord, V> SkipMultiMap<K, V> {
    /// Inserts an entry after any entries with an equivalent key and returns a cursor at it.
    ///
    /// # Complexity
    ///
    /// O(log n) expected.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMultiMap;
    ///
    /// let mut map = SkipMultiMap::new();
    /// map.insert(1, 'a');
    /// let cursor = map.insert(1, 'b');
    /// assert_eq!(cursor.value(), Some(&'b'));
    /// assert_eq!(map.values().collect::<String>(), "ab");
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> CursorMut<'_, K, V> {
        let (node, _) = self.raw.insert(key, || value);
        CursorMut::unindexed(&mut self.raw, Some(node))
    }

    /// Inserts `V::default()` under `key` and returns a mutable reference to it.
    ///
    /// Unlike [`SkipMap::get_or_insert_default`](crate::SkipMap::get_or_insert_default) this always
    /// inserts. The new entry goes in front of any entries with an equivalent key, because the lower
    /// bound of `key` serves as the insert position.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMultiMap;
    ///
    /// let mut map = SkipMultiMap::from([(1, 5), (1, 6)]);
    /// *map.get_or_insert_default(1) += 9;
    /// assert_eq!(map.values().copied().collect::<Vec<i32>>(), [9, 5, 6]);
    /// ```
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let hint = self.raw.lower_bound(&key);
        let (node, _) = self.raw.insert_hinted(hint, key, V::default);
        self.raw.key_value_mut(node).1
    }

    /// Returns the value of the earliest entry equivalent to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.find(key).map(|node| self.raw.key_value(node))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let node = self.raw.find(key)?;
        Some(self.raw.key_value_mut(node).1)
    }

    /// Returns the value of the earliest entry equivalent to `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if no equivalent key is present.
    pub fn at<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if no equivalent key is present.
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.get_mut(key).ok_or(Error::KeyNotFound)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.find(key).is_some()
    }

    /// Returns the number of entries equivalent to `key`.
    ///
    /// # Complexity
    ///
    /// O(log n + k) expected, where k is the result.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.count(key)
    }

    /// Returns a cursor at the earliest entry equivalent to `key`, or past-the-end.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.find(key))
    }

    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let node = self.raw.find(key);
        CursorMut::unindexed(&mut self.raw, node)
    }

    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.lower_bound(key))
    }

    pub fn lower_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let node = self.raw.lower_bound(key);
        CursorMut::unindexed(&mut self.raw, node)
    }

    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.upper_bound(key))
    }

    pub fn upper_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let node = self.raw.upper_bound(key);
        CursorMut::unindexed(&mut self.raw, node)
    }

    /// Returns every entry equivalent to `key`, in insertion order.
    pub fn equal_range<Q>(&self, key: &Q) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Range::between(&self.raw, self.raw.lower_bound(key), self.raw.upper_bound(key))
    }

    /// Constructs a double-ended iterator over a sub-range of entries.
    ///
    /// # Panics
    ///
    /// Panics if range `start > end`, or if `start == end` and both bounds are `Excluded`.
    pub fn range<Q, R>(&self, range: R) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        R: RangeBounds<Q>,
    {
        let (start, end) = self.raw.span(&range);
        Range::between(&self.raw, start, end)
    }

    /// Removes every entry equivalent to `key` and returns how many were removed.
    ///
    /// # Complexity
    ///
    /// O(log n + k) expected, where k is the result.
    pub fn erase<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove_key(key)
    }

    /// Removes every entry in `range` and returns a cursor at the first entry after it.
    ///
    /// # Panics
    ///
    /// Panics if range `start > end`, or if `start == end` and both bounds are `Excluded`.
    pub fn remove_range<Q, R>(&mut self, range: R) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        R: RangeBounds<Q>,
    {
        let (mut current, end) = self.raw.span(&range);
        while let Some(node) = current.filter(|&node| Some(node) != end) {
            current = self.raw.remove_at(node).0;
        }
        CursorMut::unindexed(&mut self.raw, end)
    }
}

impl<K: Clone, V: Clone> Clone for SkipMultiMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
        }
    }
}

impl<K: Hash, V: Hash> Hash for SkipMultiMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for (k, v) in self {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for SkipMultiMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq> Eq for SkipMultiMap<K, V> {}

impl<K: PartialOrd, V: PartialOrd> PartialOrd for SkipMultiMap<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K: Ord, V: Ord> Ord for SkipMultiMap<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SkipMultiMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> Default for SkipMultiMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for SkipMultiMap<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for SkipMultiMap<K, V> {
    /// Appends with a past-the-end hint; equivalent keys keep their input order.
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.raw.insert_hinted(None, k, || v);
        }
    }
}

impl<'a, K: Ord + Copy, V: Copy> Extend<(&'a K, &'a V)> for SkipMultiMap<K, V> {
    fn extend<T: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<'a, K, V> IntoIterator for &'a SkipMultiMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut SkipMultiMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V> IntoIterator for SkipMultiMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(mut self) -> IntoIter<K, V> {
        IntoIter::new(self.raw.drain_to_vec())
    }
}

impl<K, Q, V> Index<&Q> for SkipMultiMap<K, V>
where
    K: Borrow<Q> + Ord,
    Q: ?Sized + Ord,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for SkipMultiMap<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}
