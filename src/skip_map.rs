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

/// An ordered map based on a [skip list].
///
/// Given a key type with a [total order], the map stores its entries in key order and holds at most
/// one entry per key. Keys must implement [`Ord`].
///
/// Lookups descend from the top level, halving the remaining distance on each level when the list
/// is balanced. New elements get a random height, which keeps the expected cost logarithmic but
/// drifts from the ideal shape as the map is edited. [`SkipMap::balance`] restores the ideal shape
/// in one pass, and so does any full traversal with a [`CursorMut`] started at either end: each
/// step fixes the height of the element it leaves, so a loop that visits everything anyway pays
/// only a small constant per element to leave the map balanced.
///
/// It is a logic error for a key to be modified in such a way that the key's ordering relative to
/// any other key, as determined by the [`Ord`] trait, changes while it is in the map. The behavior
/// resulting from such a logic error is not specified, but will be encapsulated to the `SkipMap`
/// that observed it and not result in undefined behavior.
///
/// # Examples
///
/// ```
/// use balanced_skiplist::SkipMap;
///
/// let mut stock = SkipMap::new();
/// stock.insert("apples", 3);
/// stock.insert("pears", 0);
/// stock.insert("plums", 12);
///
/// // insert never overwrites; the returned cursor points at whatever holds the key.
/// let (cursor, inserted) = stock.insert("apples", 100);
/// assert!(!inserted);
/// assert_eq!(cursor.value(), Some(&3));
///
/// *stock.get_or_insert_default("kiwis") += 5;
/// assert_eq!(stock["kiwis"], 5);
///
/// // a full pass through a mutable cursor also rebalances the map.
/// stock.for_each(|_, count| *count *= 2);
/// assert!(stock.is_balanced());
/// assert_eq!(stock.values().copied().collect::<Vec<_>>(), [6, 10, 0, 24]);
/// ```
///
/// A `SkipMap` with a known list of items can be initialized from an array:
///
/// ```
/// use balanced_skiplist::SkipMap;
///
/// let solar_distance = SkipMap::from([
///     ("Mercury", 0.4),
///     ("Venus", 0.7),
///     ("Earth", 1.0),
///     ("Mars", 1.5),
/// ]);
/// assert_eq!(solar_distance.first_key_value(), Some((&"Earth", &1.0)));
/// ```
///
/// [skip list]: https://en.wikipedia.org/wiki/Skip_list
/// [total order]: https://en.wikipedia.org/wiki/Total_order
pub struct SkipMap<K, V> {
    raw: RawSkipList<K, V>,
}

impl<K, V> SkipMap<K, V> {
    /// Makes a new, empty `SkipMap` seeded with [`DEFAULT_SEED`].
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let mut map = SkipMap::new();
    /// map.insert(1, "a");
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    /// Makes a new, empty `SkipMap` whose level generator starts from `seed`.
    ///
    /// Two maps with the same seed given the same edits end up with the same structure.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            raw: RawSkipList::new(Duplicates::Reject, seed),
        }
    }

    /// Makes a new, empty `SkipMap` with room for at least `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` exceeds [`Config::max_capacity`]. Use [`SkipMap::with_config`] to get
    /// an error instead.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::with_config(Config::new().capacity(capacity)) {
            Ok(map) => map,
            Err(error) => panic!("`SkipMap::with_capacity()` - {error}!"),
        }
    }

    /// Makes a new, empty `SkipMap` from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the requested capacity is larger than a map can hold.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::{Config, Error, SkipMap};
    ///
    /// let map: SkipMap<u8, u8> = SkipMap::with_config(Config::new().seed(7)).unwrap();
    /// assert!(map.is_empty());
    ///
    /// let too_big = Config::new().capacity(usize::MAX);
    /// assert!(matches!(SkipMap::<u8, u8>::with_config(too_big), Err(Error::InvalidConfig { .. })));
    /// ```
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            raw: RawSkipList::with_capacity(Duplicates::Reject, config.capacity, config.seed),
        })
    }

    /// Returns the number of elements the map can hold without reallocating its payload storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns the number of elements in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the map contains no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the largest number of elements a map can hold.
    ///
    /// See [`Config::max_capacity`] for how node handles bound this.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        Config::max_capacity()
    }

    /// Returns `true` if the levels are in their canonical shape.
    ///
    /// Empty maps and freshly cloned maps are balanced; any insert or removal clears the flag until
    /// [`SkipMap::balance`] or a complete balancing traversal sets it again.
    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        self.raw.is_balanced()
    }

    /// Rebuilds the levels into their canonical shape.
    ///
    /// Afterwards the `i`-th element (counting from 1) appears on `1 + i.trailing_zeros()` levels.
    ///
    /// # Complexity
    ///
    /// O(n); O(1) if the map is already balanced.
    pub fn balance(&mut self) {
        self.raw.balance();
    }

    /// Clears the map, removing all elements.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let mut a = SkipMap::new();
    /// a.insert(1, "a");
    /// a.clear();
    /// assert!(a.is_empty());
    /// assert!(a.is_balanced());
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Returns the first key-value pair in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.raw.first().map(|node| self.raw.key_value(node))
    }

    /// Returns the last key-value pair in the map.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.raw.last().map(|node| self.raw.key_value(node))
    }

    /// Removes and returns the first element in the map.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let mut map = SkipMap::from([(1, "a"), (2, "b")]);
    /// assert_eq!(map.pop_first(), Some((1, "a")));
    /// assert_eq!(map.pop_first(), Some((2, "b")));
    /// assert_eq!(map.pop_first(), None);
    /// ```
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let node = self.raw.first()?;
        Some(self.raw.remove_at(node).1)
    }

    /// Removes and returns the last element in the map.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let node = self.raw.last()?;
        Some(self.raw.remove_at(node).1)
    }

    /// Returns a read-only cursor at the first element, or past-the-end if the map is empty.
    ///
    /// Read-only cursors never rebalance.
    #[must_use]
    pub fn cursor_front(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.raw, self.raw.first())
    }

    /// Returns a read-only cursor past the last element.
    #[must_use]
    pub fn cursor_back(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.raw, None)
    }

    /// Returns a cursor at the first element that rebalances the map while it moves forward.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let mut map: SkipMap<u32, u32> = (0..10).map(|i| (i, i)).collect();
    /// let mut cursor = map.cursor_front_mut();
    /// assert_eq!(cursor.index(), Some(0));
    /// while !cursor.is_end() {
    ///     cursor.move_next();
    /// }
    /// assert_eq!(cursor.index(), Some(10));
    /// assert!(map.is_balanced());
    /// ```
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_, K, V> {
        let first = self.raw.first();
        CursorMut::indexed(&mut self.raw, first, 0)
    }

    /// Returns a cursor past the last element that rebalances the map while it moves backward.
    pub fn cursor_back_mut(&mut self) -> CursorMut<'_, K, V> {
        let len = self.raw.len();
        CursorMut::indexed(&mut self.raw, None, len)
    }

    /// Calls `f` on every element in order, rebalancing the map along the way.
    ///
    /// Behaves like [`SkipMap::for_each_no_balance`] when the map is already balanced.
    ///
    /// # Complexity
    ///
    /// O(n)
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

    /// Returns a read-only view of the node graph.
    #[must_use]
    pub const fn structure(&self) -> Structure<'_, K, V> {
        Structure::new(&self.raw)
    }

    /// Gets an iterator over the entries of the map, sorted by key.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let map = SkipMap::from([(3, "c"), (2, "b"), (1, "a")]);
    /// let (first_key, first_value) = map.iter().next().unwrap();
    /// assert_eq!((*first_key, *first_value), (1, "a"));
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.raw)
    }

    /// Gets a mutable iterator over the entries of the map, sorted by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.raw)
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.iter(),
        }
    }

    /// Gets an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.iter(),
        }
    }

    /// Gets a mutable iterator over the values of the map, in order by key.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Creates a consuming iterator visiting all the keys, in sorted order.
    pub fn into_keys(self) -> IntoKeys<K, V> {
        IntoKeys {
            inner: self.into_iter(),
        }
    }

    /// Creates a consuming iterator visiting all the values, in order by key.
    pub fn into_values(self) -> IntoValues<K, V> {
        IntoValues {
            inner: self.into_iter(),
        }
    }
}

impl<K: Ord, V> SkipMap<K, V> {
    /// Inserts `key` with `value` unless an equivalent key is already present.
    ///
    /// Returns a cursor at the element holding the key and whether the insert happened. An existing
    /// value is never overwritten; `value` is dropped instead.
    ///
    /// # Complexity
    ///
    /// O(log n) expected.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let mut map = SkipMap::new();
    /// assert!(map.insert(37, "a").1);
    /// assert!(!map.is_empty());
    ///
    /// let (cursor, inserted) = map.insert(37, "b");
    /// assert!(!inserted);
    /// assert_eq!(cursor.value(), Some(&"a"));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> (CursorMut<'_, K, V>, bool) {
        self.try_insert_with(key, || value)
    }

    /// Inserts `key` with a value from `make_value` unless an equivalent key is already present.
    ///
    /// `make_value` only runs when the insert happens.
    pub fn try_insert_with<F>(&mut self, key: K, make_value: F) -> (CursorMut<'_, K, V>, bool)
    where
        F: FnOnce() -> V,
    {
        let (node, inserted) = self.raw.insert(key, make_value);
        (CursorMut::unindexed(&mut self.raw, Some(node)), inserted)
    }

    /// Returns the value for `key`, inserting `V::default()` first if the key is absent.
    ///
    /// The lookup doubles as the insert position, so an absent key costs one search.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let mut letters: SkipMap<char, usize> = SkipMap::new();
    /// for ch in "a short treatise on fungi".chars() {
    ///     *letters.get_or_insert_default(ch) += 1;
    /// }
    /// assert_eq!(letters[&'s'], 2);
    /// assert_eq!(letters[&'t'], 3);
    /// assert_eq!(letters.get(&'y'), None);
    /// ```
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        let hint = self.raw.lower_bound(&key);
        let (node, _) = self.raw.insert_hinted(hint, key, V::default);
        self.raw.key_value_mut(node).1
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but the ordering on the borrowed
    /// form *must* match the ordering on the key type.
    ///
    /// # Complexity
    ///
    /// O(log n) expected.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let mut map = SkipMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.get_key_value(key).map(|(_, value)| value)
    }

    /// Returns the stored key and its value for a key equivalent to `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.find(key).map(|node| self.raw.key_value(node))
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let node = self.raw.find(key)?;
        Some(self.raw.key_value_mut(node).1)
    }

    /// Returns the value for `key`, or an error if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyNotFound`] if no equivalent key is present.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::{Error, SkipMap};
    ///
    /// let map = SkipMap::from([(1, "a")]);
    /// assert_eq!(map.at(&1), Ok(&"a"));
    /// assert_eq!(map.at(&2), Err(Error::KeyNotFound));
    /// ```
    pub fn at<Q>(&self, key: &Q) -> Result<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Mutable counterpart of [`SkipMap::at`].
    ///
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

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.find(key).is_some()
    }

    /// Returns the number of elements equivalent to `key`: 0 or 1.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        usize::from(self.contains_key(key))
    }

    /// Returns a cursor at the element with an equivalent key, or past-the-end if there is none.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.find(key))
    }

    /// Mutable counterpart of [`SkipMap::find`].
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let node = self.raw.find(key);
        CursorMut::unindexed(&mut self.raw, node)
    }

    /// Returns a cursor at the first element whose key is not less than `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let map = SkipMap::from([(10, 'a'), (20, 'b'), (30, 'c')]);
    /// assert_eq!(map.lower_bound(&20).key(), Some(&20));
    /// assert_eq!(map.lower_bound(&21).key(), Some(&30));
    /// assert!(map.lower_bound(&31).is_end());
    /// ```
    pub fn lower_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.lower_bound(key))
    }

    /// Mutable counterpart of [`SkipMap::lower_bound`].
    pub fn lower_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let node = self.raw.lower_bound(key);
        CursorMut::unindexed(&mut self.raw, node)
    }

    /// Returns a cursor at the first element whose key is greater than `key`.
    pub fn upper_bound<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Cursor::new(&self.raw, self.raw.upper_bound(key))
    }

    /// Mutable counterpart of [`SkipMap::upper_bound`].
    pub fn upper_bound_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let node = self.raw.upper_bound(key);
        CursorMut::unindexed(&mut self.raw, node)
    }

    /// Returns the elements equivalent to `key`, which for a map is at most one.
    pub fn equal_range<Q>(&self, key: &Q) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        Range::between(&self.raw, self.raw.lower_bound(key), self.raw.upper_bound(key))
    }

    /// Constructs a double-ended iterator over a sub-range of elements in the map.
    ///
    /// # Panics
    ///
    /// Panics if range `start > end`, or if `start == end` and both bounds are `Excluded`.
    ///
    /// # Examples
    ///
    /// ```
    /// use core::ops::Bound::Included;
    /// use balanced_skiplist::SkipMap;
    ///
    /// let map = SkipMap::from([(3, "a"), (5, "b"), (8, "c")]);
    /// for (key, value) in map.range((Included(&4), Included(&8))) {
    ///     println!("{key}: {value}");
    /// }
    /// assert_eq!(Some((&5, &"b")), map.range(4..).next());
    /// ```
    pub fn range<Q, R>(&self, range: R) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
        R: RangeBounds<Q>,
    {
        let (start, end) = self.raw.span(&range);
        Range::between(&self.raw, start, end)
    }

    /// Removes a key from the map, returning the value if the key was present.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let mut map = SkipMap::from([(1, "a")]);
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the map, returning the stored key and value if the key was present.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let node = self.raw.find(key)?;
        Some(self.raw.remove_at(node).1)
    }

    /// Removes the element equivalent to `key` and returns how many were removed: 0 or 1.
    pub fn erase<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.raw.remove_key(key)
    }

    /// Removes every element in `range` and returns a cursor at the first element after it.
    ///
    /// # Panics
    ///
    /// Panics if range `start > end`, or if `start == end` and both bounds are `Excluded`.
    ///
    /// # Examples
    ///
    /// ```
    /// use balanced_skiplist::SkipMap;
    ///
    /// let mut map: SkipMap<u32, ()> = (0..10).map(|key| (key, ())).collect();
    /// let cursor = map.remove_range(2..8);
    /// assert_eq!(cursor.key(), Some(&8));
    /// assert_eq!(map.keys().copied().collect::<Vec<_>>(), [0, 1, 8, 9]);
    /// ```
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

impl<K: Clone, V: Clone> Clone for SkipMap<K, V> {
    /// Copies the entries into a map with the canonical, balanced shape.
    fn clone(&self) -> Self {
        Self {
            raw: self.raw.clone(),
        }
    }
}

impl<K: Hash, V: Hash> Hash for SkipMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for (k, v) in self {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for SkipMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq> Eq for SkipMap<K, V> {}

impl<K: PartialOrd, V: PartialOrd> PartialOrd for SkipMap<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.iter().partial_cmp(other.iter())
    }
}

impl<K: Ord, V: Ord> Ord for SkipMap<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SkipMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V> Default for SkipMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for SkipMap<K, V> {
    /// Keeps the first value seen for each key.
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for SkipMap<K, V> {
    /// Appends with a past-the-end hint, so sorted input costs O(1) amortized per element. Keys
    /// already present keep their value.
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.raw.insert_hinted(None, k, || v);
        }
    }
}

impl<'a, K: Ord + Copy, V: Copy> Extend<(&'a K, &'a V)> for SkipMap<K, V> {
    fn extend<T: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<'a, K, V> IntoIterator for &'a SkipMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut SkipMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

impl<K, V> IntoIterator for SkipMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(mut self) -> IntoIter<K, V> {
        IntoIter::new(self.raw.drain_to_vec())
    }
}

impl<K, Q, V> Index<&Q> for SkipMap<K, V>
where
    K: Borrow<Q> + Ord,
    Q: ?Sized + Ord,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for SkipMap<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}
