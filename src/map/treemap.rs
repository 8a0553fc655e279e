//! The ordered map facade.
//!
//! [`TreeMap`] sequences node allocation, the balancer and the navigator
//! behind the usual associative-container surface. All structural work runs
//! inside a [`Detached`](super::sentinel::Detached) scope, so the boundary
//! sentinels are re-linked on every exit path.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Bound, Index, RangeBounds};

use tracing::debug;

use super::compare::{Compare, Natural};
use super::cursor::{Cursor, IntoIter, Iter, IterMut, Keys, Position, Range, Values, ValuesMut};
use super::error::MapError;
use super::node::{NodeArena, NodeId, Side};

/// Where a missing key would be linked: under a parent on one side, or as
/// the root when `None`.
type Vacancy = Option<(NodeId, Side)>;

// =============================================================================
// TreeMap Definition
// =============================================================================

/// An ordered map with unique keys, backed by a Red-Black Tree.
///
/// Entries are kept sorted by a comparator fixed at construction
/// ([`Natural`], i.e. [`Ord`], by default). Insert, erase and lookup are
/// O(log N); [`begin`](Self::begin) and [`end`](Self::end) are O(1).
///
/// Besides the borrowing iterators, the map hands out [`Position`]s:
/// copyable handles to entries that stay valid across unrelated inserts and
/// erases. A position to an erased entry, or one issued by a different
/// map, is detected as stale.
///
/// # Time Complexity
///
/// | Operation               | Complexity |
/// |-------------------------|------------|
/// | `insert`                | O(log N)   |
/// | `erase` / `erase_at`    | O(log N)   |
/// | `find` / `get`          | O(log N)   |
/// | `lower_bound`/`upper_bound` | O(log N) |
/// | `begin` / `end`         | O(1)       |
/// | `next` / `prev`         | O(log N) worst, O(1) amortized |
/// | `len` / `is_empty`      | O(1)       |
/// | `clear`                 | O(N)       |
///
/// # Examples
///
/// ```rust
/// use rbmap::map::TreeMap;
///
/// let mut map = TreeMap::new();
/// for key in [5, 3, 8, 1, 4, 7, 9] {
///     map.insert(key, key * 10);
/// }
///
/// let keys: Vec<i32> = map.keys().copied().collect();
/// assert_eq!(keys, vec![1, 3, 4, 5, 7, 8, 9]);
///
/// assert_eq!(map.get_at(map.lower_bound(&6)), Some((&7, &70)));
/// assert_eq!(map.get_at(map.upper_bound(&7)), Some((&8, &80)));
/// assert_eq!(map.find(&6), map.end());
/// ```
pub struct TreeMap<K, V, C = Natural> {
    pub(super) nodes: NodeArena<K, V>,
    pub(super) length: usize,
    pub(super) compare: C,
}

static_assertions::assert_impl_all!(TreeMap<i32, String>: Send, Sync, Clone, Default);
static_assertions::assert_impl_all!(Position: Send, Sync, Copy);

impl<K, V> TreeMap<K, V> {
    /// Creates an empty map ordered by [`Ord`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::map::TreeMap;
    ///
    /// let map: TreeMap<i32, String> = TreeMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.begin(), map.end());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::with_compare(Natural)
    }
}

impl<K, V, C> TreeMap<K, V, C> {
    /// Creates an empty map ordered by `compare`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::map::TreeMap;
    ///
    /// let mut map = TreeMap::with_compare(|left: &i32, right: &i32| left > right);
    /// map.insert(1, "one");
    /// map.insert(3, "three");
    /// map.insert(2, "two");
    ///
    /// let keys: Vec<i32> = map.keys().copied().collect();
    /// assert_eq!(keys, vec![3, 2, 1]);
    /// ```
    #[must_use]
    pub fn with_compare(compare: C) -> Self {
        Self {
            nodes: NodeArena::new(),
            length: 0,
            compare,
        }
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the map holds no entries.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the comparator the map was built with.
    #[inline]
    #[must_use]
    pub const fn compare(&self) -> &C {
        &self.compare
    }

    // =========================================================================
    // Positions
    // =========================================================================

    /// Position of the entry with the smallest key, or [`end`](Self::end)
    /// when empty. O(1).
    #[must_use]
    pub fn begin(&self) -> Position {
        self.nodes.position(self.nodes.first())
    }

    /// The position one past the last entry.
    #[must_use]
    pub fn end(&self) -> Position {
        self.nodes.position(NodeId::POST_LAST)
    }

    /// The position one before the first entry, reached by stepping
    /// backwards from [`begin`](Self::begin).
    #[must_use]
    pub fn rend(&self) -> Position {
        self.nodes.position(NodeId::PRE_FIRST)
    }

    /// The position after `position` in key order.
    ///
    /// The last entry steps onto `end()`, `end()` stays put and `rend()`
    /// steps onto `begin()`. A stale position yields `end()`.
    #[must_use]
    pub fn next(&self, position: Position) -> Position {
        self.nodes.locate(position).map_or_else(
            |_| self.end(),
            |id| self.nodes.position(self.nodes.successor(id)),
        )
    }

    /// The position before `position` in key order, the mirror of
    /// [`next`](Self::next). A stale position yields `rend()`.
    #[must_use]
    pub fn prev(&self, position: Position) -> Position {
        self.nodes.locate(position).map_or_else(
            |_| self.rend(),
            |id| self.nodes.position(self.nodes.predecessor(id)),
        )
    }

    /// The entry at `position`, or `None` for a boundary or stale position.
    #[must_use]
    pub fn get_at(&self, position: Position) -> Option<(&K, &V)> {
        let id = self.nodes.resolve(position).ok()?;
        self.nodes.entry(id)
    }

    /// The entry at `position` with a mutable value.
    pub fn get_at_mut(&mut self, position: Position) -> Option<(&K, &mut V)> {
        let id = self.nodes.resolve(position).ok()?;
        self.nodes.entry_mut(id)
    }

    /// A cursor resting on `position`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::StalePosition`] if the entry behind `position`
    /// has been erased or `position` belongs to another map.
    pub fn cursor(&self, position: Position) -> Result<Cursor<'_, K, V>, MapError> {
        let id = self.nodes.locate(position)?;
        Ok(Cursor::new(&self.nodes, id))
    }

    /// A cursor on the first entry (or `end()` when empty).
    #[must_use]
    pub fn cursor_front(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.nodes, self.nodes.first())
    }

    /// A cursor on the last entry (or `rend()` when empty).
    #[must_use]
    pub fn cursor_back(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.nodes, self.nodes.last())
    }

    // =========================================================================
    // Iteration
    // =========================================================================

    /// Iterates over the entries in key order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::map::TreeMap;
    ///
    /// let map: TreeMap<i32, &str> = [(2, "b"), (1, "a")].into();
    /// let entries: Vec<_> = map.iter().collect();
    /// assert_eq!(entries, vec![(&1, &"a"), (&2, &"b")]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.nodes, self.length)
    }

    /// Iterates over the entries in key order with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.nodes, self.length)
    }

    /// Iterates over the keys in order.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Iterates over the values in key order.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V> {
        Values::new(self.iter())
    }

    /// Iterates over mutable values in key order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut::new(self.iter_mut())
    }

    /// The entry with the smallest key. O(1).
    #[must_use]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.nodes.entry(self.nodes.first())
    }

    /// The entry with the largest key. O(1).
    #[must_use]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.nodes.entry(self.nodes.last())
    }

    // =========================================================================
    // Positional Erase
    // =========================================================================

    /// Removes the entry at `position` and returns it.
    ///
    /// Positions to every other entry stay valid.
    ///
    /// # Errors
    ///
    /// - [`MapError::EndPosition`] if `position` is `end()` or `rend()`.
    /// - [`MapError::StalePosition`] if the entry was already erased or
    ///   `position` was issued by another map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::map::{MapError, TreeMap};
    ///
    /// let mut map: TreeMap<i32, &str> = [(1, "a"), (2, "b"), (3, "c")].into();
    /// let two = map.find(&2);
    /// let three = map.find(&3);
    ///
    /// assert_eq!(map.erase_at(two), Ok((2, "b")));
    /// assert_eq!(map.erase_at(two), Err(MapError::StalePosition));
    /// assert_eq!(map.get_at(three), Some((&3, &"c")));
    /// ```
    pub fn erase_at(&mut self, position: Position) -> Result<(K, V), MapError> {
        let id = self.nodes.resolve(position)?;
        self.erase_node(id).ok_or(MapError::StalePosition)
    }

    /// Removes every entry in `[first, last)` and returns how many were
    /// removed.
    ///
    /// Nothing is removed unless the whole range is valid.
    ///
    /// # Errors
    ///
    /// - [`MapError::StalePosition`] if either position was erased or
    ///   belongs to another map.
    /// - [`MapError::EndPosition`] if `first` is `rend()`.
    /// - [`MapError::InvertedRange`] if `last` orders before `first`.
    pub fn erase_range(&mut self, first: Position, last: Position) -> Result<usize, MapError> {
        let start = self.nodes.locate(first)?;
        let stop = self.nodes.locate(last)?;
        if start == NodeId::PRE_FIRST {
            return Err(MapError::EndPosition);
        }

        let mut doomed = Vec::new();
        let mut current = start;
        while current != stop {
            if current == NodeId::POST_LAST {
                return Err(MapError::InvertedRange);
            }
            doomed.push(current);
            current = self.nodes.successor(current);
        }

        debug!("erasing {} of {} entries by range", doomed.len(), self.length);
        for &id in &doomed {
            self.erase_node(id);
        }
        Ok(doomed.len())
    }

    /// Removes and returns the entry with the smallest key.
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let first = self.nodes.first();
        if first == NodeId::POST_LAST {
            return None;
        }
        self.erase_node(first)
    }

    /// Removes and returns the entry with the largest key.
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let last = self.nodes.last();
        if last == NodeId::PRE_FIRST {
            return None;
        }
        self.erase_node(last)
    }

    /// Removes every entry, in ascending key order.
    ///
    /// Positions obtained before the call become stale; `end()` and
    /// `rend()` stay valid.
    pub fn clear(&mut self) {
        debug!("clearing {} entries", self.length);
        let mut current = self.nodes.first();
        while current != NodeId::POST_LAST {
            let next = self.nodes.successor(current);
            self.nodes.release(current);
            current = next;
        }
        self.nodes.root = None;
        self.nodes.attach_sentinels();
        self.length = 0;
    }

    /// Splices `id` out of the tree and releases its slot.
    fn erase_node(&mut self, id: NodeId) -> Option<(K, V)> {
        self.nodes.detached().splice_out(id);
        self.length -= 1;
        self.nodes.release(id)
    }

    /// Links a fresh node holding `key` and `value` at `vacancy` and
    /// rebalances.
    fn link_new(&mut self, vacancy: Vacancy, key: K, value: V) -> NodeId {
        let mut tree = self.nodes.detached();
        let id = tree.allocate(key, value, vacancy.map(|(parent, _)| parent));
        match vacancy {
            Some((parent, side)) => tree.set_child(parent, side, Some(id)),
            None => tree.root = Some(id),
        }
        tree.insert_fixup(id);
        drop(tree);
        self.length += 1;
        id
    }

    fn key_of<Q>(&self, id: NodeId) -> Option<&Q>
    where
        K: Borrow<Q>,
        Q: ?Sized,
    {
        self.nodes.key(id).map(Borrow::borrow)
    }

    // =========================================================================
    // Key Lookup
    // =========================================================================

    /// Walks from the root to the node holding `key`, or to the vacancy
    /// where it would be linked.
    fn search<Q>(&self, key: &Q) -> Result<NodeId, Vacancy>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let mut vacancy = None;
        let mut current = self.nodes.root;
        while let Some(id) = current {
            let Some(here) = self.key_of(id) else {
                debug_assert!(false, "tree node {id:?} holds no entry");
                break;
            };
            let side = if self.compare.less(key, here) {
                Side::Left
            } else if self.compare.less(here, key) {
                Side::Right
            } else {
                return Ok(id);
            };
            vacancy = Some((id, side));
            current = self.nodes.link(id, side);
        }
        Err(vacancy)
    }

    /// First node whose key is not less than `key` (`inclusive`) or greater
    /// than `key` (otherwise); `post-last` when there is none.
    fn bound<Q>(&self, key: &Q, inclusive: bool) -> NodeId
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let mut candidate = NodeId::POST_LAST;
        let mut current = self.nodes.root;
        while let Some(id) = current
            && let Some(here) = self.key_of(id)
        {
            let at_or_after = if inclusive {
                !self.compare.less(here, key)
            } else {
                self.compare.less(key, here)
            };
            if at_or_after {
                candidate = id;
                current = self.nodes.link(id, Side::Left);
            } else {
                current = self.nodes.link(id, Side::Right);
            }
        }
        candidate
    }

    /// Position of the entry for `key`, or [`end`](Self::end) on a miss.
    ///
    /// The key may be any borrowed form of the map's key type, as long as
    /// the comparator orders the borrowed form consistently.
    ///
    /// # Complexity
    ///
    /// O(log N)
    #[must_use]
    pub fn find<Q>(&self, key: &Q) -> Position
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        match self.search(key) {
            Ok(id) => self.nodes.position(id),
            Err(_) => self.end(),
        }
    }

    /// Position of the first entry whose key is not less than `key`, or
    /// [`end`](Self::end) if every key is less.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::map::TreeMap;
    ///
    /// let map: TreeMap<i32, ()> = [(10, ()), (20, ()), (30, ())].into();
    /// assert_eq!(map.lower_bound(&20), map.find(&20));
    /// assert_eq!(map.lower_bound(&25), map.find(&30));
    /// assert_eq!(map.lower_bound(&35), map.end());
    /// ```
    #[must_use]
    pub fn lower_bound<Q>(&self, key: &Q) -> Position
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.nodes.position(self.bound(key, true))
    }

    /// Position of the first entry whose key is greater than `key`, or
    /// [`end`](Self::end) if none is.
    #[must_use]
    pub fn upper_bound<Q>(&self, key: &Q) -> Position
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.nodes.position(self.bound(key, false))
    }

    /// The pair `(lower_bound(key), upper_bound(key))`: the run of entries
    /// equivalent to `key`, empty when it is absent.
    #[must_use]
    pub fn equal_range<Q>(&self, key: &Q) -> (Position, Position)
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        (self.lower_bound(key), self.upper_bound(key))
    }

    /// Returns a reference to the value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::map::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// map.insert("hello".to_string(), 42);
    ///
    /// // Can use &str to look up String keys
    /// assert_eq!(map.get("hello"), Some(&42));
    /// assert_eq!(map.get("world"), None);
    /// ```
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let id = self.search(key).ok()?;
        self.nodes.entry(id).map(|(_, value)| value)
    }

    /// Returns the stored key and value for `key`.
    #[must_use]
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let id = self.search(key).ok()?;
        self.nodes.entry(id)
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let id = self.search(key).ok()?;
        self.nodes.entry_mut(id).map(|(_, value)| value)
    }

    /// Checked access to the value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyNotFound`] if `key` is absent.
    pub fn at<Q>(&self, key: &Q) -> Result<&V, MapError>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.get(key).ok_or(MapError::KeyNotFound)
    }

    /// Checked mutable access to the value for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::KeyNotFound`] if `key` is absent.
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V, MapError>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.get_mut(key).ok_or(MapError::KeyNotFound)
    }

    /// Returns `true` if the map holds an entry for `key`.
    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.search(key).is_ok()
    }

    /// Number of entries for `key`: 0 or 1.
    #[must_use]
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        usize::from(self.contains_key(key))
    }

    /// Iterates over the entries whose keys fall within `range`.
    ///
    /// A range whose end orders before its start is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::map::TreeMap;
    ///
    /// let map: TreeMap<i32, char> = (1..=9).zip('a'..).collect();
    /// let keys: Vec<i32> = map.range(3..6).map(|(key, _)| *key).collect();
    /// assert_eq!(keys, vec![3, 4, 5]);
    ///
    /// let backwards: Vec<i32> = map.range(7..).rev().map(|(key, _)| *key).collect();
    /// assert_eq!(backwards, vec![9, 8, 7]);
    ///
    /// assert_eq!(map.range(6..2).count(), 0);
    /// ```
    pub fn range<Q, R>(&self, range: R) -> Range<'_, K, V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        R: RangeBounds<Q>,
        Q: ?Sized,
    {
        let front = match range.start_bound() {
            Bound::Included(start) => self.bound(start, true),
            Bound::Excluded(start) => self.bound(start, false),
            Bound::Unbounded => self.nodes.first(),
        };
        let back = match range.end_bound() {
            Bound::Included(end) => self.bound(end, false),
            Bound::Excluded(end) => self.bound(end, true),
            Bound::Unbounded => NodeId::POST_LAST,
        };
        let inverted = match (self.key_of::<Q>(front), self.key_of::<Q>(back)) {
            (Some(front), Some(back)) => self.compare.less(back, front),
            _ => false,
        };
        if front == NodeId::POST_LAST || inverted {
            return Range::empty(&self.nodes);
        }
        Range::new(&self.nodes, front, back)
    }

    // =========================================================================
    // Keyed Erase
    // =========================================================================

    /// Removes the entry for `key` and returns how many entries were
    /// removed: 0 or 1.
    pub fn erase<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        match self.search(key) {
            Ok(id) => usize::from(self.erase_node(id).is_some()),
            Err(_) => 0,
        }
    }

    /// Removes the entry for `key` and returns its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes the entry for `key` and returns it.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        C: Compare<Q>,
        Q: ?Sized,
    {
        let id = self.search(key).ok()?;
        self.erase_node(id)
    }
}

// =============================================================================
// Insertion
// =============================================================================

impl<K, V, C: Compare<K>> TreeMap<K, V, C> {
    /// Inserts `key` with `value` unless an equivalent key is present.
    ///
    /// Returns the position of the entry for `key` and whether it was newly
    /// inserted. An existing entry is left untouched, value included.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::map::TreeMap;
    ///
    /// let mut map = TreeMap::new();
    /// let (first, inserted) = map.insert(1, "one");
    /// assert!(inserted);
    ///
    /// let (again, inserted) = map.insert(1, "uno");
    /// assert!(!inserted);
    /// assert_eq!(again, first);
    /// assert_eq!(map.get(&1), Some(&"one"));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> (Position, bool) {
        match self.search(&key) {
            Ok(id) => (self.nodes.position(id), false),
            Err(vacancy) => {
                let id = self.link_new(vacancy, key, value);
                (self.nodes.position(id), true)
            }
        }
    }

    /// Inserts `key` with `value`, replacing the value of an existing entry.
    ///
    /// Returns the entry's position and the replaced value, if any. The
    /// stored key is kept on replacement.
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (Position, Option<V>) {
        match self.search(&key) {
            Ok(id) => {
                let previous = std::mem::replace(self.nodes.occupied_value_mut(id), value);
                (self.nodes.position(id), Some(previous))
            }
            Err(vacancy) => {
                let id = self.link_new(vacancy, key, value);
                (self.nodes.position(id), None)
            }
        }
    }

    /// Returns the value for `key`, inserting `default()` first if absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::map::TreeMap;
    ///
    /// let mut counts = TreeMap::new();
    /// for word in ["apple", "pear", "apple"] {
    ///     *counts.get_or_insert_with(word, || 0) += 1;
    /// }
    /// assert_eq!(counts.get("apple"), Some(&2));
    /// assert_eq!(counts.get("pear"), Some(&1));
    /// ```
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        F: FnOnce() -> V,
    {
        let id = match self.search(&key) {
            Ok(id) => id,
            Err(vacancy) => self.link_new(vacancy, key, default()),
        };
        self.nodes.occupied_value_mut(id)
    }

    /// Returns the value for `key`, inserting `V::default()` first if
    /// absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.get_or_insert_with(key, V::default)
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K, V, C: Default> Default for TreeMap<K, V, C> {
    #[inline]
    fn default() -> Self {
        Self::with_compare(C::default())
    }
}

/// Deep copy by re-inserting every entry, in order, into a fresh map.
impl<K, V, C> Clone for TreeMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Clone + Compare<K>,
{
    fn clone(&self) -> Self {
        debug!("cloning map of {} entries", self.length);
        let mut copy = Self::with_compare(self.compare.clone());
        for (key, value) in self {
            copy.insert(key.clone(), value.clone());
        }
        copy
    }
}

impl<K, V, C> FromIterator<(K, V)> for TreeMap<K, V, C>
where
    C: Compare<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

/// Keeps the first value seen for a key, like [`TreeMap::insert`].
impl<K, V, C: Compare<K>> Extend<(K, V)> for TreeMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for TreeMap<K, V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V, C> IntoIterator for TreeMap<K, V, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.nodes, self.length)
    }
}

impl<'a, K, V, C> IntoIterator for &'a TreeMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, C> IntoIterator for &'a mut TreeMap<K, V, C> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// # Panics
///
/// Panics if the key is not present. Use [`TreeMap::get`] or
/// [`TreeMap::at`] for fallible access.
impl<K, V, C, Q> Index<&Q> for TreeMap<K, V, C>
where
    K: Borrow<Q>,
    C: Compare<Q>,
    Q: ?Sized,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found in TreeMap"),
        }
    }
}

/// Maps are equal when they hold equal entries in the same order.
impl<K: PartialEq, V: PartialEq, C> PartialEq for TreeMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq, C> Eq for TreeMap<K, V, C> {}

/// Hashes the length first, then each entry in key order, so equal maps
/// hash equally regardless of insertion order.
impl<K: Hash, V: Hash, C> Hash for TreeMap<K, V, C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for (key, value) in self {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for TreeMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display, C> fmt::Display for TreeMap<K, V, C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for (key, value) in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V, C> serde::Serialize for TreeMap<K, V, C>
where
    K: serde::Serialize,
    V: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct TreeMapVisitor<K, V, C> {
    marker: std::marker::PhantomData<fn() -> TreeMap<K, V, C>>,
}

#[cfg(feature = "serde")]
impl<K, V, C> TreeMapVisitor<K, V, C> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, C> serde::de::Visitor<'de> for TreeMapVisitor<K, V, C>
where
    K: serde::Deserialize<'de>,
    V: serde::Deserialize<'de>,
    C: Compare<K> + Default,
{
    type Value = TreeMap<K, V, C>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut map = TreeMap::default();
        while let Some((key, value)) = access.next_entry()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V, C> serde::Deserialize<'de> for TreeMap<K, V, C>
where
    K: serde::Deserialize<'de>,
    V: serde::Deserialize<'de>,
    C: Compare<K> + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(TreeMapVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn scenario_map() -> TreeMap<i32, String> {
        let mut map = TreeMap::new();
        for key in [5, 3, 8, 1, 4, 7, 9] {
            map.insert(key, format!("v{key}"));
        }
        map
    }

    fn keys_of<V, C>(map: &TreeMap<i32, V, C>) -> Vec<i32> {
        map.keys().copied().collect()
    }

    #[rstest]
    fn test_insert_keeps_keys_sorted_and_tree_valid() {
        let map = scenario_map();
        assert_eq!(keys_of(&map), vec![1, 3, 4, 5, 7, 8, 9]);
        assert_eq!(map.len(), 7);
        assert!(map.validate().is_ok());
    }

    #[rstest]
    fn test_insert_duplicate_is_rejected_without_mutation() {
        let mut map = scenario_map();
        let (position, inserted) = map.insert(4, "other".to_string());
        assert!(!inserted);
        assert_eq!(map.get_at(position), Some((&4, &"v4".to_string())));
        assert_eq!(map.len(), 7);
    }

    #[rstest]
    fn test_insert_into_empty_links_sentinels() {
        let mut map = TreeMap::new();
        let (position, _) = map.insert(1, ());
        assert_eq!(map.begin(), position);
        assert_eq!(map.next(position), map.end());
        assert_eq!(map.prev(position), map.rend());
        assert_eq!(map.prev(map.end()), position);
    }

    #[rstest]
    #[case(6, Some(7), Some(7))]
    #[case(7, Some(7), Some(8))]
    #[case(0, Some(1), Some(1))]
    #[case(9, Some(9), None)]
    #[case(10, None, None)]
    fn test_bounds(#[case] query: i32, #[case] lower: Option<i32>, #[case] upper: Option<i32>) {
        let map = scenario_map();
        let key_at = |position| map.get_at(position).map(|(key, _)| *key);
        assert_eq!(key_at(map.lower_bound(&query)), lower);
        assert_eq!(key_at(map.upper_bound(&query)), upper);
    }

    #[rstest]
    fn test_bounds_on_empty_map_are_end() {
        let map: TreeMap<i32, ()> = TreeMap::new();
        assert_eq!(map.lower_bound(&1), map.end());
        assert_eq!(map.upper_bound(&1), map.end());
        assert_eq!(map.find(&1), map.end());
    }

    #[rstest]
    fn test_equal_range() {
        let map = scenario_map();
        let (first, last) = map.equal_range(&4);
        assert_eq!(first, map.find(&4));
        assert_eq!(last, map.find(&5));
        let (first, last) = map.equal_range(&6);
        assert_eq!(first, last);
    }

    #[rstest]
    fn test_erase_two_child_node_keeps_successor_position() {
        let mut map = scenario_map();
        let successor = map.find(&7);
        assert_eq!(map.erase(&5), 1);
        assert_eq!(map.get_at(successor), Some((&7, &"v7".to_string())));
        assert_eq!(keys_of(&map), vec![1, 3, 4, 7, 8, 9]);
        assert!(map.validate().is_ok());
    }

    #[rstest]
    fn test_erase_missing_key_returns_zero() {
        let mut map = scenario_map();
        assert_eq!(map.erase(&6), 0);
        assert_eq!(map.len(), 7);
        let mut empty: TreeMap<i32, ()> = TreeMap::new();
        assert_eq!(empty.erase(&1), 0);
    }

    #[rstest]
    fn test_erase_only_entry_empties_map() {
        let mut map = TreeMap::new();
        let (position, _) = map.insert(1, 'a');
        assert_eq!(map.erase_at(position), Ok((1, 'a')));
        assert!(map.is_empty());
        assert_eq!(map.begin(), map.end());
        assert!(map.validate().is_ok());
    }

    #[rstest]
    fn test_erase_at_rejects_boundaries_and_stale_positions() {
        let mut map = scenario_map();
        assert_eq!(map.erase_at(map.end()), Err(MapError::EndPosition));
        assert_eq!(map.erase_at(map.rend()), Err(MapError::EndPosition));

        let three = map.find(&3);
        map.erase(&3);
        assert_eq!(map.erase_at(three), Err(MapError::StalePosition));
        assert_eq!(map.get_at(three), None);

        // The freed slot is reused, but the old position stays stale.
        map.insert(2, "v2".to_string());
        assert_eq!(map.get_at(three), None);
        assert_eq!(map.next(three), map.end());
        assert_eq!(map.cursor(three).err(), Some(MapError::StalePosition));
    }

    #[rstest]
    fn test_positions_from_another_map_are_rejected() {
        let mut mine: TreeMap<i32, &str> = TreeMap::new();
        let mut theirs: TreeMap<i32, &str> = TreeMap::new();
        let (foreign, _) = theirs.insert(1, "theirs");
        mine.insert(99, "mine");

        assert_eq!(mine.get_at(foreign), None);
        assert_eq!(mine.get_at_mut(foreign), None);
        assert_eq!(mine.erase_at(foreign), Err(MapError::StalePosition));
        assert_eq!(mine.cursor(foreign).err(), Some(MapError::StalePosition));
        assert_eq!(mine.next(foreign), mine.end());
        assert_eq!(
            mine.erase_range(theirs.begin(), theirs.end()),
            Err(MapError::StalePosition)
        );
        assert_ne!(mine.end(), theirs.end());

        assert_eq!(mine.get(&99), Some(&"mine"));
        assert_eq!(mine.len(), 1);
        assert_eq!(theirs.erase_at(foreign), Ok((1, "theirs")));
    }

    #[rstest]
    fn test_erase_range_removes_half_open_run() {
        let mut map = scenario_map();
        let removed = map.erase_range(map.find(&3), map.find(&8));
        assert_eq!(removed, Ok(4));
        assert_eq!(keys_of(&map), vec![1, 8, 9]);
        assert!(map.validate().is_ok());

        let all = map.erase_range(map.begin(), map.end());
        assert_eq!(all, Ok(3));
        assert!(map.is_empty());
    }

    #[rstest]
    fn test_erase_range_inverted_erases_nothing() {
        let mut map = scenario_map();
        let result = map.erase_range(map.find(&8), map.find(&3));
        assert_eq!(result, Err(MapError::InvertedRange));
        assert_eq!(map.len(), 7);
        assert_eq!(map.erase_range(map.rend(), map.end()), Err(MapError::EndPosition));
    }

    #[rstest]
    fn test_clear_leaves_reusable_empty_map() {
        let mut map = scenario_map();
        let stale = map.find(&4);
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.begin(), map.end());
        assert_eq!(map.get_at(stale), None);
        assert!(map.validate().is_ok());

        map.insert(2, "two".to_string());
        map.insert(1, "one".to_string());
        assert_eq!(keys_of(&map), vec![1, 2]);
        assert!(map.validate().is_ok());
    }

    #[rstest]
    fn test_pop_first_and_last() {
        let mut map = scenario_map();
        assert_eq!(map.pop_first().map(|(key, _)| key), Some(1));
        assert_eq!(map.pop_last().map(|(key, _)| key), Some(9));
        assert_eq!(map.first_key_value().map(|(key, _)| *key), Some(3));
        assert_eq!(map.last_key_value().map(|(key, _)| *key), Some(8));

        let mut empty: TreeMap<i32, ()> = TreeMap::new();
        assert_eq!(empty.pop_first(), None);
        assert_eq!(empty.pop_last(), None);
    }

    #[rstest]
    fn test_checked_access() {
        let mut map = scenario_map();
        assert_eq!(map.at(&4), Ok(&"v4".to_string()));
        assert_eq!(map.at(&6), Err(MapError::KeyNotFound));
        if let Ok(value) = map.at_mut(&4) {
            value.push('!');
        }
        assert_eq!(map[&4], "v4!");
        assert_eq!(map.at_mut(&6).err(), Some(MapError::KeyNotFound));
    }

    #[rstest]
    #[should_panic(expected = "key not found")]
    fn test_index_panics_on_missing_key() {
        let map = scenario_map();
        let _ = &map[&6];
    }

    #[rstest]
    fn test_insert_or_assign_replaces_value() {
        let mut map = scenario_map();
        let (position, previous) = map.insert_or_assign(4, "four".to_string());
        assert_eq!(previous, Some("v4".to_string()));
        assert_eq!(map.get_at(position), Some((&4, &"four".to_string())));

        let (_, previous) = map.insert_or_assign(6, "six".to_string());
        assert_eq!(previous, None);
        assert_eq!(map.len(), 8);
    }

    #[rstest]
    fn test_get_or_insert_default() {
        let mut map: TreeMap<&str, Vec<i32>> = TreeMap::new();
        map.get_or_insert_default("odd").push(1);
        map.get_or_insert_default("odd").push(3);
        map.get_or_insert_default("even").push(2);
        assert_eq!(map.get("odd"), Some(&vec![1, 3]));
        assert_eq!(map.len(), 2);
    }

    #[rstest]
    fn test_contains_and_count() {
        let map = scenario_map();
        assert!(map.contains_key(&8));
        assert_eq!(map.count(&8), 1);
        assert_eq!(map.count(&2), 0);
    }

    #[rstest]
    fn test_borrowed_lookup_with_string_keys() {
        let mut map = TreeMap::new();
        map.insert("pear".to_string(), 2);
        map.insert("apple".to_string(), 1);
        assert_eq!(map.get("apple"), Some(&1));
        assert_eq!(map.get_key_value("pear"), Some((&"pear".to_string(), &2)));
        assert_eq!(map.remove("pear"), Some(2));
        assert!(!map.contains_key("pear"));
    }

    #[rstest]
    fn test_custom_comparator_orders_descending() {
        let mut map = TreeMap::with_compare(|left: &i32, right: &i32| left > right);
        for key in [5, 3, 8, 1, 4, 7, 9] {
            map.insert(key, ());
        }
        assert_eq!(keys_of(&map), vec![9, 8, 7, 5, 4, 3, 1]);
        let key_at = |position| map.get_at(position).map(|(key, _)| *key);
        assert_eq!(key_at(map.lower_bound(&6)), Some(5));
        assert!(map.validate().is_ok());
    }

    #[rstest]
    fn test_range_bounds() {
        fn collect(range: Range<'_, i32, String>) -> Vec<i32> {
            range.map(|(key, _)| *key).collect()
        }

        let map = scenario_map();
        assert_eq!(collect(map.range(3..=7)), vec![3, 4, 5, 7]);
        assert_eq!(collect(map.range(2..5)), vec![3, 4]);
        assert_eq!(collect(map.range(..4)), vec![1, 3]);
        assert_eq!(
            collect(map.range((Bound::Excluded(5), Bound::Unbounded))),
            vec![7, 8, 9]
        );
        assert_eq!(collect(map.range(10..)), Vec::<i32>::new());
        assert_eq!(collect(map.range(9..3)), Vec::<i32>::new());
        assert_eq!(collect(map.range(5..5)), Vec::<i32>::new());
    }

    #[rstest]
    fn test_clone_is_independent() {
        let original = scenario_map();
        let mut copy = original.clone();
        copy.erase(&5);
        copy.insert(6, "v6".to_string());
        assert_eq!(keys_of(&original), vec![1, 3, 4, 5, 7, 8, 9]);
        assert_eq!(keys_of(&copy), vec![1, 3, 4, 6, 7, 8, 9]);
        assert!(copy.validate().is_ok());
    }

    #[rstest]
    fn test_swap_moves_positions_with_their_nodes() {
        let mut left = scenario_map();
        let mut right = TreeMap::new();
        let four = left.find(&4);
        std::mem::swap(&mut left, &mut right);
        assert!(left.is_empty());
        assert_eq!(right.get_at(four), Some((&4, &"v4".to_string())));
    }

    #[rstest]
    fn test_equality_ignores_insertion_order() {
        let forward: TreeMap<i32, i32> = (1..=5).map(|key| (key, key)).collect();
        let backward: TreeMap<i32, i32> = (1..=5).rev().map(|key| (key, key)).collect();
        assert_eq!(forward, backward);

        let mut hasher_forward = std::collections::hash_map::DefaultHasher::new();
        let mut hasher_backward = std::collections::hash_map::DefaultHasher::new();
        forward.hash(&mut hasher_forward);
        backward.hash(&mut hasher_backward);
        assert_eq!(hasher_forward.finish(), hasher_backward.finish());
    }

    #[rstest]
    fn test_extend_keeps_first_value() {
        let mut map: TreeMap<i32, &str> = TreeMap::new();
        map.extend([(1, "first"), (1, "second"), (2, "two")]);
        assert_eq!(map.get(&1), Some(&"first"));
        assert_eq!(map.len(), 2);
    }

    #[rstest]
    fn test_display_and_debug() {
        let map: TreeMap<i32, &str> = [(2, "b"), (1, "a")].into();
        assert_eq!(format!("{map}"), "{1: a, 2: b}");
        assert_eq!(format!("{map:?}"), "{1: \"a\", 2: \"b\"}");
        let empty: TreeMap<i32, i32> = TreeMap::new();
        assert_eq!(format!("{empty}"), "{}");
    }

    #[rstest]
    fn test_values_mut_and_into_iter() {
        let mut map = scenario_map();
        for value in map.values_mut() {
            value.make_ascii_uppercase();
        }
        let values: Vec<String> = map.into_iter().map(|(_, value)| value).collect();
        assert_eq!(values, vec!["V1", "V3", "V4", "V5", "V7", "V8", "V9"]);
    }
}
