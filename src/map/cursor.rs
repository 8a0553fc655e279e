//! Positions, cursors and iterators.
//!
//! A [`Position`] is a detached handle to one node: it does not borrow the
//! map, compares by node identity, and stays valid until that particular
//! entry is erased. Erasing *other* entries never invalidates it. Using a
//! position after its entry was erased, or on a map other than the one that
//! issued it, is detected and reported as
//! [`MapError::StalePosition`](super::MapError::StalePosition) by the checked
//! operations.
//!
//! A [`Cursor`] borrows the map and moves between positions in either
//! direction. The iterators walk the tree through the same navigator, one
//! node per step, without collecting anything up front (the mutable and
//! owning iterators excepted, see [`IterMut`]).

use std::fmt;
use std::iter::FusedIterator;

use super::node::{NodeArena, NodeId};

// =============================================================================
// Position
// =============================================================================

/// A handle to one position of a [`TreeMap`](super::TreeMap): an entry, or
/// one of the two boundary positions [`end`](super::TreeMap::end) and
/// [`rend`](super::TreeMap::rend).
///
/// # Examples
///
/// ```rust
/// use rbmap::map::TreeMap;
///
/// let mut map = TreeMap::new();
/// let (two, inserted) = map.insert(2, "two");
/// assert!(inserted);
/// map.insert(1, "one");
/// map.insert(3, "three");
///
/// assert_eq!(map.find(&2), two);
/// assert_eq!(map.next(two), map.find(&3));
/// assert_eq!(map.prev(map.begin()), map.rend());
///
/// // Erasing other entries keeps `two` valid.
/// map.erase(&1);
/// map.erase(&3);
/// assert_eq!(map.get_at(two), Some((&2, &"two")));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Position {
    owner: u32,
    id: NodeId,
    generation: u32,
}

impl Position {
    #[inline]
    pub(crate) const fn new(owner: u32, id: NodeId, generation: u32) -> Self {
        Self {
            owner,
            id,
            generation,
        }
    }

    #[inline]
    pub(crate) const fn owner(self) -> u32 {
        self.owner
    }

    #[inline]
    pub(crate) const fn id(self) -> NodeId {
        self.id
    }

    #[inline]
    pub(crate) const fn generation(self) -> u32 {
        self.generation
    }

    /// Returns `true` for the `end()` and `rend()` positions.
    #[inline]
    #[must_use]
    pub const fn is_boundary(self) -> bool {
        self.id.is_sentinel()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            NodeId::PRE_FIRST => write!(formatter, "rend"),
            NodeId::POST_LAST => write!(formatter, "end"),
            id => write!(formatter, "slot {}#{}", id.index(), self.generation),
        }
    }
}

// =============================================================================
// Cursor
// =============================================================================

/// A read-only cursor over a [`TreeMap`](super::TreeMap).
///
/// The cursor can rest on any entry or on either boundary position. Moving
/// forward past the last entry lands on `end()`, where it stays; moving
/// backward past the first entry lands on `rend()`. Two cursors are equal
/// when they rest on the same node of the same map.
///
/// # Examples
///
/// ```rust
/// use rbmap::map::TreeMap;
///
/// let map: TreeMap<i32, char> = [(1, 'a'), (2, 'b'), (3, 'c')].into();
/// let mut cursor = map.cursor_front();
///
/// assert_eq!(cursor.entry(), Some((&1, &'a')));
/// cursor.move_next();
/// cursor.move_next();
/// assert_eq!(cursor.key(), Some(&3));
/// cursor.move_next();
/// assert!(cursor.is_end());
/// cursor.move_prev();
/// assert_eq!(cursor.value(), Some(&'c'));
/// ```
pub struct Cursor<'a, K, V> {
    nodes: &'a NodeArena<K, V>,
    current: NodeId,
}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(crate) const fn new(nodes: &'a NodeArena<K, V>, current: NodeId) -> Self {
        Self { nodes, current }
    }

    /// The position the cursor rests on.
    #[must_use]
    pub fn position(&self) -> Position {
        self.nodes.position(self.current)
    }

    /// The entry under the cursor, or `None` on a boundary position.
    #[must_use]
    pub fn entry(&self) -> Option<(&'a K, &'a V)> {
        self.nodes.entry(self.current)
    }

    /// The key under the cursor.
    #[must_use]
    pub fn key(&self) -> Option<&'a K> {
        self.nodes.key(self.current)
    }

    /// The value under the cursor.
    #[must_use]
    pub fn value(&self) -> Option<&'a V> {
        self.entry().map(|(_, value)| value)
    }

    /// Returns `true` if the cursor rests on `end()`.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.current == NodeId::POST_LAST
    }

    /// Returns `true` if the cursor rests on `rend()`.
    #[must_use]
    pub fn is_rend(&self) -> bool {
        self.current == NodeId::PRE_FIRST
    }

    /// Moves to the next position in key order.
    pub fn move_next(&mut self) {
        self.current = self.nodes.successor(self.current);
    }

    /// Moves to the previous position in key order.
    pub fn move_prev(&mut self) {
        self.current = self.nodes.predecessor(self.current);
    }

    /// The entry one step forward, without moving.
    #[must_use]
    pub fn peek_next(&self) -> Option<(&'a K, &'a V)> {
        self.nodes.entry(self.nodes.successor(self.current))
    }

    /// The entry one step backward, without moving.
    #[must_use]
    pub fn peek_prev(&self) -> Option<(&'a K, &'a V)> {
        self.nodes.entry(self.nodes.predecessor(self.current))
    }
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Cursor<'_, K, V> {}

impl<K, V> PartialEq for Cursor<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.nodes, other.nodes) && self.current == other.current
    }
}

impl<K, V> Eq for Cursor<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Cursor")
            .field("position", &self.position())
            .field("entry", &self.entry())
            .finish()
    }
}

// =============================================================================
// Range (shared walking core)
// =============================================================================

/// An iterator over a contiguous run of entries of a
/// [`TreeMap`](super::TreeMap), in key order.
///
/// Created by [`TreeMap::range`](super::TreeMap::range). `front` is the next
/// node to yield from the front; `back` is one past the next node to yield
/// from the back.
pub struct Range<'a, K, V> {
    nodes: &'a NodeArena<K, V>,
    front: NodeId,
    back: NodeId,
}

impl<'a, K, V> Range<'a, K, V> {
    pub(crate) const fn new(nodes: &'a NodeArena<K, V>, front: NodeId, back: NodeId) -> Self {
        Self { nodes, front, back }
    }

    pub(crate) const fn empty(nodes: &'a NodeArena<K, V>) -> Self {
        Self::new(nodes, NodeId::POST_LAST, NodeId::POST_LAST)
    }
}

impl<'a, K, V> Iterator for Range<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        let current = self.front;
        self.front = self.nodes.successor(current);
        self.nodes.entry(current)
    }
}

impl<K, V> DoubleEndedIterator for Range<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }
        self.back = self.nodes.predecessor(self.back);
        self.nodes.entry(self.back)
    }
}

impl<K, V> FusedIterator for Range<'_, K, V> {}

impl<K, V> Clone for Range<'_, K, V> {
    fn clone(&self) -> Self {
        Self::new(self.nodes, self.front, self.back)
    }
}

// =============================================================================
// Iter
// =============================================================================

/// An iterator over the entries of a [`TreeMap`](super::TreeMap), in key
/// order.
pub struct Iter<'a, K, V> {
    range: Range<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(nodes: &'a NodeArena<K, V>, length: usize) -> Self {
        Self {
            range: Range::new(nodes, nodes.first(), NodeId::POST_LAST),
            remaining: length,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.range.next()?;
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let entry = self.range.next_back()?;
        self.remaining -= 1;
        Some(entry)
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            range: self.range.clone(),
            remaining: self.remaining,
        }
    }
}

// =============================================================================
// IterMut / IntoIter
// =============================================================================

/// A mutable iterator over the entries of a [`TreeMap`](super::TreeMap), in
/// key order.
///
/// Handing out several `&mut V` into one arena at once needs the borrows to
/// be split up front, so construction walks the tree once and collects the
/// references in key order.
pub struct IterMut<'a, K, V> {
    entries: std::vec::IntoIter<(&'a K, &'a mut V)>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(nodes: &'a mut NodeArena<K, V>, length: usize) -> Self {
        let order = in_order_slots(nodes, length);
        let mut by_slot = nodes.entries_by_slot();
        let entries: Vec<_> = order
            .into_iter()
            .filter_map(|id| by_slot[id.index()].take())
            .collect();
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IterMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.entries.next_back()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// An owning iterator over the entries of a [`TreeMap`](super::TreeMap), in
/// key order.
pub struct IntoIter<K, V> {
    entries: std::vec::IntoIter<(K, V)>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(mut nodes: NodeArena<K, V>, length: usize) -> Self {
        let order = in_order_slots(&nodes, length);
        let mut by_slot = nodes.take_entries();
        let entries: Vec<_> = order
            .into_iter()
            .filter_map(|id| by_slot[id.index()].take())
            .collect();
        Self {
            entries: entries.into_iter(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.entries.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

// =============================================================================
// Keys / Values / ValuesMut
// =============================================================================

/// An iterator over the keys of a [`TreeMap`](super::TreeMap), in order.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(crate) const fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(key, _)| key)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// An iterator over the values of a [`TreeMap`](super::TreeMap), in key
/// order.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Values<'a, K, V> {
    pub(crate) const fn new(inner: Iter<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of a [`TreeMap`](super::TreeMap), in
/// key order.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> ValuesMut<'a, K, V> {
    pub(crate) const fn new(inner: IterMut<'a, K, V>) -> Self {
        Self { inner }
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for ValuesMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, value)| value)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

/// Slot ids of every entry, in key order.
fn in_order_slots<K, V>(nodes: &NodeArena<K, V>, length: usize) -> Vec<NodeId> {
    let mut order = Vec::with_capacity(length);
    let mut current = nodes.first();
    while current != NodeId::POST_LAST {
        order.push(current);
        current = nodes.successor(current);
    }
    order
}

#[cfg(test)]
mod tests {
    use crate::map::TreeMap;
    use rstest::rstest;

    fn sample() -> TreeMap<i32, String> {
        [5, 3, 8, 1, 4, 7, 9]
            .into_iter()
            .map(|key| (key, key.to_string()))
            .collect()
    }

    #[rstest]
    fn test_iter_is_exact_size_and_sorted() {
        let map = sample();
        let mut iter = map.iter();
        assert_eq!(iter.len(), 7);
        assert_eq!(iter.next(), Some((&1, &"1".to_string())));
        assert_eq!(iter.next_back(), Some((&9, &"9".to_string())));
        assert_eq!(iter.len(), 5);
        let rest: Vec<i32> = iter.map(|(key, _)| *key).collect();
        assert_eq!(rest, vec![3, 4, 5, 7, 8]);
    }

    #[rstest]
    fn test_iter_meets_in_the_middle() {
        let map = sample();
        let mut iter = map.iter();
        let mut keys = Vec::new();
        loop {
            match (iter.next(), iter.next_back()) {
                (Some((front, _)), Some((back, _))) => {
                    keys.push(*front);
                    keys.push(*back);
                }
                (Some((front, _)), None) => keys.push(*front),
                _ => break,
            }
        }
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 3, 4, 5, 7, 8, 9]);
    }

    #[rstest]
    fn test_cursor_walks_both_directions() {
        let map = sample();
        let mut cursor = map.cursor_back();
        assert_eq!(cursor.key(), Some(&9));
        cursor.move_prev();
        assert_eq!(cursor.key(), Some(&8));
        assert_eq!(cursor.peek_next().map(|(key, _)| *key), Some(9));
        assert_eq!(cursor.peek_prev().map(|(key, _)| *key), Some(7));

        let mut front = map.cursor_front();
        front.move_prev();
        assert!(front.is_rend());
        assert_eq!(front.entry(), None);
        front.move_prev();
        assert!(front.is_rend());
        front.move_next();
        assert_eq!(front.key(), Some(&1));
    }

    #[rstest]
    fn test_cursor_equality_is_node_identity() {
        let map = sample();
        let other = sample();
        assert_eq!(map.cursor(map.find(&4)), map.cursor(map.find(&4)));
        assert_ne!(map.cursor(map.find(&4)), map.cursor(map.find(&5)));
        assert_ne!(map.cursor_front(), other.cursor_front());
    }

    #[rstest]
    fn test_iter_mut_updates_in_key_order() {
        let mut map = sample();
        let mut seen = Vec::new();
        for (key, value) in map.iter_mut() {
            seen.push(*key);
            value.push('!');
        }
        assert_eq!(seen, vec![1, 3, 4, 5, 7, 8, 9]);
        assert_eq!(map.get(&7), Some(&"7!".to_string()));
    }

    #[rstest]
    fn test_into_iter_yields_owned_entries_in_order() {
        let entries: Vec<(i32, String)> = sample().into_iter().rev().collect();
        let keys: Vec<i32> = entries.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![9, 8, 7, 5, 4, 3, 1]);
    }

    #[rstest]
    fn test_position_display() {
        let map = sample();
        assert_eq!(map.end().to_string(), "end");
        assert_eq!(map.rend().to_string(), "rend");
        assert!(map.find(&4).to_string().starts_with("slot "));
    }
}
