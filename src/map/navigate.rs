//! In-order navigation over parent links.
//!
//! No explicit stack or recursion: every step walks child links down or
//! parent links up. The boundary sentinels are valid inputs and outputs, so
//! these functions double as iterator increment and decrement.

use super::node::{NodeArena, NodeId, Side};

impl<K, V> NodeArena<K, V> {
    /// Descends along `side` links from `id` as far as possible.
    pub(crate) fn extreme(&self, mut id: NodeId, side: Side) -> NodeId {
        while let Some(child) = self.child(id, side) {
            id = child;
        }
        id
    }

    #[inline]
    pub(crate) fn leftmost(&self, id: NodeId) -> NodeId {
        self.extreme(id, Side::Left)
    }

    #[inline]
    pub(crate) fn rightmost(&self, id: NodeId) -> NodeId {
        self.extreme(id, Side::Right)
    }

    /// Returns which child of its parent `id` is, or `None` at the root.
    pub(crate) fn side_of(&self, id: NodeId) -> Option<Side> {
        let parent = self.parent(id)?;
        if self.child(parent, Side::Left) == Some(id) {
            Some(Side::Left)
        } else {
            Some(Side::Right)
        }
    }

    /// Steps one position towards `side`: the next node for `Right`, the
    /// previous one for `Left`.
    ///
    /// If there is a subtree on `side`, the answer is its extreme node on
    /// the opposite side. Otherwise climb while the current node is itself a
    /// `side` child; the parent reached by the first opposite step is the
    /// answer. Running out of parents means there is nothing further, which
    /// only happens while the sentinels are detached.
    fn step(&self, id: NodeId, side: Side) -> NodeId {
        if let Some(child) = self.child(id, side) {
            return self.extreme(child, side.opposite());
        }
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            if self.child(parent, side) != Some(current) {
                return parent;
            }
            current = parent;
        }
        match side {
            Side::Right => NodeId::POST_LAST,
            Side::Left => NodeId::PRE_FIRST,
        }
    }

    /// In-order successor.
    ///
    /// `post-last` is its own successor and the successor of `pre-first` is
    /// the first entry (or `post-last` when empty).
    pub(crate) fn successor(&self, id: NodeId) -> NodeId {
        match id {
            NodeId::POST_LAST => NodeId::POST_LAST,
            NodeId::PRE_FIRST => self.first(),
            _ => self.step(id, Side::Right),
        }
    }

    /// In-order predecessor, the mirror of [`successor`](Self::successor).
    pub(crate) fn predecessor(&self, id: NodeId) -> NodeId {
        match id {
            NodeId::PRE_FIRST => NodeId::PRE_FIRST,
            NodeId::POST_LAST => self.last(),
            _ => self.step(id, Side::Left),
        }
    }

    /// The first entry, or `post-last` when the tree is empty. O(1).
    #[inline]
    pub(crate) fn first(&self) -> NodeId {
        self.parent(NodeId::PRE_FIRST).unwrap_or(NodeId::POST_LAST)
    }

    /// The last entry, or `pre-first` when the tree is empty. O(1).
    #[inline]
    pub(crate) fn last(&self) -> NodeId {
        self.parent(NodeId::POST_LAST).unwrap_or(NodeId::PRE_FIRST)
    }
}
