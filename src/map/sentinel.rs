//! Boundary sentinels and the detach/attach protocol around mutations.
//!
//! While the tree is at rest the `pre-first` sentinel hangs off the left
//! link of the minimum node and the `post-last` sentinel off the right link
//! of the maximum node, each with its `parent` pointing back at that node.
//! This is what makes `begin()` O(1) and lets the navigator step from the
//! last entry onto `end()` without special cases.
//!
//! Rotations and splices must not see the sentinels, so every structural
//! mutation runs on a [`Detached`] view: the sentinels are unlinked when the
//! view is created and re-linked to the new minimum and maximum when it is
//! dropped, whichever way the mutation exits.

use std::ops::{Deref, DerefMut};

use super::node::{NodeArena, NodeId, Side};

impl<K, V> NodeArena<K, V> {
    /// Unlinks both sentinels from the tree shape.
    ///
    /// O(1): the sentinels' parents are the current minimum and maximum.
    pub(crate) fn detach_sentinels(&mut self) {
        if self.root.is_none() {
            return;
        }
        if let Some(first) = self.parent(NodeId::PRE_FIRST)
            && self.child(first, Side::Left) == Some(NodeId::PRE_FIRST)
        {
            self.set_child(first, Side::Left, None);
        }
        if let Some(last) = self.parent(NodeId::POST_LAST)
            && self.child(last, Side::Right) == Some(NodeId::POST_LAST)
        {
            self.set_child(last, Side::Right, None);
        }
        self.node_mut(NodeId::PRE_FIRST).parent = None;
        self.node_mut(NodeId::POST_LAST).parent = None;
    }

    /// Links the sentinels to the current minimum and maximum, or to each
    /// other when the tree is empty.
    pub(crate) fn attach_sentinels(&mut self) {
        let Some(root) = self.root else {
            self.node_mut(NodeId::PRE_FIRST).parent = Some(NodeId::POST_LAST);
            self.node_mut(NodeId::POST_LAST).parent = Some(NodeId::PRE_FIRST);
            return;
        };

        let first = self.leftmost(root);
        self.set_child(first, Side::Left, Some(NodeId::PRE_FIRST));
        self.node_mut(NodeId::PRE_FIRST).parent = Some(first);

        let last = self.rightmost(root);
        self.set_child(last, Side::Right, Some(NodeId::POST_LAST));
        self.node_mut(NodeId::POST_LAST).parent = Some(last);
    }

    /// Detaches the sentinels for the lifetime of the returned guard.
    pub(crate) fn detached(&mut self) -> Detached<'_, K, V> {
        self.detach_sentinels();
        Detached { arena: self }
    }
}

/// Mutable view of an arena whose sentinels are detached.
///
/// Re-attaches the sentinels on drop.
pub(crate) struct Detached<'a, K, V> {
    arena: &'a mut NodeArena<K, V>,
}

impl<K, V> Deref for Detached<'_, K, V> {
    type Target = NodeArena<K, V>;

    fn deref(&self) -> &Self::Target {
        self.arena
    }
}

impl<K, V> DerefMut for Detached<'_, K, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.arena
    }
}

impl<K, V> Drop for Detached<'_, K, V> {
    fn drop(&mut self) {
        self.arena.attach_sentinels();
    }
}
