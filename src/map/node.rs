//! Tree nodes and the slot arena that owns them.
//!
//! Every node of a [`TreeMap`](super::TreeMap) lives in a `Vec`-backed arena
//! and is addressed by a [`NodeId`]. Parent, left and right links are stored
//! as indices, so the parent back-reference never dangles when a node is
//! released and its slot reused.
//!
//! # Reserved Slots
//!
//! The first three slots are allocated once when the arena is created and are
//! never released:
//!
//! | Slot | Role                                                      |
//! |------|-----------------------------------------------------------|
//! | 0    | `pre-first` boundary sentinel                             |
//! | 1    | `post-last` boundary sentinel                             |
//! | 2    | black placeholder that stands in for a missing child on erase |
//!
//! # Generations
//!
//! Each slot carries a generation counter that is bumped whenever the slot is
//! released. A [`Position`] remembers the generation it was created with, so a
//! position to an erased entry is recognised as stale even after the slot is
//! handed out again.
//!
//! Every arena also draws an owner tag from a process-wide counter. Positions
//! carry it, so a position handed out by one map is rejected by another.

use std::sync::atomic::{AtomicU32, Ordering};

use super::cursor::Position;
use super::error::MapError;

static NEXT_OWNER: AtomicU32 = AtomicU32::new(0);

// =============================================================================
// Color and Side
// =============================================================================

/// The color of a Red-Black Tree node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Color {
    Red,
    Black,
}

/// One of the two child links of a node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    /// Returns the mirror side.
    #[inline]
    pub(crate) const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

// =============================================================================
// NodeId
// =============================================================================

/// Index of a slot in the node arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct NodeId(u32);

impl NodeId {
    /// The sentinel reached by stepping backwards past the first entry.
    pub(crate) const PRE_FIRST: Self = Self(0);
    /// The sentinel reached by stepping forwards past the last entry.
    pub(crate) const POST_LAST: Self = Self(1);
    /// Color-only stand-in for an absent child during erase.
    pub(crate) const PLACEHOLDER: Self = Self(2);

    const RESERVED: u32 = 3;

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns `true` for the two boundary sentinels.
    #[inline]
    pub(crate) const fn is_sentinel(self) -> bool {
        self.0 == Self::PRE_FIRST.0 || self.0 == Self::POST_LAST.0
    }

    /// Returns `true` for slots that never hold an entry.
    #[inline]
    pub(crate) const fn is_reserved(self) -> bool {
        self.0 < Self::RESERVED
    }
}

// =============================================================================
// Node Definition
// =============================================================================

/// Internal node structure for the Red-Black Tree.
pub(crate) struct Node<K, V> {
    /// `None` for reserved slots and for released slots.
    pub(crate) entry: Option<(K, V)>,
    pub(crate) color: Color,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) generation: u32,
}

impl<K, V> Node<K, V> {
    /// Creates a black node without an entry, used for the reserved slots.
    const fn boundary() -> Self {
        Self {
            entry: None,
            color: Color::Black,
            left: None,
            right: None,
            parent: None,
            generation: 0,
        }
    }

    #[inline]
    pub(crate) const fn child(&self, side: Side) -> Option<NodeId> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub(crate) const fn set_child(&mut self, side: Side, child: Option<NodeId>) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }
}

// =============================================================================
// NodeArena
// =============================================================================

/// Slot storage for the nodes of one tree, plus its root link.
pub(crate) struct NodeArena<K, V> {
    owner: u32,
    slots: Vec<Node<K, V>>,
    free: Vec<NodeId>,
    pub(crate) root: Option<NodeId>,
}

impl<K, V> NodeArena<K, V> {
    /// Creates an arena holding only the reserved slots, with the two
    /// sentinels pointing at each other.
    pub(crate) fn new() -> Self {
        let mut slots = Vec::with_capacity(NodeId::RESERVED as usize);
        slots.push(Node::boundary());
        slots.push(Node::boundary());
        slots.push(Node::boundary());
        slots[NodeId::PRE_FIRST.index()].parent = Some(NodeId::POST_LAST);
        slots[NodeId::POST_LAST.index()].parent = Some(NodeId::PRE_FIRST);
        Self {
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            slots,
            free: Vec::new(),
            root: None,
        }
    }

    /// Allocates a red node holding `key` and `value` under `parent`.
    ///
    /// Only the new node's own fields are written; linking it into the
    /// parent is left to the caller.
    pub(crate) fn allocate(&mut self, key: K, value: V, parent: Option<NodeId>) -> NodeId {
        let fresh = |generation| Node {
            entry: Some((key, value)),
            color: Color::Red,
            left: None,
            right: None,
            parent,
            generation,
        };
        if let Some(id) = self.free.pop() {
            let slot = &mut self.slots[id.index()];
            *slot = fresh(slot.generation);
            return id;
        }
        let Ok(index) = u32::try_from(self.slots.len()) else {
            capacity_overflow();
        };
        self.slots.push(fresh(0));
        NodeId(index)
    }

    /// Takes the entry out of `id` and returns the slot to the free list.
    ///
    /// Links are left untouched so an in-order walk that is already past
    /// `id` can keep following them; [`allocate`](Self::allocate) rewrites
    /// every field on reuse.
    pub(crate) fn release(&mut self, id: NodeId) -> Option<(K, V)> {
        debug_assert!(!id.is_reserved(), "reserved slot {id:?} cannot be released");
        let slot = &mut self.slots[id.index()];
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id);
        Some(entry)
    }

    // =========================================================================
    // Positions
    // =========================================================================

    /// Returns a position handle for `id` at its current generation.
    #[inline]
    pub(crate) fn position(&self, id: NodeId) -> Position {
        Position::new(self.owner, id, self.slots[id.index()].generation)
    }

    /// Resolves a position to a slot, accepting sentinels but rejecting
    /// positions whose entry has been erased or that another arena issued.
    pub(crate) fn locate(&self, position: Position) -> Result<NodeId, MapError> {
        if position.owner() != self.owner {
            return Err(MapError::StalePosition);
        }
        let id = position.id();
        match self.slots.get(id.index()) {
            Some(slot)
                if slot.generation == position.generation()
                    && (id.is_sentinel() || slot.entry.is_some()) =>
            {
                Ok(id)
            }
            _ => Err(MapError::StalePosition),
        }
    }

    /// Resolves a position to a slot that holds an entry.
    pub(crate) fn resolve(&self, position: Position) -> Result<NodeId, MapError> {
        let id = self.locate(position)?;
        if id.is_sentinel() {
            return Err(MapError::EndPosition);
        }
        Ok(id)
    }

    // =========================================================================
    // Field Accessors
    // =========================================================================

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.slots[id.index()]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        &mut self.slots[id.index()]
    }

    #[inline]
    pub(crate) fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[inline]
    pub(crate) fn child(&self, id: NodeId, side: Side) -> Option<NodeId> {
        self.node(id).child(side)
    }

    #[inline]
    pub(crate) fn set_child(&mut self, id: NodeId, side: Side, child: Option<NodeId>) {
        self.node_mut(id).set_child(side, child);
    }

    /// Child link that skips the boundary sentinels, for key-guided descents
    /// performed while the sentinels are attached.
    #[inline]
    pub(crate) fn link(&self, id: NodeId, side: Side) -> Option<NodeId> {
        self.child(id, side).filter(|child| !child.is_sentinel())
    }

    #[inline]
    pub(crate) fn color(&self, id: NodeId) -> Color {
        self.node(id).color
    }

    #[inline]
    pub(crate) fn set_color(&mut self, id: NodeId, color: Color) {
        self.node_mut(id).color = color;
    }

    #[inline]
    pub(crate) fn is_red(&self, id: NodeId) -> bool {
        self.color(id) == Color::Red
    }

    /// Absent links count as black leaves.
    #[inline]
    pub(crate) fn is_red_link(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|id| self.is_red(id))
    }

    #[inline]
    pub(crate) fn key(&self, id: NodeId) -> Option<&K> {
        self.node(id).entry.as_ref().map(|(key, _)| key)
    }

    #[inline]
    pub(crate) fn entry(&self, id: NodeId) -> Option<(&K, &V)> {
        self.node(id).entry.as_ref().map(|(key, value)| (key, value))
    }

    #[inline]
    pub(crate) fn entry_mut(&mut self, id: NodeId) -> Option<(&K, &mut V)> {
        self.node_mut(id)
            .entry
            .as_mut()
            .map(|(key, value)| (&*key, value))
    }

    /// Value of a slot the caller has just found or filled.
    pub(crate) fn occupied_value_mut(&mut self, id: NodeId) -> &mut V {
        match &mut self.node_mut(id).entry {
            Some((_, value)) => value,
            None => unreachable!("slot {id:?} was expected to hold an entry"),
        }
    }

    /// Borrows every occupied slot's entry at once, indexed by slot.
    pub(crate) fn entries_by_slot(&mut self) -> Vec<Option<(&K, &mut V)>> {
        self.slots
            .iter_mut()
            .map(|slot| slot.entry.as_mut().map(|(key, value)| (&*key, value)))
            .collect()
    }

    /// Takes every entry out of the arena, indexed by slot.
    pub(crate) fn take_entries(&mut self) -> Vec<Option<(K, V)>> {
        self.slots.iter_mut().map(|slot| slot.entry.take()).collect()
    }

    /// Number of slots ever allocated, reserved ones included.
    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

#[cold]
#[inline(never)]
fn capacity_overflow() -> ! {
    panic!("node arena cannot address more than u32::MAX slots");
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_new_arena_links_sentinels_to_each_other() {
        let arena: NodeArena<i32, i32> = NodeArena::new();
        assert_eq!(arena.parent(NodeId::PRE_FIRST), Some(NodeId::POST_LAST));
        assert_eq!(arena.parent(NodeId::POST_LAST), Some(NodeId::PRE_FIRST));
        assert_eq!(arena.color(NodeId::PRE_FIRST), Color::Black);
        assert_eq!(arena.color(NodeId::POST_LAST), Color::Black);
        assert_eq!(arena.color(NodeId::PLACEHOLDER), Color::Black);
        assert!(arena.root.is_none());
    }

    #[rstest]
    fn test_allocate_creates_red_node_with_parent() {
        let mut arena = NodeArena::new();
        let parent = arena.allocate(1, "one", None);
        let child = arena.allocate(2, "two", Some(parent));
        assert!(arena.is_red(child));
        assert_eq!(arena.parent(child), Some(parent));
        assert_eq!(arena.entry(child), Some((&2, &"two")));
    }

    #[rstest]
    fn test_release_reuses_slot_with_new_generation() {
        let mut arena = NodeArena::new();
        let id = arena.allocate(1, 10, None);
        let before = arena.position(id);

        assert_eq!(arena.release(id), Some((1, 10)));
        assert_eq!(arena.locate(before), Err(MapError::StalePosition));

        let reused = arena.allocate(2, 20, None);
        assert_eq!(reused, id);
        assert_eq!(arena.slot_count(), 4);
        assert_eq!(arena.locate(before), Err(MapError::StalePosition));
        assert_eq!(arena.locate(arena.position(reused)), Ok(reused));
    }

    #[rstest]
    fn test_locate_rejects_positions_of_another_arena() {
        let mut first = NodeArena::new();
        let mut second = NodeArena::new();
        let theirs = first.allocate(1, 10, None);
        let ours = second.allocate(2, 20, None);
        assert_eq!(theirs, ours);

        let foreign = first.position(theirs);
        assert_eq!(second.locate(foreign), Err(MapError::StalePosition));
        assert_eq!(
            second.locate(first.position(NodeId::POST_LAST)),
            Err(MapError::StalePosition)
        );
        assert_eq!(second.locate(second.position(ours)), Ok(ours));
    }

    #[rstest]
    #[case(NodeId::PRE_FIRST)]
    #[case(NodeId::POST_LAST)]
    fn test_resolve_rejects_sentinels(#[case] sentinel: NodeId) {
        let arena: NodeArena<i32, i32> = NodeArena::new();
        let position = arena.position(sentinel);
        assert_eq!(arena.locate(position), Ok(sentinel));
        assert_eq!(arena.resolve(position), Err(MapError::EndPosition));
    }

    #[rstest]
    fn test_link_skips_sentinels() {
        let mut arena: NodeArena<i32, i32> = NodeArena::new();
        let id = arena.allocate(1, 1, None);
        arena.set_child(id, Side::Left, Some(NodeId::PRE_FIRST));
        assert_eq!(arena.child(id, Side::Left), Some(NodeId::PRE_FIRST));
        assert_eq!(arena.link(id, Side::Left), None);
    }

    #[rstest]
    fn test_side_opposite() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Right.opposite(), Side::Left);
    }
}
