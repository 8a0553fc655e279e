//! Rotations and the red-black fixups that follow insert and erase.
//!
//! Every procedure here is written once over a [`Side`] and its
//! [`opposite`](Side::opposite); the left and right cases of the classic
//! formulation are the two values of that parameter. All of them expect the
//! boundary sentinels to be detached (see [`Detached`](super::sentinel::Detached)).

use tracing::trace;

use super::node::{Color, NodeArena, NodeId, Side};

impl<K, V> NodeArena<K, V> {
    /// Points whichever link referenced `old` at `new`: the matching child
    /// link of `parent`, or the root link when `parent` is `None`.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: NodeId) {
        match parent {
            None => self.root = Some(new),
            Some(parent) => {
                if self.child(parent, Side::Left) == Some(old) {
                    self.set_child(parent, Side::Left, Some(new));
                } else {
                    self.set_child(parent, Side::Right, Some(new));
                }
            }
        }
    }

    /// Rotates `node` down towards `side`; its child on the opposite side
    /// takes its place.
    ///
    /// `rotate(node, Side::Left)` is the textbook left rotation.
    pub(crate) fn rotate(&mut self, node: NodeId, side: Side) {
        let other = side.opposite();
        let Some(pivot) = self.child(node, other) else {
            debug_assert!(false, "rotation at {node:?} without a {other:?} child");
            return;
        };
        trace!("rotate {side:?} at {node:?}");

        let inner = self.child(pivot, side);
        self.set_child(node, other, inner);
        if let Some(inner) = inner {
            self.node_mut(inner).parent = Some(node);
        }

        let parent = self.parent(node);
        self.node_mut(pivot).parent = parent;
        self.replace_child(parent, node, pivot);

        self.set_child(pivot, side, Some(node));
        self.node_mut(node).parent = Some(pivot);
    }

    #[cfg(test)]
    pub(crate) fn rotate_left(&mut self, node: NodeId) {
        self.rotate(node, Side::Left);
    }

    #[cfg(test)]
    pub(crate) fn rotate_right(&mut self, node: NodeId) {
        self.rotate(node, Side::Right);
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Restores the red-black invariants after `node` was linked in red.
    pub(crate) fn insert_fixup(&mut self, mut node: NodeId) {
        while let Some(parent) = self.parent(node)
            && self.is_red(parent)
        {
            // A red parent is never the root.
            let (Some(grandparent), Some(side)) = (self.parent(parent), self.side_of(parent))
            else {
                break;
            };
            let uncle = self.child(grandparent, side.opposite());

            if let Some(uncle) = uncle
                && self.is_red(uncle)
            {
                trace!("insert fixup at {node:?}: red uncle, recolor");
                self.set_color(parent, Color::Black);
                self.set_color(uncle, Color::Black);
                self.set_color(grandparent, Color::Red);
                node = grandparent;
                continue;
            }

            if self.side_of(node) == Some(side.opposite()) {
                trace!("insert fixup at {node:?}: inner grandchild, rotate parent");
                node = parent;
                self.rotate(node, side);
            }

            trace!("insert fixup at {node:?}: outer grandchild, rotate grandparent");
            let (Some(parent), Some(grandparent)) = (
                self.parent(node),
                self.parent(node).and_then(|parent| self.parent(parent)),
            ) else {
                break;
            };
            self.set_color(parent, Color::Black);
            self.set_color(grandparent, Color::Red);
            self.rotate(grandparent, side.opposite());
        }

        if let Some(root) = self.root {
            self.set_color(root, Color::Black);
        }
    }

    // =========================================================================
    // Erase
    // =========================================================================

    /// Removes `target` from the tree shape and rebalances.
    ///
    /// With fewer than two children `target` itself is spliced out. With two,
    /// its in-order successor is spliced out of its own position and then
    /// relinked into `target`'s position, taking over its links and color, so
    /// every surviving entry keeps its slot. The caller still owns `target`'s
    /// slot and entry afterwards.
    pub(crate) fn splice_out(&mut self, target: NodeId) {
        let spliced = match (
            self.child(target, Side::Left),
            self.child(target, Side::Right),
        ) {
            (Some(_), Some(right)) => self.leftmost(right),
            _ => target,
        };

        let child = self
            .child(spliced, Side::Left)
            .or(self.child(spliced, Side::Right));
        let replacement = match child {
            Some(child) => child,
            None => self.reset_placeholder(),
        };
        let parent = self.parent(spliced);
        self.node_mut(replacement).parent = parent;
        self.replace_child(parent, spliced, replacement);

        let removed_color = self.color(spliced);
        if spliced != target {
            self.transplant(target, spliced);
        }
        if removed_color == Color::Black {
            self.erase_fixup(replacement);
        }
        if replacement == NodeId::PLACEHOLDER {
            self.unlink_placeholder();
        }
    }

    /// Moves `node` into the structural position of `target`.
    fn transplant(&mut self, target: NodeId, node: NodeId) {
        let parent = self.parent(target);
        self.node_mut(node).parent = parent;
        self.replace_child(parent, target, node);

        for side in [Side::Left, Side::Right] {
            let child = self.child(target, side);
            self.set_child(node, side, child);
            if let Some(child) = child {
                self.node_mut(child).parent = Some(node);
            }
        }
        let color = self.color(target);
        self.set_color(node, color);
    }

    fn reset_placeholder(&mut self) -> NodeId {
        let placeholder = self.node_mut(NodeId::PLACEHOLDER);
        placeholder.color = Color::Black;
        placeholder.left = None;
        placeholder.right = None;
        placeholder.parent = None;
        NodeId::PLACEHOLDER
    }

    fn unlink_placeholder(&mut self) {
        match self.parent(NodeId::PLACEHOLDER) {
            None => {
                if self.root == Some(NodeId::PLACEHOLDER) {
                    self.root = None;
                }
            }
            Some(parent) => {
                for side in [Side::Left, Side::Right] {
                    if self.child(parent, side) == Some(NodeId::PLACEHOLDER) {
                        self.set_child(parent, side, None);
                    }
                }
            }
        }
        self.reset_placeholder();
    }

    /// Restores the red-black invariants after a black node was spliced
    /// out; `node` is the node that took its place and carries the missing
    /// black.
    pub(crate) fn erase_fixup(&mut self, mut node: NodeId) {
        while self.root != Some(node) && !self.is_red(node) {
            let (Some(parent), Some(side)) = (self.parent(node), self.side_of(node)) else {
                break;
            };
            let other = side.opposite();
            let Some(mut sibling) = self.child(parent, other) else {
                debug_assert!(false, "double-black {node:?} without a sibling");
                break;
            };

            if self.is_red(sibling) {
                trace!("erase fixup at {node:?}: red sibling, rotate towards it");
                self.set_color(sibling, Color::Black);
                self.set_color(parent, Color::Red);
                self.rotate(parent, side);
                let Some(next) = self.child(parent, other) else {
                    break;
                };
                sibling = next;
            }

            let near = self.child(sibling, side);
            let far = self.child(sibling, other);
            if !self.is_red_link(near) && !self.is_red_link(far) {
                trace!("erase fixup at {node:?}: black nephews, push black up");
                self.set_color(sibling, Color::Red);
                node = parent;
                continue;
            }

            if !self.is_red_link(far) {
                trace!("erase fixup at {node:?}: red near nephew, rotate sibling");
                if let Some(near) = near {
                    self.set_color(near, Color::Black);
                }
                self.set_color(sibling, Color::Red);
                self.rotate(sibling, other);
                let Some(next) = self.child(parent, other) else {
                    break;
                };
                sibling = next;
            }

            trace!("erase fixup at {node:?}: red far nephew, rotate parent");
            let parent_color = self.color(parent);
            self.set_color(sibling, parent_color);
            self.set_color(parent, Color::Black);
            if let Some(far) = self.child(sibling, other) {
                self.set_color(far, Color::Black);
            }
            self.rotate(parent, side);
            break;
        }

        self.set_color(node, Color::Black);
    }
}
