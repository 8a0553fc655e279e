//! Structural invariant checking.
//!
//! [`TreeMap::validate`] walks the whole tree and reports the first broken
//! invariant it finds. It is O(N) and meant for tests, fuzzing and the
//! stress runner, not for hot paths.

use super::compare::Compare;
use super::error::InvariantViolation;
use super::node::{NodeArena, NodeId, Side};
use super::treemap::TreeMap;

/// Shape summary of a valid tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TreeShape {
    /// Number of nodes on the longest root-to-leaf path.
    pub height: usize,
    /// Number of black nodes on every root-to-leaf path.
    pub black_height: usize,
}

/// Per-subtree facts gathered bottom-up.
struct Subtree {
    height: usize,
    black_height: usize,
    entries: usize,
}

impl Subtree {
    const EMPTY: Self = Self {
        height: 0,
        black_height: 0,
        entries: 0,
    };
}

impl<K, V, C: Compare<K>> TreeMap<K, V, C> {
    /// Checks every structural invariant of the tree.
    ///
    /// - the root is black
    /// - no red node has a red child
    /// - all root-to-leaf paths hold the same number of black nodes
    /// - keys strictly increase in order under the comparator
    /// - every child links back to its parent
    /// - the recorded length matches the reachable entries
    /// - the boundary sentinels hang off the minimum and maximum
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rbmap::map::TreeMap;
    ///
    /// let map: TreeMap<i32, ()> = (0..100).map(|key| (key, ())).collect();
    /// let shape = map.validate().expect("a freshly built map is valid");
    /// // A red-black tree is at most twice as tall as a perfect one.
    /// assert!(shape.height <= 2 * 7);
    /// ```
    pub fn validate(&self) -> Result<TreeShape, InvariantViolation> {
        let Some(root) = self.nodes.root else {
            return self.validate_empty();
        };
        if self.nodes.is_red(root) {
            return Err(InvariantViolation::RedRoot);
        }
        if self.nodes.parent(root).is_some() {
            return Err(InvariantViolation::BrokenParentLink {
                position: self.nodes.position(root),
            });
        }

        let subtree = check_subtree(&self.nodes, root)?;
        if subtree.entries != self.length {
            return Err(InvariantViolation::LengthMismatch {
                recorded: self.length,
                reachable: subtree.entries,
            });
        }
        self.check_sentinels(root)?;
        self.check_order()?;

        Ok(TreeShape {
            height: subtree.height,
            black_height: subtree.black_height,
        })
    }

    fn validate_empty(&self) -> Result<TreeShape, InvariantViolation> {
        if self.length != 0 {
            return Err(InvariantViolation::LengthMismatch {
                recorded: self.length,
                reachable: 0,
            });
        }
        let linked = self.nodes.parent(NodeId::PRE_FIRST) == Some(NodeId::POST_LAST)
            && self.nodes.parent(NodeId::POST_LAST) == Some(NodeId::PRE_FIRST);
        if !linked {
            return Err(InvariantViolation::SentinelMismatch);
        }
        Ok(TreeShape::default())
    }

    fn check_sentinels(&self, root: NodeId) -> Result<(), InvariantViolation> {
        let hangs_off = |sentinel: NodeId, side: Side| {
            let extreme = self.nodes.extreme_entry(root, side);
            self.nodes.parent(sentinel) == Some(extreme)
                && self.nodes.child(extreme, side) == Some(sentinel)
        };
        if hangs_off(NodeId::PRE_FIRST, Side::Left) && hangs_off(NodeId::POST_LAST, Side::Right) {
            Ok(())
        } else {
            Err(InvariantViolation::SentinelMismatch)
        }
    }

    /// Walks the navigator from `begin()` and checks strict key order.
    fn check_order(&self) -> Result<(), InvariantViolation> {
        let mut previous = None;
        let mut current = self.nodes.first();
        while let Some(key) = self.nodes.key(current) {
            if let Some(previous) = previous
                && !self.compare.less(previous, key)
            {
                return Err(InvariantViolation::OutOfOrder {
                    position: self.nodes.position(current),
                });
            }
            previous = Some(key);
            current = self.nodes.successor(current);
        }
        Ok(())
    }
}

impl<K, V> NodeArena<K, V> {
    /// Extreme entry towards `side`, stopping short of a sentinel.
    fn extreme_entry(&self, mut id: NodeId, side: Side) -> NodeId {
        while let Some(child) = self.link(id, side) {
            id = child;
        }
        id
    }
}

/// Checks colors, black-heights and parent links below `id`.
fn check_subtree<K, V>(
    nodes: &NodeArena<K, V>,
    id: NodeId,
) -> Result<Subtree, InvariantViolation> {
    let mut sides = [Subtree::EMPTY, Subtree::EMPTY];
    for (slot, side) in sides.iter_mut().zip([Side::Left, Side::Right]) {
        let Some(child) = nodes.link(id, side) else {
            continue;
        };
        let position = nodes.position(child);
        if nodes.parent(child) != Some(id) {
            return Err(InvariantViolation::BrokenParentLink { position });
        }
        if nodes.is_red(id) && nodes.is_red(child) {
            return Err(InvariantViolation::RedChildOfRed { position });
        }
        *slot = check_subtree(nodes, child)?;
    }

    let [left, right] = sides;
    if left.black_height != right.black_height {
        return Err(InvariantViolation::BlackHeightMismatch {
            position: nodes.position(id),
            left: left.black_height,
            right: right.black_height,
        });
    }
    Ok(Subtree {
        height: 1 + left.height.max(right.height),
        black_height: left.black_height + usize::from(!nodes.is_red(id)),
        entries: 1 + left.entries + right.entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::node::Color;
    use rstest::rstest;

    fn sample() -> TreeMap<i32, ()> {
        [5, 3, 8, 1, 4, 7, 9].into_iter().map(|key| (key, ())).collect()
    }

    #[rstest]
    fn test_valid_tree_reports_shape() {
        // 5(B) -> 3(B) -> {1(R), 4(R)}, 8(B) -> {7(R), 9(R)}
        assert_eq!(
            sample().validate(),
            Ok(TreeShape {
                height: 3,
                black_height: 2
            })
        );
    }

    #[rstest]
    fn test_empty_tree_is_valid() {
        let map: TreeMap<i32, ()> = TreeMap::new();
        assert_eq!(map.validate(), Ok(TreeShape::default()));
    }

    #[rstest]
    fn test_red_root_is_detected() {
        let mut map = sample();
        if let Some(root) = map.nodes.root {
            map.nodes.set_color(root, Color::Red);
        }
        assert_eq!(map.validate(), Err(InvariantViolation::RedRoot));
    }

    #[rstest]
    fn test_length_mismatch_is_detected() {
        let mut map = sample();
        map.length += 1;
        assert_eq!(
            map.validate(),
            Err(InvariantViolation::LengthMismatch {
                recorded: 8,
                reachable: 7
            })
        );
    }

    #[rstest]
    fn test_black_height_mismatch_is_detected() {
        let mut map = sample();
        let one = map.nodes.first();
        map.nodes.set_color(one, Color::Black);
        assert!(matches!(
            map.validate(),
            Err(InvariantViolation::BlackHeightMismatch { left: 1, right: 0, .. })
        ));
    }

    #[rstest]
    fn test_out_of_order_comparator_is_detected() {
        // Built ascending, then checked against a map whose comparator
        // disagrees with the stored order.
        let ascending = sample();
        let descending = TreeMap {
            nodes: ascending.nodes,
            length: ascending.length,
            compare: |left: &i32, right: &i32| left > right,
        };
        assert!(matches!(
            descending.validate(),
            Err(InvariantViolation::OutOfOrder { .. })
        ));
    }
}
