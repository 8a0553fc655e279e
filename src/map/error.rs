//! Error types for checked map access and invariant validation.

use std::fmt;

use super::cursor::Position;

/// Errors reported by checked [`TreeMap`](super::TreeMap) operations.
///
/// Ordinary lookup misses are not errors: [`find`](super::TreeMap::find) and
/// the bound queries return the end position instead. These variants cover
/// the operations that have nothing sensible to return on a miss.
///
/// # Examples
///
/// ```rust
/// use rbmap::map::{MapError, TreeMap};
///
/// let mut map = TreeMap::new();
/// map.insert(1, "one");
///
/// assert_eq!(map.at(&2), Err(MapError::KeyNotFound));
/// assert_eq!(map.erase_at(map.end()), Err(MapError::EndPosition));
/// assert_eq!(format!("{}", MapError::KeyNotFound), "key not found");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapError {
    /// The requested key is not in the map.
    KeyNotFound,
    /// The position is a boundary sentinel (`end()` or `rend()`), which has
    /// no entry.
    EndPosition,
    /// The entry this position referred to has been erased, or the
    /// position was issued by another map.
    StalePosition,
    /// The end of a positional range orders before its start.
    InvertedRange,
}

impl fmt::Display for MapError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeyNotFound => write!(formatter, "key not found"),
            Self::EndPosition => write!(formatter, "position is past the boundary of the map"),
            Self::StalePosition => write!(formatter, "position refers to an erased entry"),
            Self::InvertedRange => write!(formatter, "range end precedes range start"),
        }
    }
}

impl std::error::Error for MapError {}

/// A broken structural invariant, reported by
/// [`TreeMap::validate`](super::TreeMap::validate).
///
/// Positions identify the node at which the violation was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantViolation {
    /// The root node is red.
    RedRoot,
    /// A red node has a red child.
    RedChildOfRed {
        /// The red child.
        position: Position,
    },
    /// The two subtrees of a node have different black-heights.
    BlackHeightMismatch {
        /// The node whose subtrees disagree.
        position: Position,
        /// Black-height of the left subtree.
        left: usize,
        /// Black-height of the right subtree.
        right: usize,
    },
    /// A key does not order strictly after its in-order predecessor.
    OutOfOrder {
        /// The node holding the out-of-order key.
        position: Position,
    },
    /// A child's parent link does not point back at its parent.
    BrokenParentLink {
        /// The child with the wrong back-reference.
        position: Position,
    },
    /// The recorded length differs from the number of reachable entries.
    LengthMismatch {
        /// The length the map reports.
        recorded: usize,
        /// The number of entries reachable from the root.
        reachable: usize,
    },
    /// A boundary sentinel is not linked to the minimum or maximum entry.
    SentinelMismatch,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RedRoot => write!(formatter, "root node is red"),
            Self::RedChildOfRed { position } => {
                write!(formatter, "red node at {position} has a red parent")
            }
            Self::BlackHeightMismatch {
                position,
                left,
                right,
            } => write!(
                formatter,
                "black-height mismatch at {position}: left {left}, right {right}"
            ),
            Self::OutOfOrder { position } => {
                write!(formatter, "key at {position} is not greater than its predecessor")
            }
            Self::BrokenParentLink { position } => {
                write!(formatter, "parent link of {position} does not match its parent")
            }
            Self::LengthMismatch {
                recorded,
                reachable,
            } => write!(
                formatter,
                "recorded length {recorded} differs from {reachable} reachable entries"
            ),
            Self::SentinelMismatch => {
                write!(formatter, "boundary sentinels are not linked to the extremes")
            }
        }
    }
}

impl std::error::Error for InvariantViolation {}
