//! An ordered map backed by a Red-Black Tree with parent links.
//!
//! This module provides [`TreeMap`], a sorted associative container with
//! unique keys, together with the position, cursor and iterator types it
//! hands out.
//!
//! # Layout
//!
//! Nodes live in a slot arena and refer to each other by index, parent
//! links included. Two permanent boundary sentinels sit one before the
//! first entry and one past the last, so `begin()` and `end()` are O(1)
//! and iteration needs neither a stack nor recursion. The sentinels are
//! unlinked around every structural change and re-linked afterwards.
//!
//! | Module     | Responsibility                                     |
//! |------------|----------------------------------------------------|
//! | `node`     | nodes, slot arena, generation-checked positions    |
//! | `sentinel` | boundary sentinels and the detach/attach guard     |
//! | `balance`  | rotations, insert fixup, erase splice and fixup    |
//! | `navigate` | successor and predecessor via parent links         |
//! | `compare`  | the comparator capability                          |
//! | `cursor`   | positions, cursors and iterators                   |
//! | `validate` | invariant checking                                 |
//!
//! # Examples
//!
//! ```rust
//! use rbmap::map::TreeMap;
//!
//! let mut map = TreeMap::new();
//! for key in [5, 3, 8, 1, 4, 7, 9] {
//!     map.insert(key, ());
//! }
//! map.erase(&5);
//!
//! let keys: Vec<i32> = map.keys().copied().collect();
//! assert_eq!(keys, vec![1, 3, 4, 7, 8, 9]);
//! assert!(map.validate().is_ok());
//! ```

mod balance;
mod compare;
mod cursor;
mod error;
mod navigate;
mod node;
mod sentinel;
mod treemap;
mod validate;

pub use compare::{Compare, Natural};
pub use cursor::{Cursor, IntoIter, Iter, IterMut, Keys, Position, Range, Values, ValuesMut};
pub use error::{InvariantViolation, MapError};
pub use treemap::TreeMap;
pub use validate::TreeShape;
