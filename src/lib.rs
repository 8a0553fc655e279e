//! # rbmap
//!
//! An ordered key-value map for Rust, backed by a Red-Black Tree with parent
//! links and boundary sentinels.
//!
//! ## Overview
//!
//! [`TreeMap`](map::TreeMap) keeps unique keys sorted under a comparator
//! chosen at construction. It offers:
//!
//! - **O(log N) updates**: insert, erase by key or by position, lookup
//! - **O(1) boundaries**: `begin()` and `end()` through two permanent sentinels
//! - **Bound queries**: `lower_bound`, `upper_bound`, `equal_range`, `range`
//! - **Stable positions**: copyable handles that survive unrelated erases and
//!   detect their own staleness
//! - **Invariant checking**: `validate()` verifies every red-black property
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize`/`Deserialize` for `TreeMap`
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events: rotations and fixup cases at
//! `trace`, bulk operations at `debug`. No subscriber is installed.
//!
//! ## Example
//!
//! ```rust
//! use rbmap::prelude::*;
//!
//! let mut map = TreeMap::new();
//! map.insert(2, "two");
//! map.insert(1, "one");
//!
//! assert_eq!(map.first_key_value(), Some((&1, &"one")));
//! assert_eq!(map.at(&3), Err(MapError::KeyNotFound));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use rbmap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::map::{Compare, MapError, Natural, Position, TreeMap};
}

pub mod map;
