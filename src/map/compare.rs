//! Key comparators.
//!
//! A [`TreeMap`](super::TreeMap) orders its keys with a single comparator
//! fixed at construction. A comparator answers one question, "is `left`
//! strictly less than `right`?", and must describe a strict weak order.
//! Two keys are equivalent (the same key, as far as the map is concerned)
//! when neither is less than the other.
//!
//! # Examples
//!
//! ```rust
//! use rbmap::map::{Compare, Natural};
//!
//! assert!(Natural.less(&1, &2));
//! assert!(Natural.equivalent(&3, &3));
//!
//! // Any `Fn(&T, &T) -> bool` closure is a comparator.
//! let descending = |left: &i32, right: &i32| left > right;
//! assert!(descending.less(&2, &1));
//! ```

/// A strict weak order over `T`.
pub trait Compare<T: ?Sized> {
    /// Returns `true` if `left` orders strictly before `right`.
    fn less(&self, left: &T, right: &T) -> bool;

    /// Returns `true` if neither key orders before the other.
    fn equivalent(&self, left: &T, right: &T) -> bool {
        !self.less(left, right) && !self.less(right, left)
    }
}

/// Orders keys by their [`Ord`] implementation.
///
/// This is the default comparator of [`TreeMap`](super::TreeMap). It works
/// for any `T: Ord`, which is what lets lookups take a borrowed form of the
/// key (`&str` for `String` keys, for example).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Natural;

impl<T: Ord + ?Sized> Compare<T> for Natural {
    #[inline]
    fn less(&self, left: &T, right: &T) -> bool {
        left < right
    }
}

impl<T: ?Sized, F> Compare<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn less(&self, left: &T, right: &T) -> bool {
        self(left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 2, true)]
    #[case(2, 1, false)]
    #[case(2, 2, false)]
    fn test_natural_less(#[case] left: i32, #[case] right: i32, #[case] expected: bool) {
        assert_eq!(Natural.less(&left, &right), expected);
    }

    #[rstest]
    fn test_natural_on_unsized_str() {
        assert!(Natural.less("apple", "banana"));
        assert!(Natural.equivalent("kiwi", "kiwi"));
    }

    #[rstest]
    fn test_closure_comparator() {
        let by_length = |left: &String, right: &String| left.len() < right.len();
        assert!(by_length.less(&"ab".to_string(), &"abc".to_string()));
        // Same length means equivalent under this order.
        assert!(by_length.equivalent(&"ab".to_string(), &"xy".to_string()));
    }
}
