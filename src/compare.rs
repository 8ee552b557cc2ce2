//! Injectable key orderings
//!
//! Every heap in this crate is parameterized by a [`Compare`] strategy that
//! decides which of two keys is extracted first. The default, [`Greater`],
//! produces a max-heap; [`Less`] produces a min-heap. Any closure of the form
//! `Fn(&K, &K) -> bool` is also a comparator.
//!
//! # Example
//!
//! ```rust
//! use arena_heaps::{Heap, Less};
//! use arena_heaps::binomial::BinomialHeap;
//!
//! let mut min_heap = BinomialHeap::with_comparator(Less);
//! min_heap.push(3);
//! min_heap.push(1);
//! assert_eq!(min_heap.top(), Ok(&1));
//!
//! // Order strings by length, shortest first
//! let mut by_len = BinomialHeap::with_comparator(|a: &String, b: &String| a.len() < b.len());
//! by_len.push("ccc".to_string());
//! by_len.push("a".to_string());
//! assert_eq!(by_len.pop().as_deref(), Ok("a"));
//! ```

/// Strict total order over keys
///
/// `outranks(a, b)` must return true exactly when `a` is to be extracted
/// strictly before `b`. Equal keys outrank neither way.
pub trait Compare<K: ?Sized> {
    /// Returns true if `a` has strictly higher priority than `b`
    fn outranks(&self, a: &K, b: &K) -> bool;
}

/// Larger keys first (max-heap); the default ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Greater;

impl<K: Ord + ?Sized> Compare<K> for Greater {
    #[inline]
    fn outranks(&self, a: &K, b: &K) -> bool {
        a > b
    }
}

/// Smaller keys first (min-heap)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Less;

impl<K: Ord + ?Sized> Compare<K> for Less {
    #[inline]
    fn outranks(&self, a: &K, b: &K) -> bool {
        a < b
    }
}

impl<K: ?Sized, F> Compare<K> for F
where
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn outranks(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}
