//! Common traits for heap data structures
//!
//! This module provides a two-tier trait hierarchy for the heaps in this crate:
//!
//! - [`Heap`]: The contract shared by every heap (push, emplace, top, pop, merge)
//! - [`DecreaseKeyHeap`]: Extended trait adding handle-based `decrease_key`
//!
//! Unlike `std::collections::BinaryHeap`, emptiness is reported as an error:
//! `top` and `pop` on an empty heap return [`HeapError::Empty`].

use thiserror::Error;

/// Error type for heap operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeapError {
    /// `top` or `pop` was called on a heap with no elements
    #[error("heap is empty")]
    Empty,
    /// The new key does not strictly outrank the current key
    #[error("new key does not improve on the current key")]
    KeyNotImproved,
    /// The handle is stale (element was removed) or belongs to another heap
    #[error("handle does not refer to a live element of this heap")]
    InvalidHandle,
}

/// A handle to an element in the heap, used for decrease_key operations
///
/// This is an opaque type that identifies a specific element in the heap.
pub trait Handle: Copy + PartialEq + Eq {}

/// Base trait for heap/priority queue data structures
///
/// Which element is "extreme" is decided by the heap's comparator; with the
/// default [`Greater`](crate::compare::Greater) comparator the largest key is
/// extracted first.
///
/// # Example
///
/// ```rust
/// use arena_heaps::{Heap, HeapError};
/// use arena_heaps::simple_binary::SimpleBinaryHeap;
///
/// let mut heap = SimpleBinaryHeap::new();
/// heap.push(3);
/// heap.push(8);
/// heap.push(5);
///
/// assert_eq!(heap.top(), Ok(&8));
/// assert_eq!(heap.pop(), Ok(8));
/// assert_eq!(heap.len(), 2);
///
/// heap.clear();
/// assert_eq!(heap.pop(), Err(HeapError::Empty));
/// ```
pub trait Heap<K> {
    /// Returns true if the heap is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of elements in the heap
    fn len(&self) -> usize;

    /// Inserts a key
    ///
    /// # Time Complexity
    /// O(log n) for binary and binomial heaps, O(1) for the Fibonacci heap.
    fn push(&mut self, key: K);

    /// Constructs a key from `args` directly in the heap's storage
    ///
    /// Same complexity as [`push`](Heap::push).
    fn emplace<A>(&mut self, args: A)
    where
        K: From<A>,
    {
        self.push(K::from(args));
    }

    /// Returns the extreme key without removing it
    ///
    /// # Errors
    /// Returns [`HeapError::Empty`] if the heap has no elements.
    fn top(&self) -> Result<&K, HeapError>;

    /// Removes and returns the extreme key
    ///
    /// # Errors
    /// Returns [`HeapError::Empty`] if the heap has no elements.
    fn pop(&mut self) -> Result<K, HeapError>;

    /// Moves every element of `other` into this heap, leaving `other` empty
    ///
    /// # Time Complexity
    /// O(n + m) for the binary heap. The node-based heaps union their
    /// structures in O(log n + log m) (binomial root lists) or O(1)
    /// (Fibonacci ring splice) once both forests share an allocator, which is
    /// how heaps of a [`BinomialPool`](crate::binomial::BinomialPool) or
    /// [`FibonacciPool`](crate::fibonacci::FibonacciPool) merge. Standalone
    /// heaps each own an allocator and move nodes across first: a binomial
    /// heap relocates the smaller side in O(min(n, m)), a Fibonacci heap
    /// relocates `other` in O(m) so handles into `self` stay valid.
    fn merge(&mut self, other: &mut Self);

    /// Removes every element
    fn clear(&mut self);

    /// Pops every element, returning them in extraction order
    fn into_sorted_vec(mut self) -> Vec<K>
    where
        Self: Sized,
    {
        let mut sorted = Vec::with_capacity(self.len());
        while let Ok(key) = self.pop() {
            sorted.push(key);
        }
        sorted
    }
}

/// Extended heap trait with `decrease_key` support
///
/// "Decrease" is relative to the comparator: the new key must strictly
/// outrank the current one, moving the element towards the top.
///
/// # Example
///
/// ```rust
/// use arena_heaps::{DecreaseKeyHeap, Heap, HeapError};
/// use arena_heaps::fibonacci::FibonacciHeap;
///
/// let mut heap = FibonacciHeap::new();
/// heap.push(10);
/// let handle = heap.push_with_handle(4);
/// heap.decrease_key(&handle, 12).unwrap();
/// assert_eq!(heap.top(), Ok(&12));
///
/// assert_eq!(heap.decrease_key(&handle, 1), Err(HeapError::KeyNotImproved));
/// ```
pub trait DecreaseKeyHeap<K>: Heap<K> {
    /// The handle type for this heap, used to reference elements for decrease_key
    type Handle: Handle;

    /// Inserts a key, returning a handle to it
    fn push_with_handle(&mut self, key: K) -> Self::Handle;

    /// Replaces the key behind `handle` with a higher-priority one
    ///
    /// # Errors
    /// - [`HeapError::InvalidHandle`] if the element was already removed or
    ///   the handle was issued by another heap.
    /// - [`HeapError::KeyNotImproved`] if `new_key` does not strictly outrank
    ///   the current key.
    ///
    /// Both checks happen before the heap is modified.
    fn decrease_key(&mut self, handle: &Self::Handle, new_key: K) -> Result<(), HeapError>;
}
