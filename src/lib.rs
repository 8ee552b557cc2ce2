//! Arena-backed heap data structures for Rust
//!
//! This crate provides three priority queues behind one [`Heap`] contract,
//! all parameterized by an injectable [`Compare`] ordering (max-heap by
//! default), plus the power-of-two slot allocator the node-based heaps use.
//!
//! # Features
//!
//! - **Simple Binary Heap**: array-backed; O(log n) push and pop
//! - **Binomial Heap**: O(log n) push, pop and root-list union
//! - **Fibonacci Heap**: O(1) amortized push and decrease_key; O(log n) amortized pop
//! - **Block Allocator**: stable slots in blocks of 1, 2, 4, ... with generation-checked ids
//! - **Pools**: many binomial or Fibonacci heaps over one shared allocator, merged
//!   in O(log n + log m) or O(1) without moving a node
//!
//! Node heaps never hold raw pointers: nodes live in a [`BlockAllocator`] and
//! link to each other by slot index. A standalone heap owns its allocator, so
//! merging two of them moves nodes across before the union and leaves the
//! donor empty. Heaps that must merge cheaply belong in a [`FibonacciPool`] or
//! [`BinomialPool`], where merge only relinks roots.
//!
//! # Example
//!
//! ```rust
//! use arena_heaps::fibonacci::FibonacciHeap;
//! use arena_heaps::{Heap, Less};
//!
//! let mut heap = FibonacciHeap::with_comparator(Less);
//! let handle = heap.insert(5);
//! heap.push(3);
//! heap.decrease_key(&handle, 1).unwrap();
//! assert_eq!(heap.top(), Ok(&1));
//! ```

pub mod allocator;
pub mod binomial;
pub mod compare;
pub mod fibonacci;
pub mod pool;
pub mod simple_binary;
pub mod traits;

// Re-export the main traits for convenience
pub use allocator::{BlockAllocator, SlotId};
pub use binomial::{BinomialHeap, BinomialPool};
pub use compare::{Compare, Greater, Less};
pub use fibonacci::{FibonacciHandle, FibonacciHeap, FibonacciPool};
pub use pool::HeapId;
pub use simple_binary::SimpleBinaryHeap;
pub use traits::{DecreaseKeyHeap, Handle, Heap, HeapError};
