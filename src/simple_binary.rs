//! Simple Binary Heap implementation
//!
//! An array-backed binary heap: the father of slot `k` is `(k - 1) / 2` and
//! its children are `2k + 1` and `2k + 2`, so no links are stored at all.
//! It is the baseline against which the node-based heaps are measured and
//! does not support `decrease_key`.
//!
//! # Time Complexity
//!
//! | Operation | Complexity     |
//! |-----------|----------------|
//! | `push`    | O(log n)       |
//! | `pop`     | O(log n)       |
//! | `top`     | O(1)           |
//! | `merge`   | O(n + m)       |
//!
//! # Example
//!
//! ```rust
//! use arena_heaps::Heap;
//! use arena_heaps::simple_binary::SimpleBinaryHeap;
//!
//! let mut heap = SimpleBinaryHeap::new();
//! for key in [1, 8, 6, 5, 3, 7, 4] {
//!     heap.push(key);
//! }
//! assert_eq!(heap.into_sorted_vec(), vec![8, 7, 6, 5, 4, 3, 1]);
//! ```

use crate::compare::{Compare, Greater};
use crate::traits::{Heap, HeapError};
use std::fmt;

/// Capacity of the first allocation; later growth doubles it
const INITIAL_CAPACITY: usize = 10;

/// An array-backed binary heap
///
/// Keys are kept in a contiguous buffer in heap order according to the
/// comparator `C` (a max-heap by default).
#[derive(Clone)]
pub struct SimpleBinaryHeap<K, C = Greater> {
    data: Vec<K>,
    cmp: C,
}

impl<K: Ord> SimpleBinaryHeap<K> {
    /// Creates an empty max-heap
    pub fn new() -> Self {
        Self::with_comparator(Greater)
    }

    /// Creates an empty max-heap able to hold `capacity` keys without growing
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            cmp: Greater,
        }
    }
}

impl<K, C: Compare<K>> SimpleBinaryHeap<K, C> {
    /// Creates an empty heap ordered by `cmp`
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            data: Vec::new(),
            cmp,
        }
    }

    /// Number of keys the buffer holds before growing
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Iterates over the keys in buffer order (not extraction order)
    pub fn iter(&self) -> std::slice::Iter<'_, K> {
        self.data.iter()
    }

    /// The comparator ordering this heap
    pub fn comparator(&self) -> &C {
        &self.cmp
    }

    /// Doubles the buffer, starting from [`INITIAL_CAPACITY`]
    fn grow(&mut self) {
        let additional = self.data.capacity().max(INITIAL_CAPACITY);
        self.data.reserve_exact(additional);
    }

    /// Floats the key at `index` up while it outranks its father
    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let father = (index - 1) / 2;
            if self.cmp.outranks(&self.data[index], &self.data[father]) {
                self.data.swap(index, father);
                index = father;
            } else {
                break;
            }
        }
    }

    /// Sinks the key at `index` below every child that outranks it
    fn sift_down(&mut self, mut index: usize) {
        let len = self.data.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut best = index;

            if left < len && self.cmp.outranks(&self.data[left], &self.data[best]) {
                best = left;
            }
            if right < len && self.cmp.outranks(&self.data[right], &self.data[best]) {
                best = right;
            }

            if best == index {
                break;
            }
            self.data.swap(index, best);
            index = best;
        }
    }

    /// Restores heap order over the whole buffer bottom-up
    fn heapify(&mut self) {
        for index in (0..self.data.len() / 2).rev() {
            self.sift_down(index);
        }
    }
}

impl<K, C: Compare<K>> Heap<K> for SimpleBinaryHeap<K, C> {
    fn len(&self) -> usize {
        self.data.len()
    }

    fn push(&mut self, key: K) {
        if self.data.len() == self.data.capacity() {
            self.grow();
        }
        self.data.push(key);
        self.sift_up(self.data.len() - 1);
    }

    fn top(&self) -> Result<&K, HeapError> {
        self.data.first().ok_or(HeapError::Empty)
    }

    fn pop(&mut self) -> Result<K, HeapError> {
        if self.data.is_empty() {
            return Err(HeapError::Empty);
        }

        let key = self.data.swap_remove(0);
        if !self.data.is_empty() {
            self.sift_down(0);
        }
        Ok(key)
    }

    fn merge(&mut self, other: &mut Self) {
        if other.data.is_empty() {
            return;
        }
        if self.data.is_empty() {
            std::mem::swap(&mut self.data, &mut other.data);
            return;
        }
        self.data.append(&mut other.data);
        self.heapify();
    }

    fn clear(&mut self) {
        self.data.clear();
    }
}

impl<K, C: Compare<K> + Default> Default for SimpleBinaryHeap<K, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, C: Compare<K>> Extend<K> for SimpleBinaryHeap<K, C> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.push(key);
        }
    }
}

impl<K, C: Compare<K> + Default> FromIterator<K> for SimpleBinaryHeap<K, C> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut heap = Self::default();
        heap.data = iter.into_iter().collect();
        heap.heapify();
        heap
    }
}

impl<K: fmt::Debug, C> fmt::Debug for SimpleBinaryHeap<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}
