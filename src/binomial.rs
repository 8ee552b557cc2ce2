//! Binomial Heap implementation
//!
//! A binomial heap is a forest of binomial trees with:
//! - O(log n) push and pop
//! - O(log n) union of two root lists
//!
//! # Algorithm Overview
//!
//! **Binomial Tree Bₖ**: Recursively defined:
//! - B₀ is a single node
//! - Bₖ is formed by linking two B_{k-1} trees
//! - Bₖ has exactly 2ᵏ nodes and its root has children of degrees k-1, ..., 1, 0
//!
//! The roots form a singly linked list sorted by non-decreasing degree. After
//! every union the list holds at most one tree per degree, mirroring the binary
//! representation of n, so there are at most ⌊log₂ n⌋ + 1 roots.
//!
//! **Key Operations**:
//! - **Union**: merge the two degree-sorted root lists, then walk the result
//!   with a three-node window (prev, cur, next) linking equal-degree neighbours
//! - **Push**: union a single-node tree into the root list
//! - **Pop**: unlink the extreme root, union its children back in
//!
//! Nodes live in a [`BlockAllocator`]; all links are slot indices. A cached
//! index of the extreme root is recomputed at the end of every structural
//! operation.
//!
//! A [`BinomialHeap`] owns its allocator, so merging two of them first moves
//! the smaller heap's nodes across. Heaps created in one [`BinomialPool`]
//! share a single allocator and merge with the root-list union alone.

use crate::allocator::{BlockAllocator, Link};
use crate::compare::{Compare, Greater};
use crate::pool::{HeapId, HeapTable};
use crate::traits::{Heap, HeapError};
use std::fmt;

/// Internal node structure for binomial heap
///
/// Each node maintains:
/// - `key`: The data stored in the heap
/// - `degree`: Number of children (critical for union)
/// - `father`: Link to the father node (none for roots)
/// - `sibling`: Next root in the root list, or next child in the father's child list
/// - `child`: First child; children are kept in increasing degree order
#[derive(Clone)]
struct Node<K> {
    key: K,
    degree: usize,
    father: Link,
    sibling: Link,
    child: Link,
}

impl<K> Node<K> {
    fn new(key: K) -> Self {
        Node {
            key,
            degree: 0,
            father: Link::NONE,
            sibling: Link::NONE,
            child: Link::NONE,
        }
    }
}

/// Head of a root list and its cached extreme root
#[derive(Clone, Copy, Debug)]
struct RootList {
    head: Link,
    top: Link,
}

impl RootList {
    const EMPTY: RootList = RootList {
        head: Link::NONE,
        top: Link::NONE,
    };
}

/// Node arena and ordering
///
/// Every root-list operation takes the list it works on, so one forest can
/// carry the trees of many heaps.
struct Forest<K, C> {
    nodes: BlockAllocator<Node<K>>,
    cmp: C,
}

impl<K, C: Compare<K>> Forest<K, C> {
    fn new(cmp: C) -> Self {
        Self {
            nodes: BlockAllocator::new(),
            cmp,
        }
    }

    #[inline]
    fn outranks(&self, a: usize, b: usize) -> bool {
        self.cmp.outranks(&self.nodes[a].key, &self.nodes[b].key)
    }

    fn roots(&self, head: Link) -> impl Iterator<Item = (&K, usize)> + '_ {
        std::iter::successors(head.get(), move |&i| self.nodes[i].sibling.get()).map(move |i| {
            let node = &self.nodes[i];
            (&node.key, node.degree)
        })
    }

    /// Unions a single-node tree into `list`
    fn push(&mut self, list: &mut RootList, key: K) {
        let node = self.nodes.allocate(Node::new(key)).index();
        self.absorb(list, Link::to(node));
    }

    /// Unions the root list at `other` into `list` and refreshes its top
    fn absorb(&mut self, list: &mut RootList, other: Link) {
        list.head = self.union(list.head, other);
        self.update_top(list);
    }

    fn pop(&mut self, list: &mut RootList) -> Option<K> {
        let top = list.top.get()?;

        let mut prev = Link::NONE;
        let mut iter = list.head;
        while let Some(i) = iter.get() {
            if i == top {
                break;
            }
            prev = iter;
            iter = self.nodes[i].sibling;
        }

        let after = self.nodes[top].sibling;
        match prev.get() {
            None => list.head = after,
            Some(p) => self.nodes[p].sibling = after,
        }

        let children = self.nodes[top].child;
        let mut child = children;
        while let Some(c) = child.get() {
            self.nodes[c].father = Link::NONE;
            child = self.nodes[c].sibling;
        }

        let node = self.nodes.take(top);
        self.absorb(list, children);
        Some(node.key)
    }

    /// Merges two degree-sorted root lists into one, returning its head
    ///
    /// Equal-degree trees are *not* linked here; both input lists are consumed.
    fn merge_list(&mut self, h1: Link, h2: Link) -> Link {
        let (mut h1, mut h2) = match (h1.get(), h2.get()) {
            (None, _) => return h2,
            (_, None) => return h1,
            (Some(a), Some(b)) => (a, b),
        };

        let head = if self.nodes[h1].degree <= self.nodes[h2].degree {
            let head = h1;
            match self.nodes[h1].sibling.get() {
                Some(next) => h1 = next,
                None => {
                    self.nodes[head].sibling = Link::to(h2);
                    return Link::to(head);
                }
            }
            head
        } else {
            let head = h2;
            match self.nodes[h2].sibling.get() {
                Some(next) => h2 = next,
                None => {
                    self.nodes[head].sibling = Link::to(h1);
                    return Link::to(head);
                }
            }
            head
        };

        let mut tail = head;
        loop {
            if self.nodes[h1].degree <= self.nodes[h2].degree {
                self.nodes[tail].sibling = Link::to(h1);
                tail = h1;
                match self.nodes[h1].sibling.get() {
                    Some(next) => h1 = next,
                    None => {
                        self.nodes[tail].sibling = Link::to(h2);
                        break;
                    }
                }
            } else {
                self.nodes[tail].sibling = Link::to(h2);
                tail = h2;
                match self.nodes[h2].sibling.get() {
                    Some(next) => h2 = next,
                    None => {
                        self.nodes[tail].sibling = Link::to(h1);
                        break;
                    }
                }
            }
        }

        Link::to(head)
    }

    /// Makes `child` the last child of `father`
    ///
    /// Children are appended, so the child list stays in increasing degree
    /// order and can be fed straight back into [`union`](Self::union).
    fn link(&mut self, father: usize, child: usize) {
        match self.nodes[father].child.get() {
            None => self.nodes[father].child = Link::to(child),
            Some(first) => {
                let mut last = first;
                while let Some(next) = self.nodes[last].sibling.get() {
                    last = next;
                }
                self.nodes[last].sibling = Link::to(child);
            }
        }
        self.nodes[father].degree += 1;

        let node = &mut self.nodes[child];
        node.sibling = Link::NONE;
        node.father = Link::to(father);
    }

    /// Unions two root lists so at most one tree per degree remains
    ///
    /// Walks the merged list with a (prev, cur, next) window. `cur` and `next`
    /// are linked when their degrees match, unless the tree after `next` has
    /// the same degree too: then the window advances first so the two later
    /// trees get linked, which keeps at most two trees of any degree in play.
    /// On equal keys the first tree stays the root.
    fn union(&mut self, h1: Link, h2: Link) -> Link {
        let mut head = self.merge_list(h1, h2);
        let Some(mut cur) = head.get() else {
            return head;
        };

        let mut prev = Link::NONE;
        let mut next = self.nodes[cur].sibling;

        while let Some(nxt) = next.get() {
            let after = self.nodes[nxt].sibling;
            let degree = self.nodes[cur].degree;
            let three_equal = after
                .get()
                .is_some_and(|a| self.nodes[a].degree == degree);

            if self.nodes[nxt].degree != degree || three_equal {
                prev = Link::to(cur);
                cur = nxt;
                next = after;
            } else if !self.outranks(nxt, cur) {
                // cur stays a root, next becomes its child
                self.nodes[cur].sibling = after;
                self.link(cur, nxt);
                next = after;
            } else {
                // next stays a root, cur becomes its child
                match prev.get() {
                    None => head = next,
                    Some(p) => self.nodes[p].sibling = next,
                }
                self.link(nxt, cur);
                cur = nxt;
                next = after;
            }
        }

        head
    }

    /// Recomputes the cached extreme root by scanning the root list
    fn update_top(&self, list: &mut RootList) {
        list.top = list.head;
        let Some(mut best) = list.head.get() else {
            return;
        };
        let mut iter = self.nodes[best].sibling;
        while let Some(i) = iter.get() {
            if self.outranks(i, best) {
                best = i;
            }
            iter = self.nodes[i].sibling;
        }
        list.top = Link::to(best);
    }

    /// Frees every node of the forest whose root list starts at `head`
    fn discard(&mut self, head: Link) -> usize {
        let mut pending = vec![head];
        let mut freed = 0;
        while let Some(list) = pending.pop() {
            let mut iter = list;
            while let Some(i) = iter.get() {
                let node = self.nodes.take(i);
                pending.push(node.child);
                iter = node.sibling;
                freed += 1;
            }
        }
        freed
    }

    /// Copies a forest into this allocator, returning the new root list
    ///
    /// `fetch` yields the node at a source index; its links still name source
    /// indices and are rewritten here. Sibling order is preserved. Uses an
    /// explicit stack, so deep trees cannot overflow the call stack.
    fn graft<F>(&mut self, src_root: Link, mut fetch: F) -> Link
    where
        F: FnMut(usize) -> Node<K>,
    {
        let mut pending: Vec<(Link, usize)> = Vec::new();
        let root = self.graft_list(src_root, Link::NONE, &mut fetch, &mut pending);
        while let Some((src_child, father)) = pending.pop() {
            let child = self.graft_list(src_child, Link::to(father), &mut fetch, &mut pending);
            self.nodes[father].child = child;
        }
        root
    }

    fn graft_list<F>(
        &mut self,
        src: Link,
        father: Link,
        fetch: &mut F,
        pending: &mut Vec<(Link, usize)>,
    ) -> Link
    where
        F: FnMut(usize) -> Node<K>,
    {
        let mut head = Link::NONE;
        let mut tail = Link::NONE;
        let mut iter = src;

        while let Some(s) = iter.get() {
            let node = fetch(s);
            iter = node.sibling;
            let src_child = node.child;

            let copy = self
                .nodes
                .allocate(Node {
                    key: node.key,
                    degree: node.degree,
                    father,
                    sibling: Link::NONE,
                    child: Link::NONE,
                })
                .index();

            match tail.get() {
                Some(t) => self.nodes[t].sibling = Link::to(copy),
                None => head = Link::to(copy),
            }
            tail = Link::to(copy);

            if src_child.is_some() {
                pending.push((src_child, copy));
            }
        }

        head
    }

    /// Checks every structural invariant of `list`, returning its size
    #[cfg(test)]
    fn check_invariants(&self, list: RootList) -> usize {
        let mut count = 0;
        let mut last_degree = None;
        let mut iter = list.head;
        while let Some(r) = iter.get() {
            let node = &self.nodes[r];
            assert!(node.father.is_none(), "root {r} has a father");
            if let Some(last) = last_degree {
                assert!(node.degree > last, "root degrees not strictly increasing");
            }
            last_degree = Some(node.degree);
            if let Some(t) = list.top.get() {
                assert!(!self.outranks(r, t), "cached top is not extreme");
            }
            count += self.check_tree(r);
            iter = node.sibling;
        }
        assert_eq!(list.top.is_none(), list.head.is_none());
        count
    }

    /// Returns the size of the tree at `root`, asserting it is a binomial tree
    #[cfg(test)]
    fn check_tree(&self, root: usize) -> usize {
        let mut size = 1;
        let node = &self.nodes[root];
        let mut expected_degree = 0;
        let mut iter = node.child;
        while let Some(c) = iter.get() {
            let child = &self.nodes[c];
            assert_eq!(child.father, Link::to(root));
            assert_eq!(child.degree, expected_degree, "children out of degree order");
            assert!(!self.outranks(c, root), "heap order violated");
            size += self.check_tree(c);
            expected_degree += 1;
            iter = child.sibling;
        }
        assert_eq!(node.degree, expected_degree);
        assert_eq!(size, 1 << node.degree);
        size
    }
}

/// Binomial Heap
///
/// # Example
///
/// ```rust
/// use arena_heaps::Heap;
/// use arena_heaps::binomial::BinomialHeap;
///
/// let mut heap = BinomialHeap::new();
/// for key in [1, 8, 6, 5, 3, 7, 4] {
///     heap.push(key);
/// }
///
/// let mut other = BinomialHeap::new();
/// other.push(10);
/// heap.merge(&mut other);
///
/// assert!(other.is_empty());
/// assert_eq!(heap.into_sorted_vec(), vec![10, 8, 7, 6, 5, 4, 3, 1]);
/// ```
pub struct BinomialHeap<K, C = Greater> {
    forest: Forest<K, C>,
    list: RootList,
}

impl<K: Ord> BinomialHeap<K> {
    /// Creates an empty max-heap
    pub fn new() -> Self {
        Self::with_comparator(Greater)
    }
}

impl<K, C: Compare<K>> BinomialHeap<K, C> {
    /// Creates an empty heap ordered by `cmp`
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            forest: Forest::new(cmp),
            list: RootList::EMPTY,
        }
    }

    /// The comparator ordering this heap
    pub fn comparator(&self) -> &C {
        &self.forest.cmp
    }

    /// Iterates over all keys in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        self.forest.nodes.iter().map(|(_, node)| &node.key)
    }

    /// Iterates over the roots as `(key, degree)`, in root-list order
    ///
    /// Degrees are strictly increasing, and a root of degree k owns exactly
    /// 2ᵏ keys.
    pub fn roots(&self) -> impl Iterator<Item = (&K, usize)> + '_ {
        self.forest.roots(self.list.head)
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        assert_eq!(self.forest.check_invariants(self.list), self.len());
    }
}

impl<K, C: Compare<K>> Heap<K> for BinomialHeap<K, C> {
    fn len(&self) -> usize {
        self.forest.nodes.len()
    }

    /// Unions a single-node tree into the root list
    ///
    /// **Time Complexity**: O(log n) worst-case
    fn push(&mut self, key: K) {
        self.forest.push(&mut self.list, key);
    }

    fn top(&self) -> Result<&K, HeapError> {
        let top = self.list.top.get().ok_or(HeapError::Empty)?;
        Ok(&self.forest.nodes[top].key)
    }

    /// Removes and returns the extreme key
    ///
    /// **Time Complexity**: O(log n) worst-case
    ///
    /// **Algorithm**:
    /// 1. Unlink the extreme root from the root list
    /// 2. Detach its children (degrees 0..k-1, already in increasing order)
    /// 3. Union the children back into the remaining roots
    /// 4. Rescan the roots for the new extreme
    fn pop(&mut self) -> Result<K, HeapError> {
        self.forest.pop(&mut self.list).ok_or(HeapError::Empty)
    }

    /// Moves `other`'s trees into this heap and unions the root lists
    ///
    /// **Time Complexity**: O(min(n, m)) to relocate the smaller heap's nodes,
    /// then O(log n + log m) for the union. The two allocators are swapped
    /// first when `other` is the larger heap, so its nodes stay where they
    /// are. Heaps of one [`BinomialPool`] share an allocator and skip the
    /// relocation.
    fn merge(&mut self, other: &mut Self) {
        if other.is_empty() {
            return;
        }
        if other.len() > self.len() {
            std::mem::swap(&mut self.forest.nodes, &mut other.forest.nodes);
            std::mem::swap(&mut self.list, &mut other.list);
        }

        let relocated = other.len();
        let donor_nodes = &mut other.forest.nodes;
        let grafted = self.forest.graft(other.list.head, |i| donor_nodes.take(i));
        other.list = RootList::EMPTY;
        tracing::debug!(relocated, "merged binomial heap");

        self.forest.absorb(&mut self.list, grafted);
    }

    fn clear(&mut self) {
        self.forest.nodes.clear();
        self.list = RootList::EMPTY;
    }
}

impl<K: Clone, C: Compare<K> + Clone> Clone for BinomialHeap<K, C> {
    /// Deep copy with the same tree shapes
    fn clone(&self) -> Self {
        let mut copy = Self::with_comparator(self.forest.cmp.clone());
        let head = copy.forest.graft(self.list.head, |i| self.forest.nodes[i].clone());
        copy.list.head = head;
        copy.forest.update_top(&mut copy.list);
        copy
    }
}

impl<K, C: Compare<K> + Default> Default for BinomialHeap<K, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, C: Compare<K>> Extend<K> for BinomialHeap<K, C> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.push(key);
        }
    }
}

impl<K, C: Compare<K> + Default> FromIterator<K> for BinomialHeap<K, C> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut heap = Self::default();
        heap.extend(iter);
        heap
    }
}

impl<K: fmt::Debug, C: Compare<K>> fmt::Debug for BinomialHeap<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinomialHeap")
            .field("len", &self.len())
            .field("top", &self.top().ok())
            .field("roots", &self.roots().map(|(_, d)| d).collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone, Copy)]
struct PooledList {
    list: RootList,
    len: usize,
}

impl PooledList {
    const EMPTY: PooledList = PooledList {
        list: RootList::EMPTY,
        len: 0,
    };
}

/// Binomial heaps sharing one node allocator
///
/// Every heap of the pool is named by a [`HeapId`]. Since all trees already
/// live in the same allocator, merging two heaps is the bare root-list
/// union: O(log n + log m), with no node copied.
///
/// # Example
///
/// ```rust
/// use arena_heaps::binomial::BinomialPool;
///
/// let mut pool = BinomialPool::new();
/// let a = pool.create_heap();
/// let b = pool.create_heap();
/// pool.extend(a, [1, 8, 6]);
/// pool.extend(b, [5, 3, 7, 4]);
///
/// pool.merge(a, b);
/// assert!(pool.is_empty(b));
/// assert_eq!(pool.drain_sorted(a), vec![8, 7, 6, 5, 4, 3, 1]);
/// ```
pub struct BinomialPool<K, C = Greater> {
    forest: Forest<K, C>,
    heaps: HeapTable<PooledList>,
}

impl<K: Ord> BinomialPool<K> {
    /// Creates an empty pool of max-heaps
    pub fn new() -> Self {
        Self::with_comparator(Greater)
    }
}

impl<K, C: Compare<K>> BinomialPool<K, C> {
    /// Creates an empty pool whose heaps are ordered by `cmp`
    pub fn with_comparator(cmp: C) -> Self {
        let forest = Forest::new(cmp);
        let heaps = HeapTable::new(forest.nodes.id());
        Self { forest, heaps }
    }

    pub fn comparator(&self) -> &C {
        &self.forest.cmp
    }

    /// Adds an empty heap to the pool
    pub fn create_heap(&mut self) -> HeapId {
        self.heaps.create(PooledList::EMPTY)
    }

    pub fn heap_count(&self) -> usize {
        self.heaps.len()
    }

    /// Number of elements across all heaps
    pub fn node_count(&self) -> usize {
        self.forest.nodes.len()
    }

    /// Slots in the shared allocator
    pub fn capacity(&self) -> usize {
        self.forest.nodes.capacity()
    }

    pub fn len(&self, heap: HeapId) -> usize {
        self.heaps[heap].len
    }

    pub fn is_empty(&self, heap: HeapId) -> bool {
        self.heaps[heap].len == 0
    }

    /// Inserts `key` into `heap`
    ///
    /// **Time Complexity**: O(log n)
    ///
    /// # Panics
    /// Panics if `heap` belongs to another pool.
    pub fn push(&mut self, heap: HeapId, key: K) {
        let entry = &mut self.heaps[heap];
        self.forest.push(&mut entry.list, key);
        entry.len += 1;
    }

    pub fn extend<I: IntoIterator<Item = K>>(&mut self, heap: HeapId, keys: I) {
        for key in keys {
            self.push(heap, key);
        }
    }

    /// Returns the extreme key of `heap`
    ///
    /// # Errors
    /// [`HeapError::Empty`] if `heap` has no elements.
    pub fn top(&self, heap: HeapId) -> Result<&K, HeapError> {
        let top = self.heaps[heap].list.top.get().ok_or(HeapError::Empty)?;
        Ok(&self.forest.nodes[top].key)
    }

    /// Removes and returns the extreme key of `heap`
    ///
    /// # Errors
    /// [`HeapError::Empty`] if `heap` has no elements.
    pub fn pop(&mut self, heap: HeapId) -> Result<K, HeapError> {
        let entry = &mut self.heaps[heap];
        let key = self.forest.pop(&mut entry.list).ok_or(HeapError::Empty)?;
        entry.len -= 1;
        Ok(key)
    }

    /// Moves every element of `from` into `into`, leaving `from` empty
    ///
    /// **Time Complexity**: O(log n + log m). Only the two root lists are
    /// walked. Merging a heap with itself does nothing.
    ///
    /// # Panics
    /// Panics if either id belongs to another pool.
    pub fn merge(&mut self, into: HeapId, from: HeapId) {
        if into == from {
            return;
        }
        let (dst, src) = self.heaps.pair_mut(into, from);
        if src.len == 0 {
            return;
        }

        let unioned = src.len;
        self.forest.absorb(&mut dst.list, src.list.head);
        dst.len += src.len;
        *src = PooledList::EMPTY;
        tracing::debug!(unioned, "merged pooled binomial heaps");
    }

    /// Drops every element of `heap`, returning their slots to the pool
    pub fn clear(&mut self, heap: HeapId) {
        let entry = &mut self.heaps[heap];
        let freed = self.forest.discard(entry.list.head);
        debug_assert_eq!(freed, entry.len);
        *entry = PooledList::EMPTY;
    }

    /// Pops every element of `heap`, returning them in extraction order
    pub fn drain_sorted(&mut self, heap: HeapId) -> Vec<K> {
        let mut sorted = Vec::with_capacity(self.len(heap));
        while let Ok(key) = self.pop(heap) {
            sorted.push(key);
        }
        sorted
    }

    /// Iterates over the roots of `heap` as `(key, degree)`
    pub fn roots(&self, heap: HeapId) -> impl Iterator<Item = (&K, usize)> + '_ {
        self.forest.roots(self.heaps[heap].list.head)
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let mut total = 0;
        for entry in self.heaps.iter() {
            assert_eq!(self.forest.check_invariants(entry.list), entry.len);
            total += entry.len;
        }
        assert_eq!(total, self.node_count());
    }
}

impl<K, C: Compare<K> + Default> Default for BinomialPool<K, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, C> fmt::Debug for BinomialPool<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinomialPool")
            .field("lens", &self.heaps.iter().map(|entry| entry.len).collect::<Vec<_>>())
            .field("capacity", &self.forest.nodes.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::SlotId;
    use crate::compare::Less;

    #[test]
    fn test_push_pop_order() {
        let mut heap = BinomialHeap::new();
        for key in [1, 8, 6, 5, 3, 7, 4] {
            heap.push(key);
            heap.check_invariants();
        }

        for expected in [8, 7, 6, 5, 4, 3, 1] {
            assert_eq!(heap.top(), Ok(&expected));
            assert_eq!(heap.pop(), Ok(expected));
            heap.check_invariants();
        }
        assert_eq!(heap.pop(), Err(HeapError::Empty));
    }

    #[test]
    fn test_root_degrees_follow_binary_representation() {
        let mut heap = BinomialHeap::new();
        for i in 0..13 {
            heap.push(i);
        }
        // 13 = 0b1101
        let degrees: Vec<usize> = heap.roots().map(|(_, d)| d).collect();
        assert_eq!(degrees, vec![0, 2, 3]);

        heap.pop().unwrap();
        let degrees: Vec<usize> = heap.roots().map(|(_, d)| d).collect();
        assert_eq!(degrees, vec![2, 3]);
        heap.check_invariants();
    }

    #[test]
    fn test_duplicates() {
        let mut heap = BinomialHeap::new();
        for key in [10, 1, 8, 2, 7, 11, 10] {
            heap.push(key);
        }
        heap.check_invariants();
        assert_eq!(heap.into_sorted_vec(), vec![11, 10, 10, 8, 7, 2, 1]);
    }

    #[test]
    fn test_min_heap_emplace() {
        let mut heap: BinomialHeap<u64, Less> = BinomialHeap::with_comparator(Less);
        for key in [1u32, 2, 3, 4, 5, 6, 7] {
            heap.emplace(key);
        }
        assert_eq!(heap.into_sorted_vec(), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_merge_relocates_and_empties_donor() {
        let mut heap1 = BinomialHeap::new();
        let mut heap2 = BinomialHeap::new();
        heap1.extend([1, 2, 3]);
        heap2.extend([4, 5, 6]);

        heap1.merge(&mut heap2);
        heap1.check_invariants();
        heap2.check_invariants();

        assert_eq!(heap1.len(), 6);
        assert_eq!(heap2.len(), 0);
        assert!(heap2.is_empty());
        assert_eq!(heap1.pop(), Ok(6));

        heap2.push(1);
        assert_eq!(heap2.top(), Ok(&1));
        assert_eq!(heap2.pop(), Ok(1));
        assert!(heap2.is_empty());
    }

    #[test]
    fn test_merge_large_keeps_binomial_shape() {
        let mut heap1: BinomialHeap<i32> = (0..100).map(|i| i * 2).collect();
        let mut heap2: BinomialHeap<i32> = (0..77).map(|i| i * 2 + 1).collect();
        heap1.merge(&mut heap2);
        heap1.check_invariants();

        let total: usize = heap1.roots().map(|(_, d)| 1usize << d).sum();
        assert_eq!(total, 177);
        assert_eq!(heap1.into_sorted_vec(), {
            let mut all: Vec<i32> = (0..100).map(|i| i * 2).chain((0..77).map(|i| i * 2 + 1)).collect();
            all.sort_unstable_by(|a, b| b.cmp(a));
            all
        });
    }

    #[test]
    fn test_clone_is_independent() {
        let mut original = BinomialHeap::new();
        original.extend([1, 2, 3, 4]);
        original.pop().unwrap();

        let mut copy = original.clone();
        copy.check_invariants();
        assert_eq!(copy.len(), original.len());

        copy.push(100);
        copy.pop().unwrap();
        copy.pop().unwrap();
        assert_eq!(original.len(), 3);
        assert_eq!(original.into_sorted_vec(), vec![3, 2, 1]);
        assert_eq!(copy.into_sorted_vec(), vec![2, 1]);
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let mut source = BinomialHeap::new();
        source.extend([1, 2, 3, 4]);
        source.pop().unwrap();

        let moved = std::mem::take(&mut source);
        assert_eq!(source.len(), 0);
        assert_eq!(moved.len(), 3);
        assert_eq!(moved.into_sorted_vec(), vec![3, 2, 1]);
    }

    #[test]
    fn test_clear_then_reuse() {
        let mut heap: BinomialHeap<i32> = (0..50).collect();
        heap.clear();
        assert!(heap.is_empty());
        assert_eq!(heap.top(), Err(HeapError::Empty));
        heap.push(3);
        heap.check_invariants();
        assert_eq!(heap.pop(), Ok(3));
    }

    #[test]
    fn test_nested_heaps_by_size() {
        let mut heap = BinomialHeap::with_comparator(|a: &BinomialHeap<i32>, b: &BinomialHeap<i32>| {
            a.len() < b.len()
        });
        heap.push(BinomialHeap::new());
        heap.push([1].into_iter().collect());
        heap.push([2, 3].into_iter().collect());

        assert_eq!(heap.pop().map(|h| h.len()), Ok(0));
        assert_eq!(heap.pop().map(|h| h.len()), Ok(1));
        assert_eq!(heap.pop().map(|h| h.len()), Ok(2));
    }

    #[test]
    fn test_merge_relocates_smaller_side() {
        let mut small = BinomialHeap::new();
        small.push(-1);
        let mut large: BinomialHeap<i32> = (0..1000).collect();
        let large_ids: Vec<SlotId> = large.forest.nodes.iter().map(|(id, _)| id).collect();

        small.merge(&mut large);
        small.check_invariants();
        large.check_invariants();

        // The larger heap's nodes kept their slots; only the single key moved
        assert!(large_ids.iter().all(|id| small.forest.nodes.contains(*id)));
        assert_eq!(small.len(), 1001);
        assert!(large.is_empty());
        assert_eq!(small.top(), Ok(&999));

        large.push(4);
        assert_eq!(large.pop(), Ok(4));
        assert_eq!(small.into_sorted_vec().last(), Some(&-1));
    }

    #[test]
    fn test_pool_merge_unions_without_touching_nodes() {
        let mut pool = BinomialPool::new();
        let a = pool.create_heap();
        let b = pool.create_heap();
        pool.extend(a, 0..13);
        pool.extend(b, 100..611);
        pool.pop(b).unwrap();
        pool.check_invariants();

        let before: Vec<SlotId> = pool.forest.nodes.iter().map(|(id, _)| id).collect();
        let capacity = pool.capacity();

        pool.merge(a, b);
        pool.check_invariants();

        let after: Vec<SlotId> = pool.forest.nodes.iter().map(|(id, _)| id).collect();
        assert_eq!(before, after);
        assert_eq!(pool.capacity(), capacity);
        assert_eq!(pool.len(a), 13 + 510);
        assert!(pool.is_empty(b));
        assert_eq!(pool.top(b), Err(HeapError::Empty));

        // 523 = 0b1000001011
        let degrees: Vec<usize> = pool.roots(a).map(|(_, d)| d).collect();
        assert_eq!(degrees, vec![0, 1, 3, 9]);
        assert_eq!(pool.top(a), Ok(&609));

        pool.push(b, 2);
        assert_eq!(pool.top(b), Ok(&2));
        let drained = pool.drain_sorted(a);
        assert_eq!(drained.len(), 523);
        assert!(drained.windows(2).all(|w| w[0] >= w[1]));
        pool.check_invariants();
    }

    #[test]
    fn test_pool_min_heaps_and_clear() {
        let mut pool: BinomialPool<i32, Less> = BinomialPool::with_comparator(Less);
        let heaps: Vec<HeapId> = (0..3).map(|_| pool.create_heap()).collect();
        for (n, &heap) in heaps.iter().enumerate() {
            pool.extend(heap, (0..10).map(|k| k * 3 + n as i32));
        }

        pool.merge(heaps[2], heaps[0]);
        pool.merge(heaps[2], heaps[2]);
        pool.check_invariants();
        assert_eq!(pool.len(heaps[2]), 20);
        assert_eq!(pool.top(heaps[2]), Ok(&0));

        pool.clear(heaps[1]);
        pool.check_invariants();
        assert_eq!(pool.node_count(), 20);
        assert_eq!(pool.heap_count(), 3);

        pool.merge(heaps[1], heaps[2]);
        assert_eq!(pool.drain_sorted(heaps[1]).first(), Some(&0));
        assert_eq!(pool.node_count(), 0);
    }
}
