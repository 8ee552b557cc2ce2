//! Fibonacci Heap implementation
//!
//! A Fibonacci heap is a collection of heap-ordered trees with:
//! - O(1) amortized push, top and merge
//! - O(1) amortized decrease_key
//! - O(log n) amortized pop
//!
//! # Algorithm Overview
//!
//! The heap is a circular doubly linked ring of roots, each the root of a
//! heap-ordered tree whose children form a ring of their own. Work is
//! deferred until `pop`: pushes just add a root, and only extraction
//! consolidates the ring so that no two roots share a degree.
//!
//! **Cascading cuts**: when a key improves past its father, the node is cut
//! to the root ring. A father that loses a second child is cut too, and the
//! cut cascades upward. The mark bit records "lost one child already" and is
//! what keeps degrees O(log n).
//!
//! All nodes live in a [`BlockAllocator`]; links are slot indices. Handles
//! returned by [`FibonacciHeap::insert`] carry the slot's generation, so a
//! handle outlives its element safely: using it afterwards reports
//! [`HeapError::InvalidHandle`].
//!
//! A [`FibonacciHeap`] owns its allocator, so merging two of them first moves
//! the donor's nodes across. Heaps created in one [`FibonacciPool`] share a
//! single allocator and merge with the O(1) ring splice alone.

use crate::allocator::{BlockAllocator, Link, SlotId};
use crate::compare::{Compare, Greater};
use crate::pool::{HeapId, HeapTable, OwnerSets};
use crate::traits::{DecreaseKeyHeap, Handle, Heap, HeapError};
use rustc_hash::FxHashMap;
use std::fmt;

/// Handle to an element of a [`FibonacciHeap`] or [`FibonacciPool`]
///
/// Stays valid until the element is popped. Inside a heap it also dies when
/// that heap is merged into another heap or cleared; inside a pool it
/// follows its element through merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FibonacciHandle {
    slot: SlotId,
}

impl Handle for FibonacciHandle {}

#[derive(Clone)]
struct Node<K> {
    key: K,
    degree: usize,
    /// Set when a non-root node has lost a child since it was last linked
    marked: bool,
    /// Owner tag inside a pool; zero in a standalone heap
    owner: usize,
    father: Link,
    /// Any one child; the children form their own ring
    child: Link,
    left: Link,
    right: Link,
}

/// Node arena and ordering
///
/// Ring surgery runs against a caller-held `top` link, so one forest can
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

    fn insert(&mut self, top: &mut Link, key: K, owner: usize) -> SlotId {
        let slot = self.nodes.allocate(Node {
            key,
            degree: 0,
            marked: false,
            owner,
            father: Link::NONE,
            child: Link::NONE,
            left: Link::NONE,
            right: Link::NONE,
        });
        self.add_root(top, slot.index());
        slot
    }

    /// The live node behind `handle`, if `new_key` strictly improves on it
    fn improvable(&self, handle: &FibonacciHandle, new_key: &K) -> Result<&Node<K>, HeapError> {
        let node = self.nodes.get(handle.slot).ok_or(HeapError::InvalidHandle)?;
        if !self.cmp.outranks(new_key, &node.key) {
            return Err(HeapError::KeyNotImproved);
        }
        Ok(node)
    }

    fn decrease(&mut self, top: &mut Link, x: usize, new_key: K) {
        self.nodes[x].key = new_key;

        if let Some(y) = self.nodes[x].father.get() {
            if self.outranks(x, y) {
                self.cut(top, x, y);
                self.cascading_cut(top, y);
            }
        }

        if let Some(t) = top.get() {
            if self.outranks(x, t) {
                *top = Link::to(x);
            }
        }
    }

    fn pop(&mut self, top: &mut Link) -> Option<K> {
        let z = top.get()?;

        let mut child = self.nodes[z].child;
        for _ in 0..self.nodes[z].degree {
            let Some(c) = child.get() else {
                break;
            };
            child = self.nodes[c].left;
            self.insert_left(c, z);
            let moved = &mut self.nodes[c];
            moved.father = Link::NONE;
            moved.marked = false;
        }

        if self.nodes[z].right == Link::to(z) {
            *top = Link::NONE;
        } else {
            *top = self.nodes[z].right;
            self.unlink(z);
            self.consolidate(top);
        }

        Some(self.nodes.take(z).key)
    }

    /// Splices the root ring entered at `other` into the ring at `top`
    ///
    /// Both rings must live in this forest. Four links change; the more
    /// extreme of the two entries becomes the top.
    fn splice(&mut self, top: &mut Link, other: Link) {
        let Some(b) = other.get() else {
            return;
        };
        let Some(a) = top.get() else {
            *top = other;
            return;
        };

        let a_left = self.nodes[a].left;
        let b_left = self.nodes[b].left;
        if let (Some(al), Some(bl)) = (a_left.get(), b_left.get()) {
            self.nodes[al].right = Link::to(b);
            self.nodes[b].left = a_left;
            self.nodes[bl].right = Link::to(a);
            self.nodes[a].left = b_left;
        }

        if self.outranks(b, a) {
            *top = other;
        }
    }

    #[inline]
    fn outranks(&self, a: usize, b: usize) -> bool {
        self.cmp.outranks(&self.nodes[a].key, &self.nodes[b].key)
    }

    /// Indices of a ring, starting at `entry` and following right links
    fn ring(&self, entry: usize) -> Vec<usize> {
        let mut members = vec![entry];
        let mut iter = self.nodes[entry].right;
        while let Some(i) = iter.get() {
            if i == entry {
                break;
            }
            members.push(i);
            iter = self.nodes[i].right;
        }
        members
    }

    fn root_count(&self, top: Link) -> usize {
        top.get().map_or(0, |t| self.ring(t).len())
    }

    /// Every node of the forest entered at `top`, roots first
    fn collect(&self, top: Link) -> Vec<usize> {
        let mut members = top.get().map(|t| self.ring(t)).unwrap_or_default();
        let mut next = 0;
        while let Some(&i) = members.get(next) {
            if let Some(child) = self.nodes[i].child.get() {
                members.extend(self.ring(child));
            }
            next += 1;
        }
        members
    }

    /// Frees every node of the forest entered at `top`
    fn discard(&mut self, top: Link) -> usize {
        let members = self.collect(top);
        for &i in &members {
            self.nodes.take(i);
        }
        members.len()
    }

    /// Splices `node` into a ring immediately left of `origin`
    fn insert_left(&mut self, node: usize, origin: usize) {
        let left = self.nodes[origin].left;
        self.nodes[origin].left = Link::to(node);
        self.nodes[node].right = Link::to(origin);
        self.nodes[node].left = left;
        if let Some(l) = left.get() {
            self.nodes[l].right = Link::to(node);
        }
    }

    /// Removes `node` from its ring, leaving it a detached singleton
    fn unlink(&mut self, node: usize) {
        let (left, right) = (self.nodes[node].left, self.nodes[node].right);
        if let Some(l) = left.get() {
            self.nodes[l].right = right;
        }
        if let Some(r) = right.get() {
            self.nodes[r].left = left;
        }
        let node_ref = &mut self.nodes[node];
        node_ref.father = Link::NONE;
        node_ref.left = Link::to(node);
        node_ref.right = Link::to(node);
    }

    /// Adds a detached node to the root ring, updating the top
    fn add_root(&mut self, top: &mut Link, node: usize) {
        match top.get() {
            None => {
                let n = &mut self.nodes[node];
                n.left = Link::to(node);
                n.right = Link::to(node);
                *top = Link::to(node);
            }
            Some(t) => {
                self.insert_left(node, t);
                if self.outranks(node, t) {
                    *top = Link::to(node);
                }
            }
        }
    }

    /// Makes root `child` a child of root `father`
    ///
    /// `child` must already be out of the root ring.
    fn link(&mut self, father: usize, child: usize) {
        {
            let c = &mut self.nodes[child];
            c.father = Link::to(father);
            c.marked = false;
        }
        self.nodes[father].degree += 1;
        match self.nodes[father].child.get() {
            None => {
                self.nodes[father].child = Link::to(child);
                let c = &mut self.nodes[child];
                c.left = Link::to(child);
                c.right = Link::to(child);
            }
            Some(first) => self.insert_left(child, first),
        }
    }

    /// Moves `x` from the child ring of `y` to the root ring
    fn cut(&mut self, top: &mut Link, x: usize, y: usize) {
        self.nodes[y].degree -= 1;
        if self.nodes[y].child == Link::to(x) {
            self.nodes[y].child = if self.nodes[y].degree == 0 {
                Link::NONE
            } else {
                self.nodes[x].left
            };
        }
        self.unlink(x);
        self.nodes[x].marked = false;
        self.add_root(top, x);
    }

    /// Walks up from `y` cutting marked ancestors
    ///
    /// Stops at the first unmarked node, which gets marked unless it is a root.
    fn cascading_cut(&mut self, top: &mut Link, mut y: usize) {
        let mut cuts = 0usize;
        while self.nodes[y].marked {
            let Some(z) = self.nodes[y].father.get() else {
                break;
            };
            self.cut(top, y, z);
            y = z;
            cuts += 1;
        }
        if self.nodes[y].father.is_some() {
            self.nodes[y].marked = true;
        }
        if cuts > 0 {
            tracing::trace!(cuts, "cascading cut");
        }
    }

    /// Links roots of equal degree until every degree is unique
    ///
    /// Breaks the root ring into a list, feeds each root through a
    /// degree-to-root map, then rebuilds the ring from the survivors.
    fn consolidate(&mut self, top: &mut Link) {
        let Some(start) = top.get() else {
            return;
        };

        if let Some(last) = self.nodes[start].left.get() {
            self.nodes[last].right = Link::NONE;
        }

        let mut by_degree: FxHashMap<usize, usize> = FxHashMap::default();
        let mut roots_before = 0usize;
        let mut next = Link::to(start);

        while let Some(root) = next.get() {
            next = self.nodes[root].right;
            roots_before += 1;

            let mut x = root;
            let mut degree = self.nodes[x].degree;
            while let Some(mut y) = by_degree.remove(&degree) {
                if self.outranks(y, x) {
                    std::mem::swap(&mut x, &mut y);
                }
                self.link(x, y);
                degree += 1;
            }
            by_degree.insert(degree, x);
        }

        tracing::trace!(roots_before, roots_after = by_degree.len(), "consolidated root ring");

        *top = Link::NONE;
        for root in by_degree.into_values() {
            self.add_root(top, root);
        }
    }

    /// Copies a forest into this allocator, returning the new entry root
    ///
    /// `fetch` yields the node at a source index with its source links. Ring
    /// order, degrees, marks and owner tags are preserved; link fields are
    /// rewritten.
    fn graft<F>(&mut self, src_entry: Link, mut fetch: F) -> Link
    where
        F: FnMut(usize) -> Node<K>,
    {
        let mut pending: Vec<(usize, usize)> = Vec::new();
        let Some(entry) = src_entry.get() else {
            return Link::NONE;
        };
        let root = self.graft_ring(entry, Link::NONE, &mut fetch, &mut pending);
        while let Some((src_child, father)) = pending.pop() {
            let child = self.graft_ring(src_child, Link::to(father), &mut fetch, &mut pending);
            self.nodes[father].child = Link::to(child);
        }
        Link::to(root)
    }

    fn graft_ring<F>(
        &mut self,
        src_entry: usize,
        father: Link,
        fetch: &mut F,
        pending: &mut Vec<(usize, usize)>,
    ) -> usize
    where
        F: FnMut(usize) -> Node<K>,
    {
        let node = fetch(src_entry);
        let mut src_right = node.right;
        let first = self.adopt(node, father, pending);
        {
            let n = &mut self.nodes[first];
            n.left = Link::to(first);
            n.right = Link::to(first);
        }

        while let Some(src) = src_right.get().filter(|&r| r != src_entry) {
            let node = fetch(src);
            src_right = node.right;
            let copy = self.adopt(node, father, pending);
            self.insert_left(copy, first);
        }

        first
    }

    /// Allocates a detached copy of a source node, queueing its children
    fn adopt(&mut self, node: Node<K>, father: Link, pending: &mut Vec<(usize, usize)>) -> usize {
        let src_child = node.child;
        let copy = self
            .nodes
            .allocate(Node {
                key: node.key,
                degree: node.degree,
                marked: node.marked,
                owner: node.owner,
                father,
                child: Link::NONE,
                left: Link::NONE,
                right: Link::NONE,
            })
            .index();
        if let Some(c) = src_child.get() {
            pending.push((c, copy));
        }
        copy
    }

    /// Checks every structural invariant of the forest at `top`, returning its size
    #[cfg(test)]
    fn check_invariants(&self, top: Link) -> usize {
        let Some(t) = top.get() else {
            return 0;
        };

        let mut count = 0;
        for root in self.ring(t) {
            let node = &self.nodes[root];
            assert!(node.father.is_none(), "root {root} has a father");
            assert!(!node.marked, "root {root} is marked");
            assert!(!self.outranks(root, t), "cached top is not extreme");
            count += self.check_tree(root);
        }
        count
    }

    #[cfg(test)]
    fn check_tree(&self, root: usize) -> usize {
        let node = &self.nodes[root];
        assert_eq!(self.nodes[node.left.get().unwrap()].right, Link::to(root));
        assert_eq!(self.nodes[node.right.get().unwrap()].left, Link::to(root));

        let Some(child) = node.child.get() else {
            assert_eq!(node.degree, 0);
            return 1;
        };
        let children = self.ring(child);
        assert_eq!(children.len(), node.degree);

        let mut size = 1;
        for c in children {
            assert_eq!(self.nodes[c].father, Link::to(root));
            assert!(!self.outranks(c, root), "heap order violated");
            size += self.check_tree(c);
        }
        size
    }
}

/// Fibonacci Heap
///
/// # Example
///
/// ```rust
/// use arena_heaps::{Heap, HeapError};
/// use arena_heaps::fibonacci::FibonacciHeap;
///
/// let mut heap = FibonacciHeap::new();
/// let five = heap.insert(5);
/// heap.push(9);
///
/// heap.decrease_key(&five, 20).unwrap();
/// assert_eq!(heap.pop(), Ok(20));
/// assert_eq!(heap.decrease_key(&five, 30), Err(HeapError::InvalidHandle));
/// ```
pub struct FibonacciHeap<K, C = Greater> {
    forest: Forest<K, C>,
    /// Extreme root; entry point into the root ring
    top: Link,
}

impl<K: Ord> FibonacciHeap<K> {
    /// Creates an empty max-heap
    pub fn new() -> Self {
        Self::with_comparator(Greater)
    }
}

impl<K, C: Compare<K>> FibonacciHeap<K, C> {
    /// Creates an empty heap ordered by `cmp`
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            forest: Forest::new(cmp),
            top: Link::NONE,
        }
    }

    /// The comparator ordering this heap
    pub fn comparator(&self) -> &C {
        &self.forest.cmp
    }

    /// Inserts a key as a new root, returning a handle to it
    ///
    /// **Time Complexity**: O(1)
    pub fn insert(&mut self, key: K) -> FibonacciHandle {
        let slot = self.forest.insert(&mut self.top, key, 0);
        FibonacciHandle { slot }
    }

    /// Improves the key behind `handle`
    ///
    /// **Time Complexity**: O(1) amortized
    ///
    /// **Algorithm**:
    /// 1. Replace the key
    /// 2. If it now outranks its father, cut it to the root ring
    /// 3. Cascade: cut marked ancestors, mark the first unmarked one
    /// 4. Update the top if the new key outranks it
    ///
    /// # Errors
    /// [`HeapError::InvalidHandle`] for a stale or foreign handle, then
    /// [`HeapError::KeyNotImproved`] unless `new_key` strictly outranks the
    /// current key. The heap is untouched on error.
    pub fn decrease_key(&mut self, handle: &FibonacciHandle, new_key: K) -> Result<(), HeapError> {
        self.forest.improvable(handle, &new_key)?;
        self.forest.decrease(&mut self.top, handle.slot.index(), new_key);
        Ok(())
    }

    /// Returns the key behind `handle`, if the element is still in this heap
    pub fn get(&self, handle: &FibonacciHandle) -> Option<&K> {
        self.forest.nodes.get(handle.slot).map(|node| &node.key)
    }

    /// Returns true if `handle` refers to a live element of this heap
    pub fn contains(&self, handle: &FibonacciHandle) -> bool {
        self.forest.nodes.contains(handle.slot)
    }

    /// Iterates over all keys in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        self.forest.nodes.iter().map(|(_, node)| &node.key)
    }

    /// Number of trees in the root ring
    pub fn root_count(&self) -> usize {
        self.forest.root_count(self.top)
    }

    /// Renders the forest, one key per line
    ///
    /// Roots start at the top and follow the ring; each node's subtree comes
    /// right after it, indented by one more space. Marked nodes end in `!`.
    pub fn tree(&self) -> TreeDisplay<'_, K, C> {
        TreeDisplay {
            forest: &self.forest,
            top: self.top,
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        assert_eq!(self.forest.check_invariants(self.top), self.len());
    }
}

impl<K, C: Compare<K>> Heap<K> for FibonacciHeap<K, C> {
    fn len(&self) -> usize {
        self.forest.nodes.len()
    }

    /// **Time Complexity**: O(1)
    fn push(&mut self, key: K) {
        self.insert(key);
    }

    fn top(&self) -> Result<&K, HeapError> {
        let top = self.top.get().ok_or(HeapError::Empty)?;
        Ok(&self.forest.nodes[top].key)
    }

    /// Removes and returns the extreme key
    ///
    /// **Time Complexity**: O(log n) amortized
    ///
    /// **Algorithm**:
    /// 1. Move every child of the top to the root ring, clearing its father
    /// 2. Remove the top from the ring
    /// 3. Consolidate the remaining roots
    fn pop(&mut self) -> Result<K, HeapError> {
        self.forest.pop(&mut self.top).ok_or(HeapError::Empty)
    }

    /// Moves `other`'s nodes into this heap's allocator, then splices the rings
    ///
    /// **Time Complexity**: O(m) relocation plus O(1) splice. The donor is the
    /// side relocated, so every handle into `self` stays valid. Heaps of one
    /// [`FibonacciPool`] share an allocator and skip the relocation.
    fn merge(&mut self, other: &mut Self) {
        if other.is_empty() {
            return;
        }

        let relocated = other.len();
        let donor_nodes = &mut other.forest.nodes;
        let grafted = self.forest.graft(other.top, |i| donor_nodes.take(i));
        other.top = Link::NONE;
        tracing::debug!(relocated, "merged fibonacci heap");

        self.forest.splice(&mut self.top, grafted);
    }

    fn clear(&mut self) {
        self.forest.nodes.clear();
        self.top = Link::NONE;
    }
}

impl<K, C: Compare<K>> DecreaseKeyHeap<K> for FibonacciHeap<K, C> {
    type Handle = FibonacciHandle;

    fn push_with_handle(&mut self, key: K) -> FibonacciHandle {
        self.insert(key)
    }

    fn decrease_key(&mut self, handle: &FibonacciHandle, new_key: K) -> Result<(), HeapError> {
        FibonacciHeap::decrease_key(self, handle, new_key)
    }
}

impl<K: Clone, C: Compare<K> + Clone> Clone for FibonacciHeap<K, C> {
    /// Deep copy with the same trees and marks
    ///
    /// Handles into `self` do not refer to elements of the copy.
    fn clone(&self) -> Self {
        let mut copy = Self::with_comparator(self.forest.cmp.clone());
        copy.top = copy.forest.graft(self.top, |i| self.forest.nodes[i].clone());
        copy
    }
}

impl<K, C: Compare<K> + Default> Default for FibonacciHeap<K, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, C: Compare<K>> Extend<K> for FibonacciHeap<K, C> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K, C: Compare<K> + Default> FromIterator<K> for FibonacciHeap<K, C> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut heap = Self::default();
        heap.extend(iter);
        heap
    }
}

impl<K: fmt::Debug, C: Compare<K>> fmt::Debug for FibonacciHeap<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FibonacciHeap")
            .field("len", &self.len())
            .field("top", &self.top().ok())
            .field("roots", &self.root_count())
            .finish()
    }
}

#[derive(Clone, Copy)]
struct PooledRing {
    top: Link,
    len: usize,
    /// Owner tag stamped on nodes inserted from now on
    tag: usize,
}

/// Fibonacci heaps sharing one node allocator
///
/// Every heap of the pool is named by a [`HeapId`]. Merging two of them is
/// the bare ring splice: no node moves, so handles stay valid and follow
/// their element into the receiving heap.
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `insert`       | O(1)              |
/// | `pop`          | O(log n) amortized |
/// | `decrease_key` | O(1) amortized    |
/// | `merge`        | O(1)              |
///
/// # Example
///
/// ```rust
/// use arena_heaps::fibonacci::FibonacciPool;
///
/// let mut pool = FibonacciPool::new();
/// let small = pool.create_heap();
/// let large = pool.create_heap();
/// pool.insert(small, 3);
/// let handle = pool.insert(large, 1);
/// pool.extend(large, 10..1000);
///
/// pool.merge(small, large);
/// assert_eq!(pool.len(small), 992);
/// assert!(pool.is_empty(large));
/// assert_eq!(pool.heap_of(&handle), Some(small));
///
/// pool.decrease_key(&handle, 5000).unwrap();
/// assert_eq!(pool.pop(small), Ok(5000));
/// ```
pub struct FibonacciPool<K, C = Greater> {
    forest: Forest<K, C>,
    heaps: HeapTable<PooledRing>,
    owners: OwnerSets,
}

impl<K: Ord> FibonacciPool<K> {
    /// Creates an empty pool of max-heaps
    pub fn new() -> Self {
        Self::with_comparator(Greater)
    }
}

impl<K, C: Compare<K>> FibonacciPool<K, C> {
    /// Creates an empty pool whose heaps are ordered by `cmp`
    pub fn with_comparator(cmp: C) -> Self {
        let forest = Forest::new(cmp);
        let heaps = HeapTable::new(forest.nodes.id());
        Self {
            forest,
            heaps,
            owners: OwnerSets::default(),
        }
    }

    /// The comparator ordering every heap of the pool
    pub fn comparator(&self) -> &C {
        &self.forest.cmp
    }

    /// Adds an empty heap to the pool
    pub fn create_heap(&mut self) -> HeapId {
        let tag = self.owners.add(self.heaps.len());
        self.heaps.create(PooledRing {
            top: Link::NONE,
            len: 0,
            tag,
        })
    }

    /// Number of heaps created so far
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

    /// Inserts `key` into `heap`, returning a handle to it
    ///
    /// # Panics
    /// Panics if `heap` belongs to another pool.
    pub fn insert(&mut self, heap: HeapId, key: K) -> FibonacciHandle {
        let ring = &mut self.heaps[heap];
        let slot = self.forest.insert(&mut ring.top, key, ring.tag);
        ring.len += 1;
        FibonacciHandle { slot }
    }

    pub fn push(&mut self, heap: HeapId, key: K) {
        self.insert(heap, key);
    }

    pub fn extend<I: IntoIterator<Item = K>>(&mut self, heap: HeapId, keys: I) {
        for key in keys {
            self.insert(heap, key);
        }
    }

    /// Returns the extreme key of `heap`
    ///
    /// # Errors
    /// [`HeapError::Empty`] if `heap` has no elements.
    pub fn top(&self, heap: HeapId) -> Result<&K, HeapError> {
        let top = self.heaps[heap].top.get().ok_or(HeapError::Empty)?;
        Ok(&self.forest.nodes[top].key)
    }

    /// Removes and returns the extreme key of `heap`
    ///
    /// # Errors
    /// [`HeapError::Empty`] if `heap` has no elements.
    pub fn pop(&mut self, heap: HeapId) -> Result<K, HeapError> {
        let ring = &mut self.heaps[heap];
        let key = self.forest.pop(&mut ring.top).ok_or(HeapError::Empty)?;
        ring.len -= 1;
        Ok(key)
    }

    /// Improves the key behind `handle` in whichever heap now holds it
    ///
    /// # Errors
    /// Same as [`FibonacciHeap::decrease_key`].
    pub fn decrease_key(&mut self, handle: &FibonacciHandle, new_key: K) -> Result<(), HeapError> {
        let tag = self.forest.improvable(handle, &new_key)?.owner;
        let heap = self.heaps.id(self.owners.resolve(tag));
        self.forest
            .decrease(&mut self.heaps[heap].top, handle.slot.index(), new_key);
        Ok(())
    }

    /// Returns the key behind `handle`, if the element is still in the pool
    pub fn get(&self, handle: &FibonacciHandle) -> Option<&K> {
        self.forest.nodes.get(handle.slot).map(|node| &node.key)
    }

    /// Returns true if `handle` refers to a live element of any heap in the pool
    pub fn contains(&self, handle: &FibonacciHandle) -> bool {
        self.forest.nodes.contains(handle.slot)
    }

    /// The heap currently holding the element behind `handle`
    pub fn heap_of(&self, handle: &FibonacciHandle) -> Option<HeapId> {
        let node = self.forest.nodes.get(handle.slot)?;
        Some(self.heaps.id(self.owners.owner(node.owner)))
    }

    /// Moves every element of `from` into `into`, leaving `from` empty
    ///
    /// **Time Complexity**: O(1). The root rings are spliced in place and the
    /// owner sets are joined; no node is read beyond the two ring entries.
    /// Merging a heap with itself does nothing.
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

        let spliced = src.len;
        self.forest.splice(&mut dst.top, src.top);
        dst.len += src.len;
        dst.tag = self.owners.union(dst.tag, src.tag, into.index());
        *src = PooledRing {
            top: Link::NONE,
            len: 0,
            tag: self.owners.add(from.index()),
        };
        tracing::debug!(spliced, "merged pooled fibonacci heaps");
    }

    /// Drops every element of `heap`, returning their slots to the pool
    pub fn clear(&mut self, heap: HeapId) {
        let ring = &mut self.heaps[heap];
        let freed = self.forest.discard(ring.top);
        debug_assert_eq!(freed, ring.len);
        ring.top = Link::NONE;
        ring.len = 0;
    }

    /// Pops every element of `heap`, returning them in extraction order
    pub fn drain_sorted(&mut self, heap: HeapId) -> Vec<K> {
        let mut sorted = Vec::with_capacity(self.len(heap));
        while let Ok(key) = self.pop(heap) {
            sorted.push(key);
        }
        sorted
    }

    /// Number of trees in the root ring of `heap`
    pub fn root_count(&self, heap: HeapId) -> usize {
        self.forest.root_count(self.heaps[heap].top)
    }

    /// Renders the forest of `heap` in the format of [`FibonacciHeap::tree`]
    pub fn tree(&self, heap: HeapId) -> TreeDisplay<'_, K, C> {
        TreeDisplay {
            forest: &self.forest,
            top: self.heaps[heap].top,
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let mut total = 0;
        for (index, ring) in self.heaps.iter().enumerate() {
            assert_eq!(self.forest.check_invariants(ring.top), ring.len);
            for i in self.forest.collect(ring.top) {
                assert_eq!(self.owners.owner(self.forest.nodes[i].owner), index);
            }
            total += ring.len;
        }
        assert_eq!(total, self.node_count());
    }
}

impl<K, C: Compare<K> + Default> Default for FibonacciPool<K, C> {
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, C> fmt::Debug for FibonacciPool<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FibonacciPool")
            .field("lens", &self.heaps.iter().map(|ring| ring.len).collect::<Vec<_>>())
            .field("capacity", &self.forest.nodes.capacity())
            .finish()
    }
}

/// Display adapter returned by [`FibonacciHeap::tree`] and [`FibonacciPool::tree`]
pub struct TreeDisplay<'a, K, C> {
    forest: &'a Forest<K, C>,
    top: Link,
}

impl<K: fmt::Display, C: Compare<K>> fmt::Display for TreeDisplay<'_, K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let forest = self.forest;
        let Some(top) = self.top.get() else {
            return Ok(());
        };

        let mut stack: Vec<(usize, usize)> = forest.ring(top).into_iter().rev().map(|i| (i, 0)).collect();
        while let Some((i, depth)) = stack.pop() {
            let node = &forest.nodes[i];
            let mark = if node.marked { "!" } else { "" };
            writeln!(f, "{:depth$}{}{}", "", node.key, mark)?;
            if let Some(child) = node.child.get() {
                stack.extend(forest.ring(child).into_iter().rev().map(|c| (c, depth + 1)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::Less;

    #[test]
    fn test_push_pop_order() {
        let mut heap = FibonacciHeap::new();
        for key in [1, 8, 6, 5, 3, 7, 4] {
            heap.push(key);
        }
        assert_eq!(heap.root_count(), 7);

        assert_eq!(heap.pop(), Ok(8));
        heap.check_invariants();
        // six keys consolidate into trees of size 2 and 4
        assert_eq!(heap.root_count(), 2);

        for expected in [7, 6, 5, 4, 3, 1] {
            assert_eq!(heap.pop(), Ok(expected));
            heap.check_invariants();
        }
        assert_eq!(heap.pop(), Err(HeapError::Empty));
    }

    #[test]
    fn test_single_element() {
        let mut heap = FibonacciHeap::new();
        let handle = heap.insert(42);
        assert_eq!(heap.get(&handle), Some(&42));
        assert_eq!(heap.pop(), Ok(42));
        assert!(!heap.contains(&handle));
        assert_eq!(heap.top(), Err(HeapError::Empty));
    }

    #[test]
    fn test_decrease_key_cuts_and_cascades() {
        let mut heap: FibonacciHeap<i32, Less> = FibonacciHeap::with_comparator(Less);
        let handles: Vec<_> = (0..16).map(|i| heap.insert(i * 10)).collect();

        // one pop consolidates the other 15 keys into trees
        assert_eq!(heap.pop(), Ok(0));
        heap.check_invariants();

        // repeated cuts from the deepest tree mark fathers and cascade
        for (n, handle) in handles.iter().enumerate().skip(1).rev().take(6) {
            heap.decrease_key(handle, -(n as i32)).unwrap();
            heap.check_invariants();
        }

        let sorted = heap.into_sorted_vec();
        let mut expected: Vec<i32> = (1..16).map(|i| i * 10).collect();
        for n in 10..16 {
            expected.retain(|&k| k != n * 10);
            expected.push(-n);
        }
        expected.sort_unstable();
        assert_eq!(sorted, expected);
    }

    #[test]
    fn test_decrease_key_errors_leave_heap_untouched() {
        let mut heap = FibonacciHeap::new();
        let a = heap.insert(5);
        heap.push(9);

        assert_eq!(heap.decrease_key(&a, 5), Err(HeapError::KeyNotImproved));
        assert_eq!(heap.decrease_key(&a, 2), Err(HeapError::KeyNotImproved));
        assert_eq!(heap.get(&a), Some(&5));

        heap.decrease_key(&a, 10).unwrap();
        assert_eq!(heap.pop(), Ok(10));
        assert_eq!(heap.decrease_key(&a, 99), Err(HeapError::InvalidHandle));
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn test_foreign_handle_is_rejected() {
        let mut heap1 = FibonacciHeap::new();
        let mut heap2 = FibonacciHeap::new();
        let h1 = heap1.insert(1);
        heap2.insert(1);

        assert!(!heap2.contains(&h1));
        assert_eq!(heap2.decrease_key(&h1, 50), Err(HeapError::InvalidHandle));
    }

    #[test]
    fn test_merge_invalidates_donor_handles() {
        let mut heap1 = FibonacciHeap::new();
        let mut heap2 = FibonacciHeap::new();
        heap1.extend([1, 2, 3]);
        let h = heap2.insert(4);
        heap2.extend([5, 6]);

        heap1.merge(&mut heap2);
        heap1.check_invariants();

        assert_eq!(heap1.len(), 6);
        assert!(heap2.is_empty());
        assert!(!heap1.contains(&h));
        assert!(!heap2.contains(&h));
        assert_eq!(heap1.top(), Ok(&6));

        heap2.push(1);
        assert_eq!(heap2.pop(), Ok(1));
        assert_eq!(heap1.into_sorted_vec(), vec![6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_merge_consolidated_trees() {
        let mut heap1: FibonacciHeap<i32> = (0..40).collect();
        let mut heap2: FibonacciHeap<i32> = (40..90).collect();
        heap1.pop().unwrap();
        heap2.pop().unwrap();

        heap1.merge(&mut heap2);
        heap1.check_invariants();
        assert_eq!(heap1.top(), Ok(&88));
        assert_eq!(heap1.len(), 88);
    }

    #[test]
    fn test_clone_keeps_marks_and_independence() {
        let mut heap: FibonacciHeap<i32, Less> = FibonacciHeap::with_comparator(Less);
        let handles: Vec<_> = (0..9).map(|i| heap.insert(i)).collect();
        heap.pop().unwrap();
        heap.decrease_key(&handles[8], -1).unwrap();

        let mut copy = heap.clone();
        copy.check_invariants();
        assert_eq!(copy.tree().to_string(), heap.tree().to_string());
        assert!(!copy.contains(&handles[3]));

        copy.pop().unwrap();
        assert_eq!(heap.len(), 8);
        assert_eq!(copy.len(), 7);
        assert_eq!(heap.top(), Ok(&-1));
    }

    #[test]
    fn test_tree_rendering() {
        let mut heap: FibonacciHeap<i32, Less> = FibonacciHeap::with_comparator(Less);
        let handles: Vec<_> = (0..5).map(|i| heap.insert(i)).collect();
        heap.pop().unwrap();
        // a single binomial tree of order 2 rooted at 1
        let rendered = heap.tree().to_string();
        assert_eq!(rendered.lines().count(), 4);
        assert_eq!(rendered.lines().next(), Some("1"));
        assert_eq!(rendered.lines().filter(|l| l.starts_with("  ")).count(), 1);

        // cutting the grandchild marks its father
        let grandchild = (1..5)
            .find(|&i| rendered.lines().any(|l| l == format!("  {i}")))
            .unwrap();
        heap.decrease_key(&handles[grandchild as usize], -1).unwrap();
        let rendered = heap.tree().to_string();
        assert!(rendered.contains('!'));
        assert_eq!(rendered.lines().next(), Some("-1"));
    }

    #[test]
    fn test_take_and_clear() {
        let mut source: FibonacciHeap<i32> = (0..10).collect();
        let moved = std::mem::take(&mut source);
        assert!(source.is_empty());
        assert_eq!(moved.len(), 10);

        let mut moved = moved;
        moved.clear();
        assert_eq!(moved.pop(), Err(HeapError::Empty));
        moved.push(7);
        assert_eq!(moved.top(), Ok(&7));
    }

    #[test]
    fn test_merge_keeps_receiver_handles_with_larger_donor() {
        let mut small = FibonacciHeap::new();
        let kept = small.insert(0);
        let mut large: FibonacciHeap<i32> = (1..500).collect();
        large.pop().unwrap();
        let donor_handle = large.insert(600);

        small.merge(&mut large);
        small.check_invariants();
        assert_eq!(small.len(), 500);
        assert!(large.is_empty());
        assert!(!small.contains(&donor_handle));

        small.decrease_key(&kept, 1000).unwrap();
        assert_eq!(small.pop(), Ok(1000));
        assert_eq!(small.pop(), Ok(600));
    }

    #[test]
    fn test_pool_merge_splices_without_touching_nodes() {
        let mut pool = FibonacciPool::new();
        let a = pool.create_heap();
        let b = pool.create_heap();
        let ha: Vec<_> = (0..5).map(|k| pool.insert(a, k)).collect();
        let hb: Vec<_> = (10..300).map(|k| pool.insert(b, k)).collect();
        assert_eq!(pool.pop(b), Ok(299));
        pool.check_invariants();

        let before: Vec<SlotId> = pool.forest.nodes.iter().map(|(id, _)| id).collect();
        let capacity = pool.capacity();
        let donor_roots = pool.root_count(b);

        pool.merge(a, b);
        pool.check_invariants();

        // Same slots, same generations: nothing was moved or reallocated
        let after: Vec<SlotId> = pool.forest.nodes.iter().map(|(id, _)| id).collect();
        assert_eq!(before, after);
        assert_eq!(pool.capacity(), capacity);
        assert_eq!(pool.root_count(a), 5 + donor_roots);

        assert_eq!(pool.len(a), 5 + 289);
        assert!(pool.is_empty(b));
        assert_eq!(pool.top(b), Err(HeapError::Empty));
        assert_eq!(pool.top(a), Ok(&298));
        for (key, handle) in (10..299).zip(&hb) {
            assert_eq!(pool.get(handle), Some(&key));
            assert_eq!(pool.heap_of(handle), Some(a));
        }
        assert_eq!(pool.heap_of(&ha[0]), Some(a));
        assert!(!pool.contains(&hb[289]));

        pool.decrease_key(&hb[0], 2000).unwrap();
        pool.decrease_key(&ha[0], 1000).unwrap();
        pool.check_invariants();
        assert_eq!(pool.top(a), Ok(&2000));

        // The emptied donor is reusable and owns what it gets next
        let fresh = pool.insert(b, 7);
        assert_eq!(pool.heap_of(&fresh), Some(b));
        assert_eq!(pool.top(b), Ok(&7));
        pool.check_invariants();

        assert_eq!(pool.pop(a), Ok(2000));
        assert_eq!(pool.pop(a), Ok(1000));
        assert_eq!(pool.pop(a), Ok(298));
    }

    #[test]
    fn test_pool_ownership_follows_chained_merges() {
        let mut pool: FibonacciPool<i32, Less> = FibonacciPool::with_comparator(Less);
        let heaps: Vec<HeapId> = (0..4).map(|_| pool.create_heap()).collect();
        let handles: Vec<Vec<FibonacciHandle>> = heaps
            .iter()
            .enumerate()
            .map(|(n, &h)| (0..20).map(|k| pool.insert(h, 100 * n as i32 + k)).collect())
            .collect();
        for &h in &heaps {
            pool.pop(h).unwrap();
        }

        pool.merge(heaps[1], heaps[2]);
        pool.merge(heaps[0], heaps[1]);
        pool.check_invariants();
        assert_eq!(pool.heap_of(&handles[2][5]), Some(heaps[0]));

        // Refill the drained donor, then merge it elsewhere
        let late = pool.insert(heaps[2], 50);
        pool.merge(heaps[3], heaps[2]);
        pool.check_invariants();
        assert_eq!(pool.heap_of(&late), Some(heaps[3]));
        assert_eq!(pool.heap_of(&handles[2][5]), Some(heaps[0]));

        pool.decrease_key(&handles[2][5], -7).unwrap();
        assert_eq!(pool.top(heaps[0]), Ok(&-7));
        assert_eq!(pool.top(heaps[3]), Ok(&50));

        pool.merge(heaps[3], heaps[0]);
        pool.check_invariants();
        assert_eq!(pool.len(heaps[3]), 4 * 19 + 1);
        assert_eq!(pool.heap_of(&handles[1][3]), Some(heaps[3]));
        assert_eq!(pool.pop(heaps[3]), Ok(-7));
    }

    #[test]
    fn test_pool_clear_frees_only_that_heap() {
        let mut pool = FibonacciPool::new();
        let a = pool.create_heap();
        let b = pool.create_heap();
        let ha = pool.insert(a, 1);
        pool.extend(a, 2..40);
        let hb = pool.insert(b, 5);
        pool.pop(a).unwrap();

        pool.clear(a);
        pool.check_invariants();
        assert!(pool.is_empty(a));
        assert_eq!(pool.node_count(), 1);
        assert!(!pool.contains(&ha));
        assert_eq!(pool.decrease_key(&ha, 9), Err(HeapError::InvalidHandle));
        assert_eq!(pool.get(&hb), Some(&5));

        pool.push(a, 3);
        assert_eq!(pool.drain_sorted(a), vec![3]);
    }

    #[test]
    fn test_pool_rejects_foreign_handles() {
        let mut pool = FibonacciPool::new();
        let mut other = FibonacciPool::new();
        let mut heap = FibonacciHeap::new();
        let id = pool.create_heap();
        let other_id = other.create_heap();
        let inside = pool.insert(id, 1);
        let outside = other.insert(other_id, 1);
        let standalone = heap.insert(1);

        assert_eq!(pool.decrease_key(&outside, 9), Err(HeapError::InvalidHandle));
        assert_eq!(pool.decrease_key(&standalone, 9), Err(HeapError::InvalidHandle));
        assert_eq!(heap.decrease_key(&inside, 9), Err(HeapError::InvalidHandle));
        assert_eq!(pool.heap_of(&outside), None);
        assert_eq!(pool.decrease_key(&inside, 0), Err(HeapError::KeyNotImproved));
    }

    #[test]
    #[should_panic(expected = "another pool")]
    fn test_pool_rejects_foreign_heap_id() {
        let mut pool: FibonacciPool<i32> = FibonacciPool::new();
        let mut other: FibonacciPool<i32> = FibonacciPool::new();
        pool.create_heap();
        let foreign = other.create_heap();
        pool.push(foreign, 1);
    }
}
