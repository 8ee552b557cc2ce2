//! Heaps that share one node arena
//!
//! A pool owns a single [`BlockAllocator`](crate::allocator::BlockAllocator)
//! of nodes and any number of heaps drawing on it, each named by a
//! [`HeapId`]. Since every node of every heap already lives in the same slot
//! table, merging two heaps of one pool only relinks roots: nothing is copied
//! and every handle stays valid.
//!
//! | Pool | Merge |
//! |------|-------|
//! | [`BinomialPool`](crate::binomial::BinomialPool) | O(log n + log m) root-list union |
//! | [`FibonacciPool`](crate::fibonacci::FibonacciPool) | O(1) ring splice |
//!
//! Heap ids are only meaningful to the pool that issued them; passing one to
//! another pool panics, as indexing a slice out of range does.

use std::ops::{Index, IndexMut};

/// Identifier of one heap inside a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeapId {
    pool: u32,
    index: usize,
}

impl HeapId {
    /// Position of the heap in its pool, in creation order
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Per-heap state of a pool, indexed by [`HeapId`]
pub(crate) struct HeapTable<S> {
    pool: u32,
    states: Vec<S>,
}

impl<S> HeapTable<S> {
    /// `pool` must be the identity of the pool's node allocator
    pub(crate) fn new(pool: u32) -> Self {
        Self {
            pool,
            states: Vec::new(),
        }
    }

    pub(crate) fn create(&mut self, state: S) -> HeapId {
        self.states.push(state);
        self.id(self.states.len() - 1)
    }

    pub(crate) fn len(&self) -> usize {
        self.states.len()
    }

    pub(crate) fn id(&self, index: usize) -> HeapId {
        HeapId {
            pool: self.pool,
            index,
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &S> + '_ {
        self.states.iter()
    }

    /// Exclusive access to two distinct heaps at once
    ///
    /// # Panics
    /// Panics if `a == b` or either id is foreign.
    pub(crate) fn pair_mut(&mut self, a: HeapId, b: HeapId) -> (&mut S, &mut S) {
        let (i, j) = (self.position(a), self.position(b));
        assert_ne!(i, j, "pair_mut of a heap with itself");
        if i < j {
            let (low, high) = self.states.split_at_mut(j);
            (&mut low[i], &mut high[0])
        } else {
            let (low, high) = self.states.split_at_mut(i);
            (&mut high[0], &mut low[j])
        }
    }

    #[inline]
    fn position(&self, id: HeapId) -> usize {
        assert!(id.pool == self.pool, "heap id from another pool");
        id.index
    }
}

impl<S> Index<HeapId> for HeapTable<S> {
    type Output = S;

    fn index(&self, id: HeapId) -> &S {
        &self.states[self.position(id)]
    }
}

impl<S> IndexMut<HeapId> for HeapTable<S> {
    fn index_mut(&mut self, id: HeapId) -> &mut S {
        let position = self.position(id);
        &mut self.states[position]
    }
}

/// Union-find over owner tags
///
/// Each node records the tag of the heap it was inserted into. Merging two
/// heaps unions their tag sets in O(α(n)) instead of rewriting the tags of
/// the donor's nodes, and the donor starts over with a fresh tag. The heap
/// owning a node is the heap recorded at its tag's representative.
#[derive(Default)]
pub(crate) struct OwnerSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
    /// Owning heap index, meaningful at representatives only
    heap: Vec<usize>,
}

impl OwnerSets {
    /// Starts a new singleton set owned by heap `heap`, returning its tag
    pub(crate) fn add(&mut self, heap: usize) -> usize {
        let tag = self.parent.len();
        self.parent.push(tag);
        self.rank.push(0);
        self.heap.push(heap);
        tag
    }

    /// Representative of `tag`, halving the path on the way up
    pub(crate) fn find(&mut self, mut tag: usize) -> usize {
        while self.parent[tag] != tag {
            let grandparent = self.parent[self.parent[tag]];
            self.parent[tag] = grandparent;
            tag = grandparent;
        }
        tag
    }

    /// Representative of `tag` without compressing
    pub(crate) fn root(&self, mut tag: usize) -> usize {
        while self.parent[tag] != tag {
            tag = self.parent[tag];
        }
        tag
    }

    /// Heap owning the nodes tagged `tag`
    pub(crate) fn owner(&self, tag: usize) -> usize {
        self.heap[self.root(tag)]
    }

    /// Same as [`owner`](Self::owner), compressing the path
    pub(crate) fn resolve(&mut self, tag: usize) -> usize {
        let root = self.find(tag);
        self.heap[root]
    }

    /// Joins the sets of `a` and `b` under heap `heap`, returning the new representative
    pub(crate) fn union(&mut self, a: usize, b: usize, heap: usize) -> usize {
        let (a, b) = (self.find(a), self.find(b));
        let root = if a == b {
            a
        } else if self.rank[a] < self.rank[b] {
            self.parent[a] = b;
            b
        } else {
            if self.rank[a] == self.rank[b] {
                self.rank[a] += 1;
            }
            self.parent[b] = a;
            a
        };
        self.heap[root] = heap;
        root
    }
}
