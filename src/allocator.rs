//! Power-of-two block allocator for fixed-size nodes
//!
//! [`BlockAllocator`] hands out slots from a virtual, infinitely growable array.
//! Storage is a table of blocks where block `i` holds `2^i` slots, so the virtual
//! index space is covered without ever moving a live value:
//!
//! | Block | Capacity | Virtual indices |
//! |-------|----------|-----------------|
//! | 0     | 1        | 0               |
//! | 1     | 2        | 1..=2           |
//! | 2     | 4        | 3..=6           |
//! | k     | 2ᵏ       | 2ᵏ-1 ..= 2ᵏ⁺¹-2 |
//!
//! Freed slots are recycled through an intrusive free list: a vacant slot stores
//! the index of the next vacant slot (or [`NO_BLOCK`]) in place of its value, so
//! no separate free-list storage exists.
//!
//! # Time Complexity
//!
//! | Operation    | Complexity                                   |
//! |--------------|----------------------------------------------|
//! | `allocate`   | O(1) amortized (growth is O(block) but happens O(log n) times) |
//! | `deallocate` | O(1)                                         |
//! | `get`        | O(1)                                         |
//! | `slot_of`    | O(log n) (searches the block table)          |
//!
//! # Stale ids
//!
//! Every [`SlotId`] carries the identity of the allocator that issued it and the
//! slot's generation at allocation time. Deallocating a slot advances its
//! generation, so an id that outlived its value is rejected instead of aliasing
//! whatever value reuses the slot.
//!
//! Generations are 32-bit. A slot whose generation is exhausted is retired on
//! its last deallocation: it stays vacant and never rejoins the free list, so
//! an id can not come back to life after 2³² reuses of its slot.
//!
//! # Example
//!
//! ```rust
//! use arena_heaps::allocator::BlockAllocator;
//!
//! let mut alloc = BlockAllocator::new();
//! let a = alloc.allocate("a");
//! let b = alloc.allocate("b");
//! assert_eq!(alloc.get(a), Some(&"a"));
//!
//! assert_eq!(alloc.deallocate(a), Some("a"));
//! assert_eq!(alloc.get(a), None);
//!
//! // The freed slot is reused, but the old id stays dead.
//! let c = alloc.allocate("c");
//! assert_eq!(c.index(), a.index());
//! assert_eq!(alloc.get(a), None);
//! assert_eq!(alloc.get(b), Some(&"b"));
//! ```

use std::alloc::{handle_alloc_error, Layout};
use std::fmt;
use std::mem;
use std::ops::{Index, IndexMut};
use std::sync::atomic::{AtomicU32, Ordering};

/// Sentinel index terminating the free list ("no block")
pub const NO_BLOCK: usize = usize::MAX;

static NEXT_ALLOCATOR_ID: AtomicU32 = AtomicU32::new(0);

fn next_allocator_id() -> u32 {
    NEXT_ALLOCATOR_ID.fetch_add(1, Ordering::Relaxed)
}

/// Maps a virtual index to its `(block, offset)` pair
///
/// Block `b` starts at virtual index `2^b - 1`, so the block is
/// `floor(log2(index + 1))` and the offset is what remains after subtracting
/// the block's first index.
///
/// ```rust
/// use arena_heaps::allocator::locate;
///
/// assert_eq!(locate(0), (0, 0));
/// assert_eq!(locate(1), (1, 0));
/// assert_eq!(locate(2), (1, 1));
/// assert_eq!(locate(6), (2, 3));
/// assert_eq!(locate(7), (3, 0));
/// ```
#[inline]
pub fn locate(index: usize) -> (usize, usize) {
    debug_assert!(index != NO_BLOCK);
    let n = index + 1;
    let block = (usize::BITS - 1 - n.leading_zeros()) as usize;
    (block, n - (1 << block))
}

/// Intrusive link from one slot to another
///
/// Node-based heaps store their father/child/sibling pointers as virtual
/// indices into their allocator. "No link" is the [`NO_BLOCK`] sentinel, so a
/// link is the size of a plain index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Link(usize);

impl Link {
    pub(crate) const NONE: Link = Link(NO_BLOCK);

    #[inline]
    pub(crate) fn to(index: usize) -> Link {
        debug_assert!(index != NO_BLOCK);
        Link(index)
    }

    #[inline]
    pub(crate) fn get(self) -> Option<usize> {
        if self.is_none() {
            None
        } else {
            Some(self.0)
        }
    }

    #[inline]
    pub(crate) fn is_none(self) -> bool {
        self.0 == NO_BLOCK
    }

    #[inline]
    pub(crate) fn is_some(self) -> bool {
        self.0 != NO_BLOCK
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(index) => write!(f, "Link({index})"),
            None => f.write_str("Link(-)"),
        }
    }
}

/// Identifier of a live slot
///
/// Obtained from [`BlockAllocator::allocate`]. Ids are only meaningful to the
/// allocator that issued them; any other allocator rejects them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    allocator: u32,
    generation: u32,
    index: usize,
}

impl SlotId {
    /// The virtual index of the slot
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The generation the slot had when this id was issued
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({}v{}@{})", self.index, self.generation, self.allocator)
    }
}

enum Entry<T> {
    Occupied(T),
    Vacant { next: usize },
    /// Generation exhausted; never handed out again
    Retired,
}

struct Slot<T> {
    generation: u32,
    entry: Entry<T>,
}

/// Allocator of fixed-size slots backed by power-of-two blocks
///
/// Values never move once allocated: growth appends a new block instead of
/// reallocating existing ones, so a reference to a live value stays at the
/// same address until the value is deallocated.
pub struct BlockAllocator<T> {
    id: u32,
    blocks: Vec<Box<[Slot<T>]>>,
    /// Head of the intrusive free list
    free_head: usize,
    /// Sum of all block capacities
    total: usize,
    live: usize,
}

impl<T> BlockAllocator<T> {
    /// Creates an allocator with no blocks
    pub fn new() -> Self {
        Self {
            id: next_allocator_id(),
            blocks: Vec::new(),
            free_head: NO_BLOCK,
            total: 0,
            live: 0,
        }
    }

    /// Creates an allocator whose blocks already hold at least `capacity` slots
    pub fn with_capacity(capacity: usize) -> Self {
        let mut alloc = Self::new();
        alloc.reserve(capacity);
        alloc
    }

    /// Identity stamped into every [`SlotId`] this allocator issues
    #[inline]
    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    /// Number of live values
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns true if no value is live
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Total number of slots across all blocks
    #[inline]
    pub fn capacity(&self) -> usize {
        self.total
    }

    /// Number of blocks in the block table
    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Grows the block table until at least `capacity` slots exist
    pub fn reserve(&mut self, capacity: usize) {
        while self.total < capacity {
            self.grow();
        }
    }

    /// Stores `value` in a free slot and returns its id
    ///
    /// Pops the head of the free list, appending a new block first when the
    /// list is empty.
    pub fn allocate(&mut self, value: T) -> SlotId {
        if self.free_head == NO_BLOCK {
            self.grow();
        }

        let index = self.free_head;
        let allocator = self.id;
        let slot = self.slot_mut(index);
        let next = match slot.entry {
            Entry::Vacant { next } => next,
            Entry::Occupied(_) | Entry::Retired => {
                unreachable!("free list points at a slot in use or retired")
            }
        };
        slot.entry = Entry::Occupied(value);
        let generation = slot.generation;

        self.free_head = next;
        self.live += 1;

        SlotId {
            allocator,
            generation,
            index,
        }
    }

    /// Returns the slot named by `id` to the free list, yielding its value
    ///
    /// Returns `None` if the id is stale or was issued by another allocator.
    pub fn deallocate(&mut self, id: SlotId) -> Option<T> {
        if !self.contains(id) {
            return None;
        }
        Some(self.take(id.index))
    }

    /// Returns true if `id` names a live value of this allocator
    pub fn contains(&self, id: SlotId) -> bool {
        self.get(id).is_some()
    }

    /// Shared access to the value named by `id`
    pub fn get(&self, id: SlotId) -> Option<&T> {
        if id.allocator != self.id || id.index >= self.total {
            return None;
        }
        let slot = self.slot(id.index);
        match &slot.entry {
            Entry::Occupied(value) if slot.generation == id.generation => Some(value),
            _ => None,
        }
    }

    /// Exclusive access to the value named by `id`
    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        if id.allocator != self.id || id.index >= self.total {
            return None;
        }
        let slot = self.slot_mut(id.index);
        match &mut slot.entry {
            Entry::Occupied(value) if slot.generation == id.generation => Some(value),
            _ => None,
        }
    }

    /// Current id of the live value at virtual `index`
    pub fn id_at(&self, index: usize) -> Option<SlotId> {
        if index >= self.total {
            return None;
        }
        let slot = self.slot(index);
        match slot.entry {
            Entry::Occupied(_) => Some(SlotId {
                allocator: self.id,
                generation: slot.generation,
                index,
            }),
            Entry::Vacant { .. } | Entry::Retired => None,
        }
    }

    /// Maps a reference to a live value back to its id
    ///
    /// Searches the block table for the block whose address range contains
    /// `value` and recovers the offset by pointer subtraction. Returns `None`
    /// if `value` does not live in this allocator.
    pub fn slot_of(&self, value: &T) -> Option<SlotId> {
        let addr = value as *const T as usize;
        let stride = mem::size_of::<Slot<T>>();

        let mut first_index = 0;
        for block in &self.blocks {
            let start = block.as_ptr() as usize;
            let end = start + block.len() * stride;
            if start <= addr && addr < end {
                let offset = (addr - start) / stride;
                let id = self.id_at(first_index + offset)?;
                // Only a pointer to the value itself counts, not one into a vacant slot
                return match self.get(id) {
                    Some(found) if std::ptr::eq(found, value) => Some(id),
                    _ => None,
                };
            }
            first_index += block.len();
        }
        None
    }

    /// Allocates a run of values outside the block table
    ///
    /// Only single slots come from the blocks; multi-object requests go straight
    /// to the global allocator and are owned by the returned box, so no
    /// allocator instance is involved.
    pub fn allocate_many<I>(values: I) -> Box<[T]>
    where
        I: IntoIterator<Item = T>,
    {
        values.into_iter().collect()
    }

    /// Removes the value at virtual `index`, pushing the slot onto the free list
    ///
    /// A slot whose generation can not advance any further is retired instead.
    ///
    /// # Panics
    /// Panics if the slot is vacant.
    pub fn take(&mut self, index: usize) -> T {
        let head = self.free_head;
        let slot = self.slot_mut(index);
        let entry = mem::replace(&mut slot.entry, Entry::Vacant { next: head });
        let value = match entry {
            Entry::Occupied(value) => value,
            Entry::Vacant { .. } | Entry::Retired => panic!("take of vacant slot {index}"),
        };
        let recycled = match slot.generation.checked_add(1) {
            Some(generation) => {
                slot.generation = generation;
                true
            }
            None => {
                slot.entry = Entry::Retired;
                false
            }
        };

        if recycled {
            self.free_head = index;
        } else {
            tracing::debug!(index, "retired slot with exhausted generation");
        }
        self.live -= 1;
        value
    }

    /// Drops every live value, keeping the blocks
    ///
    /// Generations of the dropped values advance, so all previously issued ids
    /// become stale. The free list is rebuilt in ascending index order and
    /// skips retired slots.
    pub fn clear(&mut self) {
        let mut next = NO_BLOCK;
        for (block, slots) in self.blocks.iter_mut().enumerate().rev() {
            let first = (1usize << block) - 1;
            for (offset, slot) in slots.iter_mut().enumerate().rev() {
                if let Entry::Occupied(_) = slot.entry {
                    match slot.generation.checked_add(1) {
                        Some(generation) => slot.generation = generation,
                        None => slot.entry = Entry::Retired,
                    }
                }
                if let Entry::Retired = slot.entry {
                    continue;
                }
                slot.entry = Entry::Vacant { next };
                next = first + offset;
            }
        }
        self.free_head = next;
        self.live = 0;
    }

    /// Iterates over live values with their ids, in index order
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &T)> + '_ {
        let allocator = self.id;
        self.blocks
            .iter()
            .flat_map(|block| block.iter())
            .enumerate()
            .filter_map(move |(index, slot)| match &slot.entry {
                Entry::Occupied(value) => Some((
                    SlotId {
                        allocator,
                        generation: slot.generation,
                        index,
                    },
                    value,
                )),
                Entry::Vacant { .. } | Entry::Retired => None,
            })
    }

    #[inline]
    fn slot(&self, index: usize) -> &Slot<T> {
        let (block, offset) = locate(index);
        &self.blocks[block][offset]
    }

    #[inline]
    fn slot_mut(&mut self, index: usize) -> &mut Slot<T> {
        let (block, offset) = locate(index);
        &mut self.blocks[block][offset]
    }

    /// Appends block `i` with `2^i` slots and makes them the free list
    ///
    /// Only called when the free list is empty or to pre-reserve; in both
    /// cases the new range is spliced in front of the current head.
    fn grow(&mut self) {
        let block = self.blocks.len();
        let capacity = 1usize
            .checked_shl(block as u32)
            .filter(|c| self.total.checked_add(*c).is_some_and(|t| t < NO_BLOCK))
            .unwrap_or_else(|| panic!("block allocator capacity overflow"));

        let mut slots: Vec<Slot<T>> = Vec::new();
        if slots.try_reserve_exact(capacity).is_err() {
            let layout = Layout::array::<Slot<T>>(capacity)
                .unwrap_or_else(|_| panic!("block allocator capacity overflow"));
            handle_alloc_error(layout);
        }

        let base = self.total;
        for offset in 0..capacity {
            let next = if offset + 1 == capacity {
                self.free_head
            } else {
                base + offset + 1
            };
            slots.push(Slot {
                generation: 0,
                entry: Entry::Vacant { next },
            });
        }

        self.blocks.push(slots.into_boxed_slice());
        self.free_head = base;
        self.total += capacity;
        debug_assert!(self.free_head < self.total);

        tracing::trace!(block, capacity, total = self.total, "grew block table");
    }
}

impl<T> Default for BlockAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for BlockAllocator<T> {
    type Output = T;

    /// # Panics
    /// Panics if the slot is vacant or beyond the allocated blocks.
    fn index(&self, index: usize) -> &T {
        match &self.slot(index).entry {
            Entry::Occupied(value) => value,
            Entry::Vacant { .. } | Entry::Retired => panic!("index of vacant slot {index}"),
        }
    }
}

impl<T> IndexMut<usize> for BlockAllocator<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match &mut self.slot_mut(index).entry {
            Entry::Occupied(value) => value,
            Entry::Vacant { .. } | Entry::Retired => panic!("index of vacant slot {index}"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BlockAllocator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockAllocator")
            .field("len", &self.live)
            .field("capacity", &self.total)
            .field("blocks", &self.blocks.len())
            .finish()
    }
}
