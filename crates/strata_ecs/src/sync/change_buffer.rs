//! # Double-Buffered Change Sets
//!
//! Writers append to the current buffer from any thread. Once per frame the
//! single-threaded frame driver applies the current buffer, publishes it as
//! the read-only previous buffer and clears the other one for writing.
//!
//! ```text
//! Tick N:
//!   systems write  -> buffer A (current)
//!   systems read   <- buffer B (previous, frozen)
//!
//! begin_frame (N+1):
//!   apply A, previous = A, current = B, clear B
//!
//! Tick N+1:
//!   systems write  -> buffer B
//!   systems read   <- buffer A
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::ecs::{ComponentReference, EntityId};

/// Entities added to and removed from a filter during one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    /// Newly matching entities with their component references.
    pub added: BTreeMap<EntityId, Vec<ComponentReference>>,
    /// Entities that stopped matching.
    pub removed: BTreeSet<EntityId>,
}

impl ChangeSet {
    /// Whether neither set holds an entity.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Empties both sets, keeping their allocations where possible.
    #[inline]
    pub fn clear(&mut self) {
        self.added.clear();
        self.removed.clear();
    }
}

/// Two change sets plus the selectors for the write and read sides.
///
/// ## Thread Safety
///
/// - Writers: any number, through [`DoubleBuffer::lock_current`]
/// - Readers: any number, through [`DoubleBuffer::lock_previous`]
/// - Swap: one thread, between ticks
pub struct DoubleBuffer {
    buffers: [Mutex<ChangeSet>; 2],
    /// Index of the buffer writers append to.
    current: AtomicUsize,
    /// Index of the buffer published by the last swap.
    previous: AtomicUsize,
    /// Number of completed swaps.
    swap_count: AtomicUsize,
}

impl DoubleBuffer {
    /// Creates two empty buffers. Writing starts in buffer 0 and the
    /// published side starts as the empty buffer 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffers: [Mutex::new(ChangeSet::default()), Mutex::new(ChangeSet::default())],
            current: AtomicUsize::new(0),
            previous: AtomicUsize::new(1),
            swap_count: AtomicUsize::new(0),
        }
    }

    /// Index of the write side (0 or 1).
    #[inline]
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// Index of the published side (0 or 1).
    #[inline]
    #[must_use]
    pub fn previous_index(&self) -> usize {
        self.previous.load(Ordering::Acquire)
    }

    /// Number of completed swaps.
    #[inline]
    #[must_use]
    pub fn swap_count(&self) -> usize {
        self.swap_count.load(Ordering::Relaxed)
    }

    /// Locks the write side.
    ///
    /// If a swap flips the selector between reading it and acquiring the
    /// lock, the lock is dropped and taken again on the new side, so a
    /// writer never lands in a published buffer.
    pub fn lock_current(&self) -> MutexGuard<'_, ChangeSet> {
        loop {
            let index = self.current.load(Ordering::Acquire);
            let guard = self.buffers[index].lock();
            if self.current.load(Ordering::Acquire) == index {
                return guard;
            }
        }
    }

    /// Locks the published side for reading.
    pub fn lock_previous(&self) -> MutexGuard<'_, ChangeSet> {
        self.buffers[self.previous.load(Ordering::Acquire)].lock()
    }

    /// Applies the write side, publishes it and opens the other side for
    /// writing.
    ///
    /// `apply` runs while the write side is locked, so no writer can slip a
    /// change in between the apply and the flip.
    pub fn swap<F>(&self, apply: F)
    where
        F: FnOnce(&ChangeSet),
    {
        let index = self.current.load(Ordering::Acquire);
        let written = self.buffers[index].lock();
        apply(&written);

        let next = index ^ 1;
        self.buffers[next].lock().clear();
        self.previous.store(index, Ordering::Release);
        self.current.store(next, Ordering::Release);
        drop(written);

        self.swap_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies of the published side and the write side.
    pub fn capture(&self) -> (ChangeSet, ChangeSet) {
        let published = self.lock_previous().clone();
        let pending = self.lock_current().clone();
        (published, pending)
    }

    /// Overwrites the published side and the write side without flipping.
    pub fn restore(&self, published: ChangeSet, pending: ChangeSet) {
        *self.lock_previous() = published;
        *self.lock_current() = pending;
    }
}

impl Default for DoubleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
