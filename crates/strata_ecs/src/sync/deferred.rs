//! # Deferred Entity Deletion
//!
//! Systems mark entities for deletion through a shared reference; the frame
//! driver collects the marks once per frame.

use std::collections::BTreeSet;

use parking_lot::Mutex;

use crate::ecs::EntityId;

/// Double-buffered set of entity ids marked for deletion.
///
/// Marks land in the current buffer. [`DeferredDeletions::rotate`] hands the
/// current buffer's ids to the frame driver and flips to the other buffer.
#[derive(Default)]
pub struct DeferredDeletions {
    buffers: [Mutex<BTreeSet<EntityId>>; 2],
    current: usize,
}

impl DeferredDeletions {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an entity. Marking twice in one tick is a no-op.
    ///
    /// Returns `true` if the entity was not already marked.
    pub fn mark(&self, id: EntityId) -> bool {
        self.buffers[self.current].lock().insert(id)
    }

    /// Ids marked in the current buffer, in id order.
    #[must_use]
    pub fn marked(&self) -> Vec<EntityId> {
        self.buffers[self.current].lock().iter().copied().collect()
    }

    /// Whether an entity is marked in the current buffer.
    #[must_use]
    pub fn is_marked(&self, id: EntityId) -> bool {
        self.buffers[self.current].lock().contains(&id)
    }

    /// Flips to the other buffer and returns the ids of the one just closed.
    ///
    /// The new current buffer is cleared before it takes marks.
    pub fn rotate(&mut self) -> BTreeSet<EntityId> {
        let closed = std::mem::take(self.buffers[self.current].get_mut());
        self.current ^= 1;
        self.buffers[self.current].get_mut().clear();
        closed
    }

    /// Replaces the current marks during restore.
    pub fn restore(&mut self, ids: impl IntoIterator<Item = EntityId>) {
        for buffer in &mut self.buffers {
            buffer.get_mut().clear();
        }
        self.buffers[self.current].get_mut().extend(ids);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_is_idempotent() {
        let deletions = DeferredDeletions::new();
        assert!(deletions.mark(EntityId::new(3)));
        assert!(!deletions.mark(EntityId::new(3)));
        assert_eq!(deletions.marked(), vec![EntityId::new(3)]);
    }

    #[test]
    fn test_rotate() {
        let mut deletions = DeferredDeletions::new();
        deletions.mark(EntityId::new(2));
        deletions.mark(EntityId::new(1));

        let closed = deletions.rotate();
        assert_eq!(
            closed.into_iter().collect::<Vec<_>>(),
            vec![EntityId::new(1), EntityId::new(2)]
        );
        assert!(deletions.marked().is_empty());
        assert!(!deletions.is_marked(EntityId::new(1)));
    }

    #[test]
    fn test_parallel_marks() {
        let deletions = DeferredDeletions::new();
        std::thread::scope(|scope| {
            for t in 0..4u32 {
                let deletions = &deletions;
                scope.spawn(move || {
                    for i in 0..50u32 {
                        deletions.mark(EntityId::new(i * 4 + t));
                    }
                });
            }
        });
        assert_eq!(deletions.marked().len(), 200);
    }
}
