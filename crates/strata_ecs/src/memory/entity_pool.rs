//! # Entity Pool
//!
//! Fixed-capacity bump allocator over pre-constructed entity slots.

use crate::ecs::{Entity, EntityId};
use crate::error::{EcsError, EcsResult, PoolKind};

/// Pool of entity slots.
///
/// Every slot is constructed at creation. Allocation hands out the next
/// never-used slot; deallocation only clears the slot's flag and component
/// table, so ids grow monotonically and are never handed out twice.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. It is mutated only through `&mut World`.
pub struct EntityPool {
    /// The slot array.
    entities: Box<[Entity]>,
    /// Bump pointer.
    next_free_index: usize,
    /// Number of allocated slots.
    allocated_count: usize,
}

impl EntityPool {
    /// Creates a pool with the specified capacity.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of entities
    /// * `max_component_types` - Length of each slot's component table
    #[must_use]
    pub fn new(capacity: usize, max_component_types: usize) -> Self {
        let entities = (0..capacity)
            .map(|index| Entity::new(EntityId::new(index as u32), max_component_types))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            entities,
            next_free_index: 0,
            allocated_count: 0,
        }
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entities.len()
    }

    /// Returns the number of currently allocated entities.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.allocated_count
    }

    /// Returns the bump pointer.
    #[inline]
    #[must_use]
    pub const fn next_free_index(&self) -> usize {
        self.next_free_index
    }

    /// Allocates the next unused slot.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExhausted`] once every slot has been
    /// handed out. The pool is left untouched.
    pub fn allocate(&mut self) -> EcsResult<EntityId> {
        let capacity = self.capacity();
        let Some(entity) = self.entities.get_mut(self.next_free_index) else {
            tracing::warn!(capacity, "entity pool exhausted");
            return Err(EcsError::CapacityExhausted {
                resource: PoolKind::Entities,
                capacity,
            });
        };

        entity.mark_allocated();
        self.next_free_index += 1;
        self.allocated_count += 1;
        Ok(entity.id())
    }

    /// Releases a slot. The slot object stays in place and is not reused.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] if the slot is not allocated.
    pub fn deallocate(&mut self, id: EntityId) -> EcsResult<()> {
        let entity = self.get_allocated_mut(id)?;
        entity.release();
        self.allocated_count -= 1;
        Ok(())
    }

    /// Gets a slot by id, allocated or not.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] for ids beyond the capacity.
    #[inline]
    pub fn get(&self, id: EntityId) -> EcsResult<&Entity> {
        let len = self.capacity();
        self.entities.get(id.slot()).ok_or(EcsError::IndexOutOfRange {
            index: id.slot(),
            len,
        })
    }

    /// Gets an allocated slot by id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] if the slot is free or beyond
    /// the capacity.
    #[inline]
    pub fn get_allocated(&self, id: EntityId) -> EcsResult<&Entity> {
        match self.entities.get(id.slot()) {
            Some(entity) if entity.is_allocated() => Ok(entity),
            _ => Err(EcsError::EntityNotAllocated(id)),
        }
    }

    /// Gets an allocated slot by id, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] if the slot is free or beyond
    /// the capacity.
    #[inline]
    pub(crate) fn get_allocated_mut(&mut self, id: EntityId) -> EcsResult<&mut Entity> {
        match self.entities.get_mut(id.slot()) {
            Some(entity) if entity.is_allocated() => Ok(entity),
            _ => Err(EcsError::EntityNotAllocated(id)),
        }
    }

    /// Checks if a slot is allocated. Ids beyond the capacity are not.
    #[inline]
    #[must_use]
    pub fn is_allocated(&self, id: EntityId) -> bool {
        self.entities
            .get(id.slot())
            .is_some_and(Entity::is_allocated)
    }

    /// Iterates over allocated entities in id order.
    pub fn iter_allocated(&self) -> impl Iterator<Item = &Entity> {
        self.entities[..self.next_free_index]
            .iter()
            .filter(|entity| entity.is_allocated())
    }

    /// Rebuilds the pool from a structural snapshot.
    ///
    /// Every entry is checked first; the pool is only touched once the whole
    /// snapshot fits. Then every slot is released and each `(id, slots)`
    /// entry is marked allocated with its component table.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidLayout`] if the cursor exceeds the capacity,
    /// or an entry lies at or beyond the cursor, repeats an id, or references
    /// a type outside the table. The pool is unchanged on error.
    pub fn restore<'a, I>(&mut self, next_free_index: usize, allocated: I) -> EcsResult<()>
    where
        I: IntoIterator<Item = (EntityId, &'a [(usize, usize)])>,
    {
        if next_free_index > self.capacity() {
            return Err(EcsError::InvalidLayout(format!(
                "entity cursor {next_free_index} beyond capacity {}",
                self.capacity()
            )));
        }

        let allocated = allocated.into_iter().collect::<Vec<_>>();
        let mut seen = vec![false; next_free_index];
        for &(id, slots) in &allocated {
            if id.slot() >= next_free_index {
                return Err(EcsError::InvalidLayout(format!(
                    "entity {id} at or beyond cursor {next_free_index}"
                )));
            }
            if std::mem::replace(&mut seen[id.slot()], true) {
                return Err(EcsError::InvalidLayout(format!("entity {id} listed twice")));
            }
            let table_len = self.entities[id.slot()].component_slots().len();
            if let Some(&(type_index, _)) = slots.iter().find(|(type_index, _)| *type_index >= table_len) {
                return Err(EcsError::InvalidLayout(format!(
                    "entity {id} references type index {type_index} beyond the table"
                )));
            }
        }

        for entity in &mut self.entities {
            entity.release();
        }
        self.next_free_index = next_free_index;
        self.allocated_count = allocated.len();
        for (id, slots) in allocated {
            let entity = &mut self.entities[id.slot()];
            entity.mark_allocated();
            for &(type_index, component_index) in slots {
                entity.set_slot(type_index, Some(component_index));
            }
        }
        Ok(())
    }
}
