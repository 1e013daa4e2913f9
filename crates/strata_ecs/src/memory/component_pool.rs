//! # Component Pool
//!
//! Pre-allocated, fixed-capacity storage for one component type.
//!
//! The pool is a bump allocator:
//! - All slots are default-constructed at creation
//! - Access is O(1) by component index
//! - Deallocation only clears the owner; the slot is never handed out again

use std::any::{type_name, Any};

use bytemuck::Pod;

use crate::ecs::{Component, EntityId};
use crate::error::{EcsError, EcsResult, PoolKind};

/// Pre-allocated storage for a single component type.
///
/// Data and owners live in two parallel arrays so the data array stays
/// contiguous for iteration and byte snapshots.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: ComponentPool<Position> = ComponentPool::new(1024);
/// let index = pool.allocate(entity)?;
/// pool.get_mut(index)?.x = 1.0;
/// ```
pub struct ComponentPool<T: Component> {
    /// Component data, one entry per slot.
    data: Box<[T]>,
    /// Owning entity per slot, `None` when free or deallocated.
    owners: Box<[Option<EntityId>]>,
    /// Bump pointer. Slots below it have been handed out at least once.
    next_free_index: usize,
    /// Slots currently owned by an entity.
    live_count: usize,
}

impl<T: Component> ComponentPool<T> {
    /// Creates a pool with `capacity` default-constructed slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let data = (0..capacity).map(|_| T::default()).collect::<Vec<_>>();
        Self {
            data: data.into_boxed_slice(),
            owners: vec![None; capacity].into_boxed_slice(),
            next_free_index: 0,
            live_count: 0,
        }
    }

    /// Returns the fixed capacity of this pool.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns the bump pointer.
    #[inline]
    #[must_use]
    pub const fn next_free_index(&self) -> usize {
        self.next_free_index
    }

    /// Returns the number of slots owned by an entity.
    #[inline]
    #[must_use]
    pub const fn live_count(&self) -> usize {
        self.live_count
    }

    /// Returns how many slots can still be allocated.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.next_free_index
    }

    /// Allocates the next slot for `entity`, reset to `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExhausted`] when every slot has been handed
    /// out. Deallocated slots do not count as free.
    pub fn allocate(&mut self, entity: EntityId) -> EcsResult<usize> {
        let index = self.next_free_index;
        if index >= self.capacity() {
            tracing::warn!(
                component = type_name::<T>(),
                capacity = self.capacity(),
                "component pool exhausted"
            );
            return Err(EcsError::CapacityExhausted {
                resource: PoolKind::Components {
                    type_name: type_name::<T>(),
                },
                capacity: self.capacity(),
            });
        }

        // TODO: recycle deallocated slots through a generation-tagged free list
        // once ComponentReference carries a generation.
        self.data[index] = T::default();
        self.owners[index] = Some(entity);
        self.next_free_index += 1;
        self.live_count += 1;
        Ok(index)
    }

    /// Releases a slot, returning its former owner.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] beyond the pool's length.
    pub fn deallocate(&mut self, index: usize) -> EcsResult<Option<EntityId>> {
        let len = self.capacity();
        let owner = self
            .owners
            .get_mut(index)
            .ok_or(EcsError::IndexOutOfRange { index, len })?;
        let previous = owner.take();
        if previous.is_some() {
            self.live_count -= 1;
        }
        Ok(previous)
    }

    /// Gets a component by index.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] beyond the pool's length.
    #[inline]
    pub fn get(&self, index: usize) -> EcsResult<&T> {
        let len = self.capacity();
        self.data.get(index).ok_or(EcsError::IndexOutOfRange { index, len })
    }

    /// Gets a mutable component by index.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] beyond the pool's length.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> EcsResult<&mut T> {
        let len = self.capacity();
        self.data
            .get_mut(index)
            .ok_or(EcsError::IndexOutOfRange { index, len })
    }

    /// Returns the owner of a slot.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] beyond the pool's length.
    #[inline]
    pub fn owner(&self, index: usize) -> EcsResult<Option<EntityId>> {
        let len = self.capacity();
        self.owners
            .get(index)
            .copied()
            .ok_or(EcsError::IndexOutOfRange { index, len })
    }

    /// Iterates `(index, owner, component)` over live slots.
    pub fn iter_live(&self) -> impl Iterator<Item = (usize, EntityId, &T)> {
        self.owners
            .iter()
            .zip(self.data.iter())
            .enumerate()
            .filter_map(|(index, (owner, data))| owner.map(|owner| (index, owner, data)))
    }

    /// Writes a slot back during restore.
    ///
    /// Moves the bump pointer past `index` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] beyond the pool's length.
    pub fn restore_slot(&mut self, index: usize, owner: Option<EntityId>, value: T) -> EcsResult<()> {
        let len = self.capacity();
        if index >= len {
            return Err(EcsError::IndexOutOfRange { index, len });
        }
        match (self.owners[index].is_some(), owner.is_some()) {
            (false, true) => self.live_count += 1,
            (true, false) => self.live_count -= 1,
            _ => {}
        }
        self.owners[index] = owner;
        self.data[index] = value;
        self.next_free_index = self.next_free_index.max(index + 1);
        Ok(())
    }
}

impl<T: Component + Pod> ComponentPool<T> {
    /// The whole data array as bytes, free slots included.
    #[must_use]
    pub fn data_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data[..])
    }

    /// Overwrites the whole data array from bytes taken by [`Self::data_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidLayout`] if the length does not match.
    pub fn restore_data_bytes(&mut self, bytes: &[u8]) -> EcsResult<()> {
        let target: &mut [u8] = bytemuck::cast_slice_mut(&mut self.data[..]);
        if target.len() != bytes.len() {
            return Err(EcsError::InvalidLayout(format!(
                "{} expects {} data bytes, got {}",
                type_name::<T>(),
                target.len(),
                bytes.len()
            )));
        }
        target.copy_from_slice(bytes);
        Ok(())
    }
}

/// Type-erased view of a [`ComponentPool`], used by the type registry.
pub trait ErasedPool: Send + Sync {
    /// Full type name of the stored component.
    fn type_name(&self) -> &'static str;

    /// Fixed capacity.
    fn capacity(&self) -> usize;

    /// Bump pointer.
    fn next_free_index(&self) -> usize;

    /// Owner table, one entry per slot.
    fn owners(&self) -> &[Option<EntityId>];

    /// Releases a slot.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] beyond the pool's length.
    fn deallocate(&mut self, index: usize) -> EcsResult<Option<EntityId>>;

    /// Replaces the bump pointer and owner table during restore.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidLayout`] for indices beyond the pool.
    fn restore_owners(&mut self, next_free_index: usize, owners: &[(usize, EntityId)]) -> EcsResult<()>;

    /// Upcast for downcasting to the concrete pool.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete pool.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedPool for ComponentPool<T> {
    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn next_free_index(&self) -> usize {
        self.next_free_index
    }

    fn owners(&self) -> &[Option<EntityId>] {
        &self.owners
    }

    fn deallocate(&mut self, index: usize) -> EcsResult<Option<EntityId>> {
        ComponentPool::deallocate(self, index)
    }

    fn restore_owners(&mut self, next_free_index: usize, owners: &[(usize, EntityId)]) -> EcsResult<()> {
        let len = self.data.len();
        if next_free_index > len {
            return Err(EcsError::InvalidLayout(format!(
                "{} cursor {next_free_index} beyond capacity {len}",
                type_name::<T>()
            )));
        }
        if let Some(&(index, _)) = owners.iter().find(|(index, _)| *index >= next_free_index) {
            return Err(EcsError::InvalidLayout(format!(
                "{} slot {index} owned beyond cursor {next_free_index}",
                type_name::<T>()
            )));
        }

        for owner in self.owners.iter_mut() {
            *owner = None;
        }
        for &(index, entity) in owners {
            self.owners[index] = Some(entity);
        }
        self.next_free_index = next_free_index;
        self.live_count = self.owners.iter().filter(|owner| owner.is_some()).count();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Position {
        x: f32,
        y: f32,
    }
    impl Component for Position {}

    #[test]
    fn test_pool_creation() {
        let pool: ComponentPool<Position> = ComponentPool::new(100);
        assert_eq!(pool.capacity(), 100);
        assert_eq!(pool.remaining(), 100);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn test_pool_allocate_get() {
        let mut pool: ComponentPool<Position> = ComponentPool::new(4);
        let index = pool.allocate(EntityId::new(3)).unwrap();
        assert_eq!(index, 0);

        pool.get_mut(index).unwrap().x = 5.0;
        assert!((pool.get(index).unwrap().x - 5.0).abs() < f32::EPSILON);
        assert_eq!(pool.owner(index).unwrap(), Some(EntityId::new(3)));
    }

    #[test]
    fn test_pool_bounds() {
        let pool: ComponentPool<Position> = ComponentPool::new(4);
        assert!(pool.get(3).is_ok());
        assert_eq!(
            pool.get(4).unwrap_err(),
            EcsError::IndexOutOfRange { index: 4, len: 4 }
        );
    }

    #[test]
    fn test_pool_full() {
        let mut pool: ComponentPool<Position> = ComponentPool::new(2);
        pool.allocate(EntityId::new(0)).unwrap();
        pool.allocate(EntityId::new(1)).unwrap();

        let err = pool.allocate(EntityId::new(2)).unwrap_err();
        assert!(matches!(err, EcsError::CapacityExhausted { capacity: 2, .. }));
        assert_eq!(pool.live_count(), 2);
    }

    #[test]
    fn test_deallocated_slot_not_reused() {
        let mut pool: ComponentPool<Position> = ComponentPool::new(2);
        let first = pool.allocate(EntityId::new(0)).unwrap();
        assert_eq!(pool.deallocate(first).unwrap(), Some(EntityId::new(0)));
        assert_eq!(pool.live_count(), 0);

        let second = pool.allocate(EntityId::new(1)).unwrap();
        assert_eq!(second, 1);
        assert!(pool.allocate(EntityId::new(2)).is_err());
    }

    #[test]
    fn test_restore_slot_moves_cursor() {
        let mut pool: ComponentPool<Position> = ComponentPool::new(4);
        pool.restore_slot(2, Some(EntityId::new(5)), Position { x: 9.0, y: 9.0 })
            .unwrap();
        assert_eq!(pool.next_free_index(), 3);
        assert_eq!(pool.live_count(), 1);

        let index = pool.allocate(EntityId::new(6)).unwrap();
        assert_eq!(index, 3);
        assert_eq!(*pool.get(index).unwrap(), Position::default());
    }

    #[test]
    fn test_iter_live() {
        let mut pool: ComponentPool<Position> = ComponentPool::new(4);
        let a = pool.allocate(EntityId::new(0)).unwrap();
        let b = pool.allocate(EntityId::new(1)).unwrap();
        pool.deallocate(a).unwrap();

        let live: Vec<_> = pool.iter_live().map(|(i, owner, _)| (i, owner)).collect();
        assert_eq!(live, vec![(b, EntityId::new(1))]);
    }

    #[test]
    fn test_data_bytes_roundtrip() {
        let mut source: ComponentPool<Position> = ComponentPool::new(3);
        let index = source.allocate(EntityId::new(0)).unwrap();
        *source.get_mut(index).unwrap() = Position { x: 1.5, y: -2.0 };

        let mut target: ComponentPool<Position> = ComponentPool::new(3);
        target.restore_data_bytes(source.data_bytes()).unwrap();
        assert_eq!(*target.get(index).unwrap(), Position { x: 1.5, y: -2.0 });

        let mut small: ComponentPool<Position> = ComponentPool::new(1);
        assert!(matches!(
            small.restore_data_bytes(source.data_bytes()),
            Err(EcsError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_restore_owners_validation() {
        let mut pool: ComponentPool<Position> = ComponentPool::new(4);
        let pool: &mut dyn ErasedPool = &mut pool;
        assert!(pool.restore_owners(5, &[]).is_err());
        assert!(pool.restore_owners(1, &[(2, EntityId::new(0))]).is_err());

        pool.restore_owners(3, &[(0, EntityId::new(7)), (2, EntityId::new(8))]).unwrap();
        assert_eq!(pool.next_free_index(), 3);
        assert_eq!(pool.owners()[2], Some(EntityId::new(8)));
        assert_eq!(pool.owners()[1], None);
    }
}
