//! # Component Pool Collection
//!
//! Per-world registry that assigns each component type a small, stable type
//! index on first use and owns that type's pool.
//!
//! Lookups go through a `TypeId` hash map; no reflection or string
//! comparison happens on the hot path.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use super::component_pool::{ComponentPool, ErasedPool};
use crate::ecs::{Component, ComponentDescriptor, ComponentReference, EntityId};
use crate::error::{EcsError, EcsResult, PoolKind};

/// One registered component type.
struct PoolEntry {
    type_id: TypeId,
    pool: Box<dyn ErasedPool>,
}

/// Registry of every component pool of one world.
pub struct ComponentPoolCollection {
    /// Pools indexed by type index.
    pools: Vec<PoolEntry>,
    /// Type index lookup.
    indices: HashMap<TypeId, usize>,
    /// Maximum number of distinct types.
    max_types: usize,
    /// Capacity given to each new pool.
    pool_capacity: usize,
}

impl ComponentPoolCollection {
    /// Creates an empty registry.
    ///
    /// # Arguments
    ///
    /// * `max_types` - Maximum number of distinct component types
    /// * `pool_capacity` - Slots per component pool
    #[must_use]
    pub fn new(max_types: usize, pool_capacity: usize) -> Self {
        Self {
            pools: Vec::with_capacity(max_types),
            indices: HashMap::with_capacity(max_types),
            max_types,
            pool_capacity,
        }
    }

    /// Number of registered types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether no type has been registered yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Maximum number of distinct types.
    #[inline]
    #[must_use]
    pub const fn max_types(&self) -> usize {
        self.max_types
    }

    /// Slots per component pool.
    #[inline]
    #[must_use]
    pub const fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }

    /// Returns the type index of `T`, registering it and creating its pool
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExhausted`] when `max_types` types are
    /// already registered.
    pub fn type_index_of<T: Component>(&mut self) -> EcsResult<usize> {
        self.type_index_for(&ComponentDescriptor::of::<T>())
    }

    /// Same as [`Self::type_index_of`] for a runtime descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExhausted`] when `max_types` types are
    /// already registered.
    pub fn type_index_for(&mut self, descriptor: &ComponentDescriptor) -> EcsResult<usize> {
        if let Some(&index) = self.indices.get(&descriptor.type_id) {
            return Ok(index);
        }
        if self.pools.len() >= self.max_types {
            tracing::warn!(
                component = descriptor.type_name,
                max_types = self.max_types,
                "component type registry exhausted"
            );
            return Err(EcsError::CapacityExhausted {
                resource: PoolKind::ComponentTypes,
                capacity: self.max_types,
            });
        }

        let index = self.pools.len();
        self.pools.push(PoolEntry {
            type_id: descriptor.type_id,
            pool: descriptor.make_pool(self.pool_capacity),
        });
        self.indices.insert(descriptor.type_id, index);
        tracing::debug!(
            component = descriptor.type_name,
            type_index = index,
            "registered component type"
        );
        Ok(index)
    }

    /// Returns the type index of `T` without registering it.
    #[inline]
    #[must_use]
    pub fn try_type_index<T: Component>(&self) -> Option<usize> {
        self.type_index_by_id(TypeId::of::<T>())
    }

    /// Returns the type index registered for a `TypeId`, if any.
    #[inline]
    #[must_use]
    pub fn type_index_by_id(&self, type_id: TypeId) -> Option<usize> {
        self.indices.get(&type_id).copied()
    }

    /// Returns the type index of a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] if `T` was never registered.
    pub fn registered_type_index<T: Component>(&self) -> EcsResult<usize> {
        self.try_type_index::<T>()
            .ok_or_else(|| EcsError::unknown_type(type_name::<T>()))
    }

    /// Reverse lookup of a type index to its type name.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] for unregistered indices.
    pub fn type_name_of_index(&self, type_index: usize) -> EcsResult<&'static str> {
        Ok(self.erased(type_index)?.type_name())
    }

    /// Reverse lookup of a type index to its `TypeId`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] for unregistered indices.
    pub fn type_id_of_index(&self, type_index: usize) -> EcsResult<TypeId> {
        let len = self.pools.len();
        self.pools
            .get(type_index)
            .map(|entry| entry.type_id)
            .ok_or(EcsError::IndexOutOfRange {
                index: type_index,
                len,
            })
    }

    /// Type names in type index order.
    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.pools.iter().map(|entry| entry.pool.type_name())
    }

    /// Allocates a component of type `T` for `entity`.
    ///
    /// Registers `T` first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExhausted`] if the type registry or the
    /// pool of `T` is full.
    pub fn allocate_component<T: Component>(
        &mut self,
        entity: EntityId,
    ) -> EcsResult<ComponentReference> {
        let type_index = self.type_index_of::<T>()?;
        let component_index = self.pool_at_mut::<T>(type_index)?.allocate(entity)?;
        Ok(ComponentReference {
            entity_id: entity,
            type_index,
            component_index,
        })
    }

    /// Gets a component by type index and component index.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] if `type_index` does not hold `T`
    /// and [`EcsError::IndexOutOfRange`] for a bad component index.
    #[inline]
    pub fn get_component<T: Component>(
        &self,
        type_index: usize,
        component_index: usize,
    ) -> EcsResult<&T> {
        self.pool_at::<T>(type_index)?.get(component_index)
    }

    /// Mutable variant of [`Self::get_component`].
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] if `type_index` does not hold `T`
    /// and [`EcsError::IndexOutOfRange`] for a bad component index.
    #[inline]
    pub fn get_component_mut<T: Component>(
        &mut self,
        type_index: usize,
        component_index: usize,
    ) -> EcsResult<&mut T> {
        self.pool_at_mut::<T>(type_index)?.get_mut(component_index)
    }

    /// Releases a component slot. The slot is never reused.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] for an unregistered type index
    /// or a bad component index.
    pub fn deallocate_component(&mut self, type_index: usize, component_index: usize) -> EcsResult<()> {
        self.erased_mut(type_index)?.deallocate(component_index)?;
        Ok(())
    }

    /// The pool of a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] if `T` was never registered.
    pub fn pool<T: Component>(&self) -> EcsResult<&ComponentPool<T>> {
        let type_index = self.registered_type_index::<T>()?;
        self.pool_at::<T>(type_index)
    }

    /// Mutable pool of a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] if `T` was never registered.
    pub fn pool_mut<T: Component>(&mut self) -> EcsResult<&mut ComponentPool<T>> {
        let type_index = self.registered_type_index::<T>()?;
        self.pool_at_mut::<T>(type_index)
    }

    /// Type-erased pool at a type index.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] for unregistered indices.
    pub fn erased(&self, type_index: usize) -> EcsResult<&dyn ErasedPool> {
        let len = self.pools.len();
        self.pools
            .get(type_index)
            .map(|entry| entry.pool.as_ref())
            .ok_or(EcsError::IndexOutOfRange {
                index: type_index,
                len,
            })
    }

    /// Mutable type-erased pool at a type index.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IndexOutOfRange`] for unregistered indices.
    pub fn erased_mut(&mut self, type_index: usize) -> EcsResult<&mut dyn ErasedPool> {
        let len = self.pools.len();
        match self.pools.get_mut(type_index) {
            Some(entry) => Ok(entry.pool.as_mut()),
            None => Err(EcsError::IndexOutOfRange {
                index: type_index,
                len,
            }),
        }
    }

    fn pool_at<T: Component>(&self, type_index: usize) -> EcsResult<&ComponentPool<T>> {
        self.pools
            .get(type_index)
            .and_then(|entry| entry.pool.as_any().downcast_ref::<ComponentPool<T>>())
            .ok_or_else(|| EcsError::unknown_type(type_name::<T>()))
    }

    fn pool_at_mut<T: Component>(&mut self, type_index: usize) -> EcsResult<&mut ComponentPool<T>> {
        self.pools
            .get_mut(type_index)
            .and_then(|entry| entry.pool.as_any_mut().downcast_mut::<ComponentPool<T>>())
            .ok_or_else(|| EcsError::unknown_type(type_name::<T>()))
    }
}
