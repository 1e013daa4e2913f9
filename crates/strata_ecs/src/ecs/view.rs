//! # Entity Views
//!
//! Short-lived handles that pair an entity id with a borrow of its world,
//! so entity-level calls read as methods on the entity.

use super::component::{Component, ComponentReference};
use super::entity::EntityId;
use super::world::World;
use crate::error::EcsResult;

/// Read-only view of an allocated entity.
#[derive(Clone, Copy)]
pub struct EntityRef<'w> {
    world: &'w World,
    id: EntityId,
}

impl<'w> EntityRef<'w> {
    pub(crate) fn new(world: &'w World, id: EntityId) -> Self {
        Self { world, id }
    }

    /// Id of the viewed entity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// See [`World::has`].
    ///
    /// # Errors
    ///
    /// Fails once the entity has been freed.
    pub fn has<T: Component>(&self) -> EcsResult<bool> {
        self.world.has::<T>(self.id)
    }

    /// See [`World::find`].
    ///
    /// # Errors
    ///
    /// Fails once the entity has been freed.
    pub fn find<T: Component>(&self) -> EcsResult<Option<&'w T>> {
        self.world.find::<T>(self.id)
    }

    /// See [`World::component_reference`].
    ///
    /// # Errors
    ///
    /// Fails if the entity holds no `T`.
    pub fn component_reference<T: Component>(&self) -> EcsResult<ComponentReference> {
        self.world.component_reference::<T>(self.id)
    }
}

impl std::fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EntityRef").field(&self.id).finish()
    }
}

/// Mutable view of an allocated entity.
pub struct EntityMut<'w> {
    world: &'w mut World,
    id: EntityId,
}

impl<'w> EntityMut<'w> {
    pub(crate) fn new(world: &'w mut World, id: EntityId) -> Self {
        Self { world, id }
    }

    /// Id of the viewed entity.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// See [`World::has`].
    ///
    /// # Errors
    ///
    /// Fails once the entity has been freed.
    pub fn has<T: Component>(&self) -> EcsResult<bool> {
        self.world.has::<T>(self.id)
    }

    /// See [`World::get`].
    ///
    /// # Errors
    ///
    /// Fails on a full pool or once the entity has been freed.
    pub fn get<T: Component>(&mut self) -> EcsResult<&mut T> {
        self.world.get::<T>(self.id)
    }

    /// See [`World::insert`]. Returns the view for chaining.
    ///
    /// # Errors
    ///
    /// Fails on a full pool or once the entity has been freed.
    pub fn insert<T: Component>(&mut self, value: T) -> EcsResult<&mut Self> {
        self.world.insert(self.id, value)?;
        Ok(self)
    }

    /// See [`World::remove`].
    ///
    /// # Errors
    ///
    /// Fails once the entity has been freed.
    pub fn remove<T: Component>(&mut self) -> EcsResult<bool> {
        self.world.remove::<T>(self.id)
    }

    /// See [`World::remove_all`].
    ///
    /// # Errors
    ///
    /// Fails once the entity has been freed.
    pub fn remove_all(&mut self) -> EcsResult<usize> {
        self.world.remove_all(self.id)
    }

    /// See [`World::delete_entity`].
    ///
    /// # Errors
    ///
    /// Fails once the entity has been freed.
    pub fn delete(&self) -> EcsResult<()> {
        self.world.delete_entity(self.id)
    }

    /// Downgrades to a read-only view.
    #[must_use]
    pub fn as_readonly(&self) -> EntityRef<'_> {
        EntityRef::new(&*self.world, self.id)
    }
}

impl std::fmt::Debug for EntityMut<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EntityMut").field(&self.id).finish()
    }
}
