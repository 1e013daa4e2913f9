//! # Typed Filter Handles
//!
//! [`Filter<Q>`] is a cheap, cloneable handle to a world's shared
//! [`FilterState`]. It derefs to the state for membership queries and adds
//! typed component access on top.

use std::any::type_name;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::Arc;

use super::state::FilterState;
use crate::ecs::{Component, ComponentReference, ComponentSet, EntityId, World};
use crate::error::{EcsError, EcsResult};

/// Handle to a compiled filter whose required types are `Q`.
pub struct Filter<Q: ComponentSet> {
    state: Arc<FilterState>,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q: ComponentSet> Filter<Q> {
    pub(crate) fn from_state(state: Arc<FilterState>) -> Self {
        Self {
            state,
            _marker: PhantomData,
        }
    }

    /// The shared state behind this handle.
    #[inline]
    #[must_use]
    pub fn state(&self) -> &Arc<FilterState> {
        &self.state
    }

    /// Whether two handles refer to the same compiled filter.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Stored reference to the `T` component of a member.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::FilterReferenceNotFound`] if the entity is not a
    /// member or `T` is not one of the filter's required types.
    pub fn reference<T: Component>(
        &self,
        world: &World,
        entity: EntityId,
    ) -> EcsResult<ComponentReference> {
        let not_found = || EcsError::FilterReferenceNotFound {
            entity,
            type_name: type_name::<T>().to_owned(),
        };
        let type_index = world
            .components()?
            .try_type_index::<T>()
            .ok_or_else(not_found)?;
        self.state
            .reference(entity, type_index)
            .ok_or_else(not_found)
    }

    /// The `T` component of a member, read through its stored reference.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::FilterReferenceNotFound`] if the filter holds no
    /// live reference for the entity and `T`.
    pub fn get<'w, T: Component>(&self, world: &'w World, entity: EntityId) -> EcsResult<&'w T> {
        let reference = self.reference::<T>(world, entity)?;
        world.component::<T>(reference)
    }

    /// Mutable variant of [`Filter::get`].
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::FilterReferenceNotFound`] if the filter holds no
    /// live reference for the entity and `T`.
    pub fn get_mut<'w, T: Component>(
        &self,
        world: &'w mut World,
        entity: EntityId,
    ) -> EcsResult<&'w mut T> {
        let reference = self.reference::<T>(world, entity)?;
        world.component_mut::<T>(reference)
    }
}

impl<Q: ComponentSet> Clone for Filter<Q> {
    fn clone(&self) -> Self {
        Self::from_state(Arc::clone(&self.state))
    }
}

impl<Q: ComponentSet> Deref for Filter<Q> {
    type Target = FilterState;

    fn deref(&self) -> &FilterState {
        &self.state
    }
}

impl<Q: ComponentSet> std::fmt::Debug for Filter<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Filter").field(&self.state).finish()
    }
}
