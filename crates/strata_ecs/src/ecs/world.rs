//! # ECS World
//!
//! The central container for all entities, components and compiled filters.
//! Every pool is sized at creation and never grows.
//!
//! ## Frame Driver
//!
//! ```text
//! begin_frame  strip components of entities deleted last tick
//!              swap every filter's change buffers
//!              rotate the deletion buffer
//! tick         systems read filters, add/remove components, delete entities
//! end_frame    free the entity slots stripped by begin_frame
//! ```

use std::any::type_name;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use super::component::{Component, ComponentDescriptor, ComponentReference, ComponentSet};
use super::entity::EntityId;
use super::view::{EntityMut, EntityRef};
use crate::config::WorldConfiguration;
use crate::error::{EcsError, EcsResult};
use crate::events::{self, WorldEvent};
use crate::filter::{ComponentPredicate, Filter, FilterBuilder, FilterState, PredicateKind};
use crate::memory::{ComponentPoolCollection, EntityPool};
use crate::sync::DeferredDeletions;

static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(0);

/// The ECS World.
///
/// All memory is pre-allocated at creation. Component and entity slots are
/// handed out by bump pointers and never reused.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new(WorldConfiguration::new(1024, 16, 1024))?;
/// let moving = world.filter::<(Position, Velocity)>()?;
///
/// let entity = world.create_entity()?;
/// world.get::<Position>(entity)?.x = 1.0;
/// world.get::<Velocity>(entity)?;
///
/// world.begin_frame()?;
/// assert_eq!(moving.entity_added_list(), vec![entity]);
/// world.end_frame()?;
/// ```
pub struct World {
    id: u32,
    config: WorldConfiguration,
    entities: EntityPool,
    components: ComponentPoolCollection,
    /// Compiled filters in compile order.
    filters: Vec<Arc<FilterState>>,
    /// Canonical filter id to position in `filters`.
    filter_index: HashMap<String, usize>,
    deletions: DeferredDeletions,
    /// Entities stripped by the last `begin_frame`, freed by `end_frame`.
    pending_free: Vec<EntityId>,
    frame: u64,
    events: Option<Sender<WorldEvent>>,
    disposed: bool,
}

impl World {
    /// Creates a world sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if a capacity is zero.
    pub fn new(config: WorldConfiguration) -> EcsResult<Self> {
        Self::build(config, None)
    }

    /// Creates a world that reports lifecycle events on `events`.
    ///
    /// [`WorldEvent::Created`] is sent before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if a capacity is zero.
    pub fn with_events(config: WorldConfiguration, events: Sender<WorldEvent>) -> EcsResult<Self> {
        Self::build(config, Some(events))
    }

    fn build(config: WorldConfiguration, events: Option<Sender<WorldEvent>>) -> EcsResult<Self> {
        config.validate()?;

        let id = NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed);
        let world = Self {
            id,
            config,
            entities: EntityPool::new(config.entity_pool_initial_size, config.component_pool_count),
            components: ComponentPoolCollection::new(
                config.component_pool_count,
                config.component_pool_initial_size,
            ),
            filters: Vec::new(),
            filter_index: HashMap::new(),
            deletions: DeferredDeletions::new(),
            pending_free: Vec::new(),
            frame: 0,
            events,
            disposed: false,
        };

        tracing::info!(
            world_id = id,
            entities = config.entity_pool_initial_size,
            component_types = config.component_pool_count,
            components = config.component_pool_initial_size,
            "world created"
        );
        events::emit(
            world.events.as_ref(),
            WorldEvent::Created {
                world_id: id,
                config,
            },
        );
        Ok(world)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Process-unique id of this world.
    #[inline]
    #[must_use]
    pub const fn world_id(&self) -> u32 {
        self.id
    }

    /// The configuration this world was sized with.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &WorldConfiguration {
        &self.config
    }

    /// Whether [`World::dispose`] has run.
    #[inline]
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of completed `begin_frame` calls.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn frame(&self) -> EcsResult<u64> {
        self.ensure_live()?;
        Ok(self.frame)
    }

    /// Number of allocated entities.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn entity_count(&self) -> EcsResult<usize> {
        self.ensure_live()?;
        Ok(self.entities.allocated_count())
    }

    /// Whether the entity slot is allocated.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn is_entity_allocated(&self, id: EntityId) -> EcsResult<bool> {
        self.ensure_live()?;
        Ok(self.entities.is_allocated(id))
    }

    /// The entity pool.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn entity_pool(&self) -> EcsResult<&EntityPool> {
        self.ensure_live()?;
        Ok(&self.entities)
    }

    /// The component type registry and its pools.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn components(&self) -> EcsResult<&ComponentPoolCollection> {
        self.ensure_live()?;
        Ok(&self.components)
    }

    /// Mutable access to the pools, for writing component data back during
    /// restore. Changes made here bypass filter notification.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn components_mut(&mut self) -> EcsResult<&mut ComponentPoolCollection> {
        self.ensure_live()?;
        Ok(&mut self.components)
    }

    /// Registers `T` and returns its type index.
    ///
    /// Types are otherwise registered on first use; registering them up
    /// front pins their indices, which [`World::restore_layout`] relies on.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExhausted`] if the type registry is full.
    pub fn register_component<T: Component>(&mut self) -> EcsResult<usize> {
        self.ensure_live()?;
        self.components.type_index_of::<T>()
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Allocates a new entity with no components.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExhausted`] once the entity pool is used
    /// up. Existing entities are untouched.
    pub fn create_entity(&mut self) -> EcsResult<EntityId> {
        self.ensure_live()?;
        self.entities.allocate()
    }

    /// Read-only view of an allocated entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] for free slots.
    pub fn entity(&self, id: EntityId) -> EcsResult<EntityRef<'_>> {
        self.ensure_live()?;
        self.entities.get_allocated(id)?;
        Ok(EntityRef::new(self, id))
    }

    /// Mutable view of an allocated entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] for free slots.
    pub fn entity_mut(&mut self, id: EntityId) -> EcsResult<EntityMut<'_>> {
        self.ensure_live()?;
        self.entities.get_allocated(id)?;
        Ok(EntityMut::new(self, id))
    }

    /// Marks an entity for deletion.
    ///
    /// Takes `&self` so systems running in parallel can delete entities. The
    /// next `begin_frame` strips its components and the `end_frame` after it
    /// frees the slot. Marking twice in one tick is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] for free slots.
    pub fn delete_entity(&self, id: EntityId) -> EcsResult<()> {
        self.ensure_live()?;
        self.entities.get_allocated(id)?;
        self.deletions.mark(id);
        Ok(())
    }

    /// Entities marked for deletion during the current tick.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn marked_for_deletion(&self) -> EcsResult<Vec<EntityId>> {
        self.ensure_live()?;
        Ok(self.deletions.marked())
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Returns the entity's `T` component, allocating a default one first if
    /// the entity has none.
    ///
    /// Allocation is the only way an entity enters a filter: every compiled
    /// filter is re-evaluated and newly matching ones queue an addition.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] for free slots and
    /// [`EcsError::CapacityExhausted`] if the type registry or the pool of `T`
    /// is full.
    pub fn get<T: Component>(&mut self, id: EntityId) -> EcsResult<&mut T> {
        self.ensure_live()?;
        self.entities.get_allocated(id)?;

        let type_index = self.components.type_index_of::<T>()?;
        let existing = self.entities.get_allocated(id)?.component_index(type_index);
        let component_index = match existing {
            Some(component_index) => component_index,
            None => {
                let reference = self.components.allocate_component::<T>(id)?;
                self.entities
                    .get_allocated_mut(id)?
                    .set_slot(type_index, Some(reference.component_index));
                self.refresh_filters(id)?;
                reference.component_index
            }
        };
        self.components.get_component_mut(type_index, component_index)
    }

    /// Sets the entity's `T` component, allocating it if needed.
    ///
    /// # Errors
    ///
    /// Same as [`World::get`].
    pub fn insert<T: Component>(&mut self, id: EntityId, value: T) -> EcsResult<()> {
        *self.get::<T>(id)? = value;
        Ok(())
    }

    /// Returns the entity's `T` component without allocating.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] for free slots.
    pub fn find<T: Component>(&self, id: EntityId) -> EcsResult<Option<&T>> {
        self.ensure_live()?;
        let entity = self.entities.get_allocated(id)?;
        let Some(type_index) = self.components.try_type_index::<T>() else {
            return Ok(None);
        };
        match entity.component_index(type_index) {
            Some(component_index) => self
                .components
                .get_component(type_index, component_index)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Whether the entity holds a `T`. A type never registered is not held.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] for free slots.
    pub fn has<T: Component>(&self, id: EntityId) -> EcsResult<bool> {
        self.ensure_live()?;
        let entity = self.entities.get_allocated(id)?;
        Ok(self
            .components
            .try_type_index::<T>()
            .is_some_and(|type_index| entity.has(type_index)))
    }

    /// Removes the entity's `T` component.
    ///
    /// Returns `false` if the entity held none.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] for free slots.
    pub fn remove<T: Component>(&mut self, id: EntityId) -> EcsResult<bool> {
        self.ensure_live()?;
        self.entities.get_allocated(id)?;
        match self.components.try_type_index::<T>() {
            Some(type_index) => self.remove_by_index(id, type_index),
            None => Ok(false),
        }
    }

    /// Removes the component at `type_index` from the entity.
    ///
    /// Returns `false` if the entity held none.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] for free slots.
    pub fn remove_by_index(&mut self, id: EntityId, type_index: usize) -> EcsResult<bool> {
        self.ensure_live()?;
        let Some(component_index) = self.entities.get_allocated(id)?.component_index(type_index)
        else {
            return Ok(false);
        };

        self.components
            .deallocate_component(type_index, component_index)?;
        self.entities
            .get_allocated_mut(id)?
            .set_slot(type_index, None);
        self.refresh_filters(id)?;
        Ok(true)
    }

    /// Removes every component of the entity. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotAllocated`] for free slots.
    pub fn remove_all(&mut self, id: EntityId) -> EcsResult<usize> {
        self.ensure_live()?;
        let populated = self
            .entities
            .get_allocated(id)?
            .populated_slots()
            .map(|(type_index, _)| type_index)
            .collect::<Vec<_>>();

        let mut removed = 0;
        for type_index in populated {
            if self.remove_by_index(id, type_index)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Locator of the entity's `T` component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::FilterReferenceNotFound`] if the entity holds no
    /// `T` and [`EcsError::EntityNotAllocated`] for free slots.
    pub fn component_reference<T: Component>(&self, id: EntityId) -> EcsResult<ComponentReference> {
        self.ensure_live()?;
        let entity = self.entities.get_allocated(id)?;
        self.components
            .try_type_index::<T>()
            .and_then(|type_index| {
                entity
                    .component_index(type_index)
                    .map(|component_index| ComponentReference {
                        entity_id: id,
                        type_index,
                        component_index,
                    })
            })
            .ok_or_else(|| EcsError::FilterReferenceNotFound {
                entity: id,
                type_name: type_name::<T>().to_owned(),
            })
    }

    /// Resolves a component reference.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::FilterReferenceNotFound`] if the referenced slot no
    /// longer belongs to the reference's entity, and [`EcsError::UnknownType`]
    /// if `T` is not the type at the reference's type index.
    pub fn component<T: Component>(&self, reference: ComponentReference) -> EcsResult<&T> {
        self.ensure_live()?;
        self.check_owner::<T>(reference)?;
        self.components
            .get_component(reference.type_index, reference.component_index)
    }

    /// Mutable variant of [`World::component`].
    ///
    /// # Errors
    ///
    /// Same as [`World::component`].
    pub fn component_mut<T: Component>(
        &mut self,
        reference: ComponentReference,
    ) -> EcsResult<&mut T> {
        self.ensure_live()?;
        self.check_owner::<T>(reference)?;
        self.components
            .get_component_mut(reference.type_index, reference.component_index)
    }

    fn check_owner<T: Component>(&self, reference: ComponentReference) -> EcsResult<()> {
        let owner = self
            .components
            .erased(reference.type_index)?
            .owners()
            .get(reference.component_index)
            .copied()
            .flatten();
        if owner == Some(reference.entity_id) {
            Ok(())
        } else {
            Err(EcsError::FilterReferenceNotFound {
                entity: reference.entity_id,
                type_name: type_name::<T>().to_owned(),
            })
        }
    }

    // =========================================================================
    // Filters
    // =========================================================================

    /// Compiles the filter whose only predicates are the types of `Q`.
    ///
    /// # Errors
    ///
    /// Same as [`FilterBuilder::build`].
    pub fn filter<Q: ComponentSet>(&mut self) -> EcsResult<Filter<Q>> {
        FilterBuilder::<Q>::new().build(self)
    }

    /// Returns the filter registered under `id`, compiling it from
    /// `predicates` if there is none.
    ///
    /// A new filter is back-filled: every allocated entity it matches is
    /// queued as an addition, visible after the next `begin_frame`.
    ///
    /// Filter ids are built from type names, which are not guaranteed to be
    /// unique. A filter is only reused if its predicates resolve to the same
    /// `TypeId`s.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CapacityExhausted`] if registering a predicate type
    /// overflows the type registry, and [`EcsError::FilterIdConflict`] if `id`
    /// is already compiled for different types.
    pub fn compile_filter(
        &mut self,
        id: &str,
        predicates: &[(ComponentDescriptor, PredicateKind)],
    ) -> EcsResult<Arc<FilterState>> {
        self.ensure_live()?;
        if let Some(&position) = self.filter_index.get(id) {
            let existing = &self.filters[position];
            if !self.same_predicates(existing, predicates) {
                tracing::warn!(world_id = self.id, filter = id, "filter id conflict");
                return Err(EcsError::FilterIdConflict { id: id.to_owned() });
            }
            return Ok(Arc::clone(existing));
        }

        let mut resolved = Vec::with_capacity(predicates.len());
        for (descriptor, kind) in predicates {
            resolved.push(ComponentPredicate {
                type_index: self.components.type_index_for(descriptor)?,
                kind: *kind,
            });
        }

        let state = self.register_filter(id, resolved);
        let mut backfilled = 0usize;
        for entity in self.entities.iter_allocated() {
            if state.matches(entity) {
                state.queue_addition(entity.id(), state.references_for(entity));
                backfilled += 1;
            }
        }
        tracing::debug!(
            world_id = self.id,
            filter = id,
            backfilled,
            "compiled filter"
        );
        Ok(state)
    }

    /// Number of compiled filters.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn filter_count(&self) -> EcsResult<usize> {
        self.ensure_live()?;
        Ok(self.filters.len())
    }

    /// Canonical ids of the compiled filters, in compile order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn filter_ids(&self) -> EcsResult<Vec<String>> {
        self.ensure_live()?;
        Ok(self.filters.iter().map(|f| f.id().to_owned()).collect())
    }

    pub(crate) fn register_filter(
        &mut self,
        id: &str,
        predicates: Vec<ComponentPredicate>,
    ) -> Arc<FilterState> {
        if let Some(&position) = self.filter_index.get(id) {
            return Arc::clone(&self.filters[position]);
        }
        let state = Arc::new(FilterState::new(id.to_owned(), predicates));
        self.filter_index.insert(id.to_owned(), self.filters.len());
        self.filters.push(Arc::clone(&state));
        state
    }

    /// Whether `predicates` resolve to exactly the compiled predicates of
    /// `filter`, without registering anything.
    fn same_predicates(
        &self,
        filter: &FilterState,
        predicates: &[(ComponentDescriptor, PredicateKind)],
    ) -> bool {
        let resolved = predicates
            .iter()
            .map(|(descriptor, kind)| {
                self.components
                    .type_index_by_id(descriptor.type_id)
                    .map(|type_index| ComponentPredicate {
                        type_index,
                        kind: *kind,
                    })
            })
            .collect::<Option<Vec<_>>>();
        resolved.is_some_and(|mut resolved| {
            resolved.sort_unstable();
            resolved.dedup();
            resolved == filter.predicates()
        })
    }

    pub(crate) fn filters(&self) -> &[Arc<FilterState>] {
        &self.filters
    }

    /// Re-evaluates every filter for one entity after a component change.
    fn refresh_filters(&self, id: EntityId) -> EcsResult<()> {
        let entity = self.entities.get_allocated(id)?;
        for filter in &self.filters {
            let matches = filter.matches(entity);
            let tracked = filter.is_tracking(id);
            if matches && !tracked {
                filter.queue_addition(id, filter.references_for(entity));
            } else if !matches && tracked {
                filter.queue_removal(id);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Frame Driver
    // =========================================================================

    /// Opens a tick.
    ///
    /// Strips the components of entities deleted during the previous tick,
    /// publishes every filter's pending changes and rotates the deletion
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn begin_frame(&mut self) -> EcsResult<()> {
        self.ensure_live()?;

        let marked = self.deletions.marked();
        for &id in &marked {
            if self.entities.is_allocated(id) {
                self.remove_all(id)?;
            }
        }

        for filter in &self.filters {
            filter.swap_dirty_buffers();
        }

        let stripped = self.deletions.rotate();
        self.pending_free.extend(
            stripped
                .into_iter()
                .filter(|&id| self.entities.is_allocated(id)),
        );
        self.frame += 1;

        tracing::trace!(
            world_id = self.id,
            frame = self.frame,
            stripped = marked.len(),
            "begin frame"
        );
        Ok(())
    }

    /// Closes a tick, freeing the slots of entities stripped by the last
    /// `begin_frame`.
    ///
    /// Components added to such an entity since the strip are removed first.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn end_frame(&mut self) -> EcsResult<()> {
        self.ensure_live()?;

        let pending = std::mem::take(&mut self.pending_free);
        let mut freed = 0usize;
        for id in pending {
            if !self.entities.is_allocated(id) {
                continue;
            }
            self.remove_all(id)?;
            self.entities.deallocate(id)?;
            freed += 1;
        }

        tracing::trace!(world_id = self.id, frame = self.frame, freed, "end frame");
        Ok(())
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    /// Releases every pool and filter. Later calls are no-ops.
    ///
    /// Every other operation fails with [`EcsError::UseAfterDispose`]
    /// afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.filters.clear();
        self.filter_index.clear();
        self.pending_free.clear();
        self.deletions = DeferredDeletions::new();
        self.entities = EntityPool::new(0, 0);
        self.components = ComponentPoolCollection::new(0, 0);

        tracing::info!(world_id = self.id, frame = self.frame, "world disposed");
        events::emit(
            self.events.as_ref(),
            WorldEvent::Disposed { world_id: self.id },
        );
    }

    #[inline]
    pub(crate) fn ensure_live(&self) -> EcsResult<()> {
        if self.disposed {
            Err(EcsError::UseAfterDispose)
        } else {
            Ok(())
        }
    }

    pub(crate) fn set_frame(&mut self, frame: u64) {
        self.frame = frame;
    }

    pub(crate) fn restore_deletions(&mut self, marked: &[EntityId], pending_free: &[EntityId]) {
        self.deletions.restore(marked.iter().copied());
        self.pending_free = pending_free.to_vec();
    }

    pub(crate) fn pending_free(&self) -> &[EntityId] {
        &self.pending_free
    }

    pub(crate) fn entities_mut(&mut self) -> &mut EntityPool {
        &mut self.entities
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("entities", &self.entities.allocated_count())
            .field("component_types", &self.components.len())
            .field("filters", &self.filters.len())
            .field("frame", &self.frame)
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Position {
        x: f32,
    }
    impl Component for Position {}

    #[derive(Default)]
    struct Velocity;
    impl Component for Velocity {}

    fn small_world() -> World {
        World::new(WorldConfiguration::new(8, 8, 8)).unwrap()
    }

    #[test]
    fn test_world_creation() {
        let world = small_world();
        assert_eq!(world.entity_count().unwrap(), 0);
        assert_eq!(world.frame().unwrap(), 0);
        assert_eq!(world.filter_count().unwrap(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = World::new(WorldConfiguration::new(0, 8, 8));
        assert!(matches!(result, Err(EcsError::InvalidConfig(_))));
    }

    #[test]
    fn test_get_allocates_once() {
        let mut world = small_world();
        let entity = world.create_entity().unwrap();

        world.get::<Position>(entity).unwrap().x = 3.0;
        assert_eq!(world.get::<Position>(entity).unwrap().x, 3.0);
        assert_eq!(world.components().unwrap().pool::<Position>().unwrap().live_count(), 1);
    }

    #[test]
    fn test_has_and_remove() {
        let mut world = small_world();
        let entity = world.create_entity().unwrap();

        assert!(!world.has::<Position>(entity).unwrap());
        world.get::<Position>(entity).unwrap();
        assert!(world.has::<Position>(entity).unwrap());

        assert!(world.remove::<Position>(entity).unwrap());
        assert!(!world.has::<Position>(entity).unwrap());
        assert!(!world.remove::<Position>(entity).unwrap());
        assert!(!world.remove::<Velocity>(entity).unwrap());
    }

    #[test]
    fn test_find_does_not_allocate() {
        let mut world = small_world();
        let entity = world.create_entity().unwrap();
        assert_eq!(world.find::<Position>(entity).unwrap(), None);
        world.insert(entity, Position { x: 2.0 }).unwrap();
        assert_eq!(world.find::<Position>(entity).unwrap(), Some(&Position { x: 2.0 }));
    }

    #[test]
    fn test_component_reference() {
        let mut world = small_world();
        let entity = world.create_entity().unwrap();
        assert!(matches!(
            world.component_reference::<Position>(entity),
            Err(EcsError::FilterReferenceNotFound { .. })
        ));

        world.insert(entity, Position { x: 5.0 }).unwrap();
        let reference = world.component_reference::<Position>(entity).unwrap();
        assert_eq!(reference.entity_id, entity);
        assert_eq!(world.component::<Position>(reference).unwrap().x, 5.0);

        world.remove::<Position>(entity).unwrap();
        assert!(matches!(
            world.component::<Position>(reference),
            Err(EcsError::FilterReferenceNotFound { .. })
        ));
    }

    #[test]
    fn test_operations_on_free_slot() {
        let mut world = small_world();
        let missing = EntityId::new(3);
        assert_eq!(
            world.get::<Position>(missing).err(),
            Some(EcsError::EntityNotAllocated(missing))
        );
        assert_eq!(
            world.delete_entity(missing),
            Err(EcsError::EntityNotAllocated(missing))
        );
    }

    #[test]
    fn test_remove_all() {
        let mut world = small_world();
        let entity = world.create_entity().unwrap();
        world.get::<Position>(entity).unwrap();
        world.get::<Velocity>(entity).unwrap();

        assert_eq!(world.remove_all(entity).unwrap(), 2);
        assert!(!world.has::<Position>(entity).unwrap());
        assert!(!world.has::<Velocity>(entity).unwrap());
    }

    #[test]
    fn test_frame_counter() {
        let mut world = small_world();
        world.begin_frame().unwrap();
        world.end_frame().unwrap();
        world.begin_frame().unwrap();
        assert_eq!(world.frame().unwrap(), 2);
    }

    #[test]
    fn test_readd_after_strip_is_freed() {
        let mut world = small_world();
        let entity = world.create_entity().unwrap();
        world.get::<Position>(entity).unwrap();
        world.delete_entity(entity).unwrap();

        world.begin_frame().unwrap();
        assert!(!world.has::<Position>(entity).unwrap());
        world.get::<Velocity>(entity).unwrap();
        world.end_frame().unwrap();

        assert!(!world.is_entity_allocated(entity).unwrap());
        let velocities = world.components().unwrap().pool::<Velocity>().unwrap();
        assert_eq!(velocities.live_count(), 0);
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let mut world = small_world();
        let entity = world.create_entity().unwrap();
        world.dispose();
        world.dispose();

        assert!(world.is_disposed());
        assert_eq!(world.create_entity(), Err(EcsError::UseAfterDispose));
        assert_eq!(world.has::<Position>(entity), Err(EcsError::UseAfterDispose));
        assert_eq!(world.begin_frame(), Err(EcsError::UseAfterDispose));
    }

    #[test]
    fn test_filter_id_reuse_checks_types() {
        let mut world = small_world();
        let with_position = [(ComponentDescriptor::of::<Position>(), PredicateKind::With)];
        let with_velocity = [(ComponentDescriptor::of::<Velocity>(), PredicateKind::With)];

        let first = world.compile_filter("with:shared", &with_position).unwrap();
        let again = world.compile_filter("with:shared", &with_position).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        // Same id, different TypeId behind it
        assert_eq!(
            world.compile_filter("with:shared", &with_velocity).unwrap_err(),
            EcsError::FilterIdConflict {
                id: "with:shared".into()
            }
        );
        assert_eq!(world.filter_count().unwrap(), 1);
        assert!(world.components().unwrap().try_type_index::<Velocity>().is_none());
    }
}
