//! # World Layout Snapshots
//!
//! Structural state of a world, for an external serializer. Component data
//! is not part of the layout; the serializer writes it through the typed
//! pools (`ComponentPool::data_bytes` for `Pod` components, or
//! `ComponentPool::restore_slot`).
//!
//! ```text
//! layout()                            restore_layout(&layout)
//!   config, frame, cursors              types must already be registered
//!   entity slot tables                  in the same order; the whole layout
//!   pool owner tables                   is checked before anything changes,
//!   filter predicates, members          then filters get their members and
//!     and both change buffers           change buffers back verbatim
//!   pending deletions
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::WorldConfiguration;
use crate::ecs::{ComponentReference, EntityId, World};
use crate::error::{EcsError, EcsResult};
use crate::filter::ComponentPredicate;
use crate::sync::ChangeSet;

/// One allocated entity and its component table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLayout {
    /// Entity id.
    pub id: EntityId,
    /// `(type_index, component_index)` for every held component.
    pub slots: Vec<(usize, usize)>,
}

/// Cursor and owner table of one component pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPoolLayout {
    /// Full type name of the component.
    pub type_name: String,
    /// Bump pointer.
    pub next_free_index: usize,
    /// `(component_index, owner)` for every live slot.
    pub owners: Vec<(usize, EntityId)>,
}

/// A filter entry with its stored component references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMemberLayout {
    /// Entity id.
    pub id: EntityId,
    /// References in tracked type order.
    pub references: Vec<ComponentReference>,
}

/// One side of a filter's change buffers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSetLayout {
    /// Entities that stopped matching.
    pub removed: Vec<EntityId>,
    /// Entities that started matching.
    pub added: Vec<FilterMemberLayout>,
}

impl ChangeSetLayout {
    fn capture(set: &ChangeSet) -> Self {
        Self {
            removed: set.removed.iter().copied().collect(),
            added: members_layout(&set.added),
        }
    }

    fn to_change_set(&self) -> ChangeSet {
        ChangeSet {
            added: self
                .added
                .iter()
                .map(|member| (member.id, member.references.clone()))
                .collect(),
            removed: self.removed.iter().copied().collect(),
        }
    }

    fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.removed
            .iter()
            .copied()
            .chain(self.added.iter().map(|member| member.id))
    }
}

/// A compiled filter with its membership and change buffers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterLayout {
    /// Canonical filter id.
    pub id: String,
    /// Compiled predicates.
    pub predicates: Vec<ComponentPredicate>,
    /// Members as of the last swap, in id order.
    pub members: Vec<FilterMemberLayout>,
    /// Changes published by the last swap, readable during this tick.
    pub published: ChangeSetLayout,
    /// Changes queued during this tick.
    pub pending: ChangeSetLayout,
}

/// Structural snapshot of a [`World`].
///
/// Plain values come first so the layout serializes to TOML as well as to
/// self-describing binary formats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldLayout {
    /// Completed `begin_frame` calls.
    pub frame: u64,
    /// Entity pool bump pointer.
    pub next_entity_index: usize,
    /// Entities marked for deletion during the current tick.
    pub pending_deletions: Vec<EntityId>,
    /// Entities stripped and waiting for `end_frame`.
    pub pending_free: Vec<EntityId>,
    /// Sizing of the world.
    pub config: WorldConfiguration,
    /// Allocated entities in id order.
    pub entities: Vec<EntityLayout>,
    /// Component pools in type index order.
    pub pools: Vec<ComponentPoolLayout>,
    /// Filters in compile order.
    pub filters: Vec<FilterLayout>,
}

fn members_layout(map: &BTreeMap<EntityId, Vec<ComponentReference>>) -> Vec<FilterMemberLayout> {
    map.iter()
        .map(|(id, references)| FilterMemberLayout {
            id: *id,
            references: references.clone(),
        })
        .collect()
}

fn invalid(message: String) -> EcsError {
    EcsError::InvalidLayout(message)
}

impl World {
    /// Captures the structural state of this world.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`] after dispose.
    pub fn layout(&self) -> EcsResult<WorldLayout> {
        let entity_pool = self.entity_pool()?;
        let components = self.components()?;

        let entities = entity_pool
            .iter_allocated()
            .map(|entity| EntityLayout {
                id: entity.id(),
                slots: entity.populated_slots().collect(),
            })
            .collect();

        let mut pools = Vec::with_capacity(components.len());
        for type_index in 0..components.len() {
            let pool = components.erased(type_index)?;
            pools.push(ComponentPoolLayout {
                type_name: pool.type_name().to_owned(),
                next_free_index: pool.next_free_index(),
                owners: pool
                    .owners()
                    .iter()
                    .enumerate()
                    .filter_map(|(index, owner)| owner.map(|entity| (index, entity)))
                    .collect(),
            });
        }

        let filters = self
            .filters()
            .iter()
            .map(|filter| {
                let (members, published, pending) = filter.capture();
                FilterLayout {
                    id: filter.id().to_owned(),
                    predicates: filter.predicates().to_vec(),
                    members: members_layout(&members),
                    published: ChangeSetLayout::capture(&published),
                    pending: ChangeSetLayout::capture(&pending),
                }
            })
            .collect();

        Ok(WorldLayout {
            frame: self.frame()?,
            next_entity_index: entity_pool.next_free_index(),
            pending_deletions: self.marked_for_deletion()?,
            pending_free: self.pending_free().to_vec(),
            config: *self.config(),
            entities,
            pools,
            filters,
        })
    }

    /// Rebuilds structural state from a layout.
    ///
    /// Every component type in the layout must already be registered with
    /// this world at the same type index (see
    /// [`World::register_component`]). The whole layout is checked before
    /// the world is touched, so a rejected layout leaves it unchanged.
    ///
    /// Pools of types registered after the layout's last type come back
    /// empty. Filters named in the layout are compiled if missing and get their
    /// members and both change buffers back as captured, so a snapshot
    /// taken mid-tick resumes with the same pending changes. Filters of this
    /// world that the layout does not name have their membership recomputed
    /// with no pending changes.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidLayout`] on a configuration mismatch, an
    /// out-of-range cursor or index, or tables that disagree with each other,
    /// and [`EcsError::UnknownType`] if a pool's type is not registered at
    /// its index.
    pub fn restore_layout(&mut self, layout: &WorldLayout) -> EcsResult<()> {
        self.ensure_live()?;
        self.check_layout(layout)?;

        let components = self.components_mut()?;
        for type_index in 0..components.len() {
            let pool = components.erased_mut(type_index)?;
            match layout.pools.get(type_index) {
                Some(saved) => pool.restore_owners(saved.next_free_index, &saved.owners)?,
                None => pool.restore_owners(0, &[])?,
            }
        }
        self.entities_mut().restore(
            layout.next_entity_index,
            layout
                .entities
                .iter()
                .map(|entity| (entity.id, entity.slots.as_slice())),
        )?;

        let mut restored = BTreeSet::new();
        for filter in &layout.filters {
            let state = self.register_filter(&filter.id, filter.predicates.clone());
            state.restore_state(
                filter
                    .members
                    .iter()
                    .map(|member| (member.id, member.references.clone())),
                filter.published.to_change_set(),
                filter.pending.to_change_set(),
            );
            restored.insert(filter.id.as_str());
        }
        let entity_pool = self.entity_pool()?;
        for filter in self.filters() {
            if restored.contains(filter.id()) {
                continue;
            }
            let members = entity_pool
                .iter_allocated()
                .filter(|entity| filter.matches(entity))
                .map(|entity| (entity.id(), filter.references_for(entity)))
                .collect::<Vec<(EntityId, Vec<ComponentReference>)>>();
            filter.restore_state(members, ChangeSet::default(), ChangeSet::default());
        }

        self.restore_deletions(&layout.pending_deletions, &layout.pending_free);
        self.set_frame(layout.frame);

        tracing::debug!(
            world_id = self.world_id(),
            frame = layout.frame,
            entities = layout.entities.len(),
            filters = layout.filters.len(),
            "restored world layout"
        );
        Ok(())
    }

    /// Checks that `layout` fits this world and is consistent with itself.
    fn check_layout(&self, layout: &WorldLayout) -> EcsResult<()> {
        let config = *self.config();
        if layout.config != config {
            return Err(invalid(format!(
                "configuration mismatch: layout {:?}, world {config:?}",
                layout.config
            )));
        }
        if layout.next_entity_index > config.entity_pool_initial_size {
            return Err(invalid(format!(
                "entity cursor {} beyond capacity {}",
                layout.next_entity_index, config.entity_pool_initial_size
            )));
        }

        let owned = self.check_pools(layout)?;
        let held = check_entities(layout)?;
        if held != owned {
            return Err(invalid(
                "entity slot tables disagree with pool owner tables".to_owned(),
            ));
        }
        for &id in layout.pending_deletions.iter().chain(&layout.pending_free) {
            below_cursor(layout, id, "pending deletion")?;
        }
        self.check_filters(layout)
    }

    /// Pools must be registered at the same index, with cursors in range and
    /// each slot owned at most once below its cursor. Returns the
    /// `(type_index, component_index, owner)` triples.
    fn check_pools(&self, layout: &WorldLayout) -> EcsResult<BTreeSet<SlotOwner>> {
        let components = self.components()?;
        let capacity = layout.config.component_pool_initial_size;
        let mut owned = BTreeSet::new();
        for (type_index, pool) in layout.pools.iter().enumerate() {
            match components.type_name_of_index(type_index) {
                Ok(name) if name == pool.type_name => {}
                Ok(name) => {
                    return Err(invalid(format!(
                        "type index {type_index} holds {name}, layout expects {}",
                        pool.type_name
                    )))
                }
                Err(_) => return Err(EcsError::unknown_type(&pool.type_name)),
            }
            if pool.next_free_index > capacity {
                return Err(invalid(format!(
                    "{} cursor {} beyond capacity {capacity}",
                    pool.type_name, pool.next_free_index
                )));
            }

            let mut slots = BTreeSet::new();
            for &(component_index, owner) in &pool.owners {
                if component_index >= pool.next_free_index {
                    return Err(invalid(format!(
                        "{} slot {component_index} owned beyond cursor {}",
                        pool.type_name, pool.next_free_index
                    )));
                }
                if !slots.insert(component_index) {
                    return Err(invalid(format!(
                        "{} slot {component_index} owned twice",
                        pool.type_name
                    )));
                }
                owned.insert((type_index, component_index, owner));
            }
        }
        Ok(owned)
    }

    /// Filter predicates must test registered types, an existing filter of
    /// the same id must have the same predicates, and every stored entry
    /// must point below the cursors.
    fn check_filters(&self, layout: &WorldLayout) -> EcsResult<()> {
        let registered = self.components()?.len();
        let known_types = layout.pools.len();
        let capacity = layout.config.component_pool_initial_size;
        for filter in &layout.filters {
            if let Some(predicate) = filter
                .predicates
                .iter()
                .find(|predicate| predicate.type_index >= registered)
            {
                return Err(invalid(format!(
                    "filter {} tests unregistered type index {}",
                    filter.id, predicate.type_index
                )));
            }
            if let Some(existing) = self.filters().iter().find(|state| state.id() == filter.id) {
                let mut predicates = filter.predicates.clone();
                predicates.sort_unstable();
                predicates.dedup();
                if predicates != existing.predicates() {
                    return Err(invalid(format!(
                        "filter {} is compiled here with different predicates",
                        filter.id
                    )));
                }
            }

            let entries = filter
                .members
                .iter()
                .chain(&filter.published.added)
                .chain(&filter.pending.added);
            for entry in entries {
                let out_of_range = entry.references.iter().any(|reference| {
                    reference.entity_id != entry.id
                        || reference.type_index >= known_types
                        || reference.component_index >= capacity
                });
                if out_of_range {
                    return Err(invalid(format!(
                        "filter {} holds an out-of-range reference for {}",
                        filter.id, entry.id
                    )));
                }
            }
            let ids = filter
                .members
                .iter()
                .map(|member| member.id)
                .chain(filter.published.entity_ids())
                .chain(filter.pending.entity_ids());
            for id in ids {
                below_cursor(layout, id, "filter entry")?;
            }
        }
        Ok(())
    }
}

/// `(type_index, component_index, entity)`.
type SlotOwner = (usize, usize, EntityId);

/// Entities must lie below the cursor, appear once and hold each type at
/// most once. Returns the `(type_index, component_index, entity)` triples.
fn check_entities(layout: &WorldLayout) -> EcsResult<BTreeSet<SlotOwner>> {
    let known_types = layout.pools.len();
    let mut ids = BTreeSet::new();
    let mut held = BTreeSet::new();
    for entity in &layout.entities {
        below_cursor(layout, entity.id, "entity")?;
        if !ids.insert(entity.id) {
            return Err(invalid(format!("entity {} listed twice", entity.id)));
        }
        let mut types = BTreeSet::new();
        for &(type_index, component_index) in &entity.slots {
            if type_index >= known_types {
                return Err(invalid(format!(
                    "entity {} holds type index {type_index} with no pool",
                    entity.id
                )));
            }
            if !types.insert(type_index) {
                return Err(invalid(format!(
                    "entity {} holds type index {type_index} twice",
                    entity.id
                )));
            }
            held.insert((type_index, component_index, entity.id));
        }
    }
    Ok(held)
}

fn below_cursor(layout: &WorldLayout, id: EntityId, what: &str) -> EcsResult<()> {
    let cursor = layout.next_entity_index;
    if id.slot() < cursor {
        Ok(())
    } else {
        Err(invalid(format!("{what} {id} at or beyond cursor {cursor}")))
    }
}
