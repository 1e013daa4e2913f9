//! # Filter State
//!
//! The materialized result of one compiled filter: the authoritative entity
//! map plus the double-buffered added/removed sets that feed it.
//!
//! ## Frame Protocol
//!
//! 1. During a tick, component changes queue additions and removals into the
//!    current buffer (any thread).
//! 2. `begin_frame` calls [`FilterState::swap_dirty_buffers`]: merge added,
//!    drop removed, publish the buffer, open the other one.
//! 3. Systems read [`FilterState::entity_list`] and the published
//!    added/removed lists, which stay frozen for the whole tick.
//!
//! A change made in tick N is visible in the added/removed lists of tick
//! N + 1 only, and exactly for that tick.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::evaluator::{ComponentPredicate, FilterEvaluator, PredicateKind};
use crate::ecs::{ComponentReference, Entity, EntityId};
use crate::sync::{ChangeSet, DoubleBuffer};

/// Members of a filter with their stored component references.
pub(crate) type MemberMap = BTreeMap<EntityId, Vec<ComponentReference>>;

/// Shared state of one compiled filter.
///
/// Owned by the world's filter table and handed out behind an `Arc`; two
/// builders describing the same predicate set resolve to the same instance.
pub struct FilterState {
    /// Canonical id, independent of declaration order.
    id: String,
    /// Predicates sorted by type index.
    predicates: Box<[ComponentPredicate]>,
    /// Type indices of the `With` predicates, sorted. Component references
    /// are stored in this order.
    tracked_types: Box<[usize]>,
    /// Entities matching as of the last swap.
    entity_map: RwLock<MemberMap>,
    /// Pending and published changes.
    changes: DoubleBuffer,
}

impl FilterState {
    /// Creates an empty filter.
    #[must_use]
    pub fn new(id: String, mut predicates: Vec<ComponentPredicate>) -> Self {
        predicates.sort_unstable();
        predicates.dedup();
        let tracked_types = predicates
            .iter()
            .filter(|predicate| predicate.kind == PredicateKind::With)
            .map(|predicate| predicate.type_index)
            .collect::<Vec<_>>();

        Self {
            id,
            predicates: predicates.into_boxed_slice(),
            tracked_types: tracked_types.into_boxed_slice(),
            entity_map: RwLock::new(BTreeMap::new()),
            changes: DoubleBuffer::new(),
        }
    }

    /// Canonical filter id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The compiled predicates.
    #[inline]
    #[must_use]
    pub fn predicates(&self) -> &[ComponentPredicate] {
        &self.predicates
    }

    /// Type indices whose component references the filter keeps.
    #[inline]
    #[must_use]
    pub fn tracked_types(&self) -> &[usize] {
        &self.tracked_types
    }

    /// Evaluates the predicates against an entity.
    #[inline]
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        FilterEvaluator::evaluate(&self.predicates, entity)
    }

    /// Builds the reference list stored for a matching entity.
    #[must_use]
    pub fn references_for(&self, entity: &Entity) -> Vec<ComponentReference> {
        self.tracked_types
            .iter()
            .filter_map(|&type_index| {
                entity
                    .component_index(type_index)
                    .map(|component_index| ComponentReference {
                        entity_id: entity.id(),
                        type_index,
                        component_index,
                    })
            })
            .collect()
    }

    /// Queues an entity that started matching.
    ///
    /// Cancels a removal of the same entity queued earlier in the tick. If
    /// the member's stored references are unchanged that is the whole
    /// effect; otherwise the entity is re-added with the fresh references.
    pub fn queue_addition(&self, entity: EntityId, references: Vec<ComponentReference>) {
        let unchanged = self
            .entity_map
            .read()
            .get(&entity)
            .is_some_and(|stored| *stored == references);
        let mut changes = self.changes.lock_current();
        if changes.removed.remove(&entity) && unchanged {
            return;
        }
        changes.added.insert(entity, references);
    }

    /// Queues an entity that stopped matching.
    ///
    /// An addition of a non-member queued earlier in the tick is cancelled
    /// instead, so it nets to no change.
    pub fn queue_removal(&self, entity: EntityId) {
        let is_member = self.entity_map.read().contains_key(&entity);
        let mut changes = self.changes.lock_current();
        let was_pending = changes.added.remove(&entity).is_some();
        if was_pending && !is_member {
            return;
        }
        changes.removed.insert(entity);
    }

    /// Whether the entity will be a member after the next swap, given the
    /// changes queued so far.
    #[must_use]
    pub fn is_tracking(&self, entity: EntityId) -> bool {
        let is_member = self.entity_map.read().contains_key(&entity);
        let changes = self.changes.lock_current();
        changes.added.contains_key(&entity) || (is_member && !changes.removed.contains(&entity))
    }

    /// Applies the current buffer to the entity map and publishes it.
    ///
    /// Called once per frame by `World::begin_frame`, never concurrently
    /// with itself.
    pub fn swap_dirty_buffers(&self) {
        self.changes.swap(|written| {
            let mut map = self.entity_map.write();
            for (entity, references) in &written.added {
                map.insert(*entity, references.clone());
            }
            for entity in &written.removed {
                map.remove(entity);
            }
        });
    }

    /// Steady-state membership, in id order.
    #[must_use]
    pub fn entity_list(&self) -> Vec<EntityId> {
        self.entity_map.read().keys().copied().collect()
    }

    /// Entities that became members at the start of this tick.
    #[must_use]
    pub fn entity_added_list(&self) -> Vec<EntityId> {
        self.changes.lock_previous().added.keys().copied().collect()
    }

    /// Entities that stopped being members at the start of this tick.
    #[must_use]
    pub fn entity_removed_list(&self) -> Vec<EntityId> {
        self.changes.lock_previous().removed.iter().copied().collect()
    }

    /// Whether the entity is a member as of the last swap.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entity_map.read().contains_key(&entity)
    }

    /// Number of members as of the last swap.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entity_map.read().len()
    }

    /// Whether the filter has no members as of the last swap.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entity_map.read().is_empty()
    }

    /// Stored component references of a member.
    #[must_use]
    pub fn references(&self, entity: EntityId) -> Option<Vec<ComponentReference>> {
        self.entity_map.read().get(&entity).cloned()
    }

    /// Stored reference of one component type of a member.
    ///
    /// `None` if the entity is not a member or the filter keeps no reference
    /// for `type_index`. The typed [`Filter::reference`](super::Filter::reference)
    /// turns this into an error naming the component type.
    #[must_use]
    pub fn reference(&self, entity: EntityId, type_index: usize) -> Option<ComponentReference> {
        self.entity_map.read().get(&entity).and_then(|references| {
            references
                .iter()
                .find(|reference| reference.type_index == type_index)
                .copied()
        })
    }

    /// Number of completed swaps.
    #[inline]
    #[must_use]
    pub fn swap_count(&self) -> usize {
        self.changes.swap_count()
    }

    /// Copies of the membership map, the published change set and the
    /// pending change set.
    pub(crate) fn capture(&self) -> (MemberMap, ChangeSet, ChangeSet) {
        let members = self.entity_map.read().clone();
        let (published, pending) = self.changes.capture();
        (members, published, pending)
    }

    /// Replaces membership and both change sets wholesale.
    pub(crate) fn restore_state<I>(&self, members: I, published: ChangeSet, pending: ChangeSet)
    where
        I: IntoIterator<Item = (EntityId, Vec<ComponentReference>)>,
    {
        self.changes.restore(published, pending);
        let mut map = self.entity_map.write();
        map.clear();
        map.extend(members);
    }
}

impl std::fmt::Debug for FilterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterState")
            .field("id", &self.id)
            .field("predicates", &self.predicates)
            .field("members", &self.len())
            .finish_non_exhaustive()
    }
}
