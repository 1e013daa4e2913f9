//! # Entity Management
//!
//! Entities are slots in a fixed pool. Each slot carries a component table
//! with one entry per registrable component type, holding the index of the
//! entity's component inside that type's pool.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for an entity.
///
/// Ids are handed out in increasing order and never reused, so the id is
/// also the index of the entity's slot in the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an entity ID from a slot index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the slot index of this entity.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One entity slot.
///
/// The component table has a fixed length equal to the world's
/// `component_pool_count`. Entry `i` is the component index inside the pool
/// of the type registered at type index `i`, or `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    component_slots: Box<[Option<usize>]>,
    is_allocated: bool,
}

impl Entity {
    /// Creates an unallocated slot with an empty component table.
    #[must_use]
    pub(crate) fn new(id: EntityId, max_component_types: usize) -> Self {
        Self {
            id,
            component_slots: vec![None; max_component_types].into_boxed_slice(),
            is_allocated: false,
        }
    }

    /// The id of this slot.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Whether the slot currently belongs to a live entity.
    #[inline]
    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        self.is_allocated
    }

    /// Checks if this entity holds a component of the given type index.
    ///
    /// This is a table lookup only; no component pool is touched.
    #[inline]
    #[must_use]
    pub fn has(&self, type_index: usize) -> bool {
        matches!(self.component_slots.get(type_index), Some(Some(_)))
    }

    /// Returns the component index for a type index, if the entity holds one.
    #[inline]
    #[must_use]
    pub fn component_index(&self, type_index: usize) -> Option<usize> {
        self.component_slots.get(type_index).copied().flatten()
    }

    /// The raw component table.
    #[inline]
    #[must_use]
    pub fn component_slots(&self) -> &[Option<usize>] {
        &self.component_slots
    }

    /// Iterates `(type_index, component_index)` over populated entries.
    pub fn populated_slots(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.component_slots
            .iter()
            .enumerate()
            .filter_map(|(type_index, slot)| slot.map(|component| (type_index, component)))
    }

    /// Number of components held.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.component_slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub(crate) fn set_slot(&mut self, type_index: usize, component_index: Option<usize>) {
        if let Some(slot) = self.component_slots.get_mut(type_index) {
            *slot = component_index;
        }
    }

    pub(crate) fn mark_allocated(&mut self) {
        self.is_allocated = true;
    }

    /// Clears the allocation flag and the component table.
    pub(crate) fn release(&mut self) {
        self.is_allocated = false;
        for slot in self.component_slots.iter_mut() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_display() {
        let id = EntityId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.to_string(), "#42");
    }

    #[test]
    fn test_entity_component_table() {
        let mut entity = Entity::new(EntityId::new(0), 4);
        assert!(!entity.has(2));

        entity.set_slot(2, Some(7));
        assert!(entity.has(2));
        assert_eq!(entity.component_index(2), Some(7));
        assert_eq!(entity.populated_slots().collect::<Vec<_>>(), vec![(2, 7)]);

        entity.set_slot(2, None);
        assert!(!entity.has(2));
        assert_eq!(entity.component_count(), 0);
    }

    #[test]
    fn test_out_of_table_type_index() {
        let mut entity = Entity::new(EntityId::new(0), 2);
        entity.set_slot(5, Some(1));
        assert!(!entity.has(5));
        assert_eq!(entity.component_index(5), None);
    }

    #[test]
    fn test_release_clears_table() {
        let mut entity = Entity::new(EntityId::new(1), 3);
        entity.mark_allocated();
        entity.set_slot(0, Some(0));
        entity.set_slot(1, Some(4));

        entity.release();
        assert!(!entity.is_allocated());
        assert_eq!(entity.component_count(), 0);
    }
}
