//! # Frame Protocol Verification Tests
//!
//! These tests verify the observable contract of a world across frames:
//!
//! 1. **Latency**: changes surface in added/removed lists one frame later,
//!    for exactly one frame
//! 2. **Dedup**: one filter instance per predicate set
//! 3. **Membership**: `entity_list` matches the predicates as of the last
//!    `begin_frame`
//! 4. **Deletion**: strip on `begin_frame`, free on `end_frame`
//! 5. **Capacity**: exhaustion fails without touching existing state
//!
//! Run with: cargo test -p strata_ecs --test frame_protocol

use std::sync::Arc;

use strata_ecs::{
    Component, EcsError, EntityId, FilterBuilder, PoolKind, World, WorldConfiguration,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Position {
    x: f32,
}
impl Component for Position {}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Velocity {
    dx: f32,
}
impl Component for Velocity {}

#[derive(Default)]
struct Frozen;
impl Component for Frozen {}

fn world(entities: usize, types: usize, components: usize) -> World {
    World::new(WorldConfiguration::new(entities, types, components)).unwrap()
}

fn frame(world: &mut World) {
    world.end_frame().unwrap();
    world.begin_frame().unwrap();
}

// ============================================================================
// CONCRETE SCENARIO
// ============================================================================

#[test]
fn test_three_positions_scenario() {
    let mut world = world(8, 8, 8);
    let ids = (0..3)
        .map(|_| {
            let id = world.create_entity().unwrap();
            world.get::<Position>(id).unwrap().x = 1.0;
            id
        })
        .collect::<Vec<_>>();

    let filter = world.filter::<(Position,)>().unwrap();
    assert_eq!(filter.entity_added_list().len(), 0);

    world.begin_frame().unwrap();
    assert_eq!(filter.entity_added_list(), ids);
    assert_eq!(filter.entity_list(), ids);
}

// ============================================================================
// LATENCY
// ============================================================================

#[test]
fn test_addition_latency_is_one_frame() {
    let mut world = world(8, 8, 8);
    let filter = world.filter::<(Position,)>().unwrap();
    world.begin_frame().unwrap();

    let entity = world.create_entity().unwrap();
    world.get::<Position>(entity).unwrap();
    assert!(filter.entity_added_list().is_empty());
    assert!(filter.entity_list().is_empty());

    frame(&mut world);
    assert_eq!(filter.entity_added_list(), vec![entity]);
    assert_eq!(filter.entity_list(), vec![entity]);

    frame(&mut world);
    assert!(filter.entity_added_list().is_empty());
    assert_eq!(filter.entity_list(), vec![entity]);
}

#[test]
fn test_removal_latency_is_one_frame() {
    let mut world = world(8, 8, 8);
    let filter = world.filter::<(Position,)>().unwrap();
    let entity = world.create_entity().unwrap();
    world.get::<Position>(entity).unwrap();
    world.begin_frame().unwrap();

    world.remove::<Position>(entity).unwrap();
    assert!(filter.entity_removed_list().is_empty());
    assert_eq!(filter.entity_list(), vec![entity]);

    frame(&mut world);
    assert_eq!(filter.entity_removed_list(), vec![entity]);
    assert!(filter.entity_list().is_empty());

    frame(&mut world);
    assert!(filter.entity_removed_list().is_empty());
}

#[test]
fn test_add_and_remove_within_tick_is_invisible() {
    let mut world = world(8, 8, 8);
    let filter = world.filter::<(Position,)>().unwrap();
    let entity = world.create_entity().unwrap();

    world.get::<Position>(entity).unwrap();
    world.remove::<Position>(entity).unwrap();
    world.begin_frame().unwrap();

    assert!(filter.entity_added_list().is_empty());
    assert!(filter.entity_removed_list().is_empty());
    assert!(filter.entity_list().is_empty());
}

#[test]
fn test_readd_within_tick_refreshes_reference() {
    let mut world = world(8, 8, 8);
    let filter = world.filter::<(Position,)>().unwrap();
    let entity = world.create_entity().unwrap();
    world.get::<Position>(entity).unwrap();
    world.begin_frame().unwrap();
    let before = filter.reference::<Position>(&world, entity).unwrap();

    world.remove::<Position>(entity).unwrap();
    world.get::<Position>(entity).unwrap().x = 9.0;
    frame(&mut world);

    let after = filter.reference::<Position>(&world, entity).unwrap();
    assert_ne!(before.component_index, after.component_index);
    assert_eq!(filter.get::<Position>(&world, entity).unwrap().x, 9.0);
    assert_eq!(filter.entity_list(), vec![entity]);
    assert!(filter.entity_removed_list().is_empty());
}

// ============================================================================
// DEDUP
// ============================================================================

#[test]
fn test_same_predicates_share_one_filter() {
    let mut world = world(8, 8, 8);
    let a = FilterBuilder::<(Position,)>::new()
        .with::<Velocity>()
        .without::<Frozen>()
        .build(&mut world)
        .unwrap();
    let b = FilterBuilder::<(Velocity,)>::new()
        .without::<Frozen>()
        .with::<Position>()
        .build(&mut world)
        .unwrap();

    assert!(Arc::ptr_eq(a.state(), b.state()));
    assert_eq!(a.id(), b.id());
    assert_eq!(world.filter_count().unwrap(), 1);

    let c = world.filter::<(Position,)>().unwrap();
    let d = world.filter::<(Position,)>().unwrap();
    assert!(c.ptr_eq(&d));
    assert_eq!(world.filter_count().unwrap(), 2);
}

// ============================================================================
// MEMBERSHIP
// ============================================================================

#[test]
fn test_membership_matches_predicates() {
    let mut world = world(16, 8, 16);
    let moving = world.filter::<(Position, Velocity)>().unwrap();
    let still = FilterBuilder::<(Position,)>::new()
        .without::<Velocity>()
        .build(&mut world)
        .unwrap();
    let frozen = FilterBuilder::<(Position,)>::new()
        .with::<Frozen>()
        .without::<Frozen>()
        .build(&mut world)
        .unwrap();

    let ids = (0..8).map(|_| world.create_entity().unwrap()).collect::<Vec<_>>();
    for (i, &id) in ids.iter().enumerate() {
        if i % 2 == 0 {
            world.get::<Position>(id).unwrap();
        }
        if i % 3 == 0 {
            world.get::<Velocity>(id).unwrap();
        }
        if i % 4 == 0 {
            world.get::<Frozen>(id).unwrap();
        }
    }
    world.begin_frame().unwrap();
    assert_membership(&world, &ids, &moving, &still);
    assert!(frozen.entity_list().is_empty());

    // Shuffle components around and check again after the next swap
    world.remove::<Velocity>(ids[0]).unwrap();
    world.get::<Velocity>(ids[2]).unwrap();
    world.get::<Position>(ids[3]).unwrap();
    world.remove::<Position>(ids[4]).unwrap();
    frame(&mut world);
    assert_membership(&world, &ids, &moving, &still);
}

fn assert_membership(
    world: &World,
    ids: &[EntityId],
    moving: &strata_ecs::Filter<(Position, Velocity)>,
    still: &strata_ecs::Filter<(Position,)>,
) {
    for &id in ids {
        let position = world.has::<Position>(id).unwrap();
        let velocity = world.has::<Velocity>(id).unwrap();
        assert_eq!(moving.contains(id), position && velocity, "moving {id}");
        assert_eq!(still.contains(id), position && !velocity, "still {id}");
    }
}

// ============================================================================
// REFERENCE SEMANTICS
// ============================================================================

#[test]
fn test_component_round_trip() {
    let mut world = world(8, 8, 8);
    let entity = world.create_entity().unwrap();

    world.get::<Position>(entity).unwrap().x = 4.5;
    assert_eq!(world.get::<Position>(entity).unwrap().x, 4.5);

    let filter = world.filter::<(Position,)>().unwrap();
    world.begin_frame().unwrap();
    filter.get_mut::<Position>(&mut world, entity).unwrap().x = 6.0;
    assert_eq!(world.get::<Position>(entity).unwrap().x, 6.0);
}

#[test]
fn test_filter_reference_for_untracked_type() {
    let mut world = world(8, 8, 8);
    let filter = world.filter::<(Position,)>().unwrap();
    let entity = world.create_entity().unwrap();
    world.get::<Position>(entity).unwrap();
    world.get::<Velocity>(entity).unwrap();
    world.begin_frame().unwrap();

    assert_eq!(
        filter.reference::<Velocity>(&world, entity),
        Err(EcsError::FilterReferenceNotFound {
            entity,
            type_name: std::any::type_name::<Velocity>().to_owned(),
        })
    );
    assert_eq!(filter.state().reference(entity, 1), None);
}

// ============================================================================
// TWO-PHASE DELETION
// ============================================================================

#[test]
fn test_deletion_spans_frames() {
    let mut world = world(8, 8, 8);
    let filter = world.filter::<(Position,)>().unwrap();
    let entity = world.create_entity().unwrap();
    world.get::<Position>(entity).unwrap();
    world.get::<Velocity>(entity).unwrap();
    world.begin_frame().unwrap();
    world.end_frame().unwrap();

    world.delete_entity(entity).unwrap();
    world.delete_entity(entity).unwrap();
    assert!(world.has::<Position>(entity).unwrap());

    world.begin_frame().unwrap();
    assert!(world.is_entity_allocated(entity).unwrap());
    assert!(!world.has::<Position>(entity).unwrap());
    assert!(!world.has::<Velocity>(entity).unwrap());
    assert_eq!(filter.entity_removed_list(), vec![entity]);
    world.end_frame().unwrap();

    world.begin_frame().unwrap();
    world.end_frame().unwrap();

    assert!(!world.is_entity_allocated(entity).unwrap());
    assert_eq!(world.entity_count().unwrap(), 0);
    let slot = world.entity_pool().unwrap().get(entity).unwrap();
    assert_eq!(slot.component_count(), 0);
    assert_eq!(
        world.has::<Position>(entity),
        Err(EcsError::EntityNotAllocated(entity))
    );
}

#[test]
fn test_ids_are_not_reused() {
    let mut world = world(4, 4, 4);
    let first = world.create_entity().unwrap();
    world.delete_entity(first).unwrap();
    world.begin_frame().unwrap();
    world.end_frame().unwrap();

    let second = world.create_entity().unwrap();
    assert_ne!(first, second);
    assert_eq!(second.index(), 1);
}

// ============================================================================
// CAPACITY
// ============================================================================

#[test]
fn test_entity_exhaustion_preserves_state() {
    let mut world = world(4, 4, 4);
    let ids = (0..4)
        .map(|i| {
            let id = world.create_entity().unwrap();
            world.get::<Position>(id).unwrap().x = i as f32;
            id
        })
        .collect::<Vec<_>>();

    assert_eq!(
        world.create_entity(),
        Err(EcsError::CapacityExhausted {
            resource: PoolKind::Entities,
            capacity: 4
        })
    );

    for (i, &id) in ids.iter().enumerate() {
        assert!(world.is_entity_allocated(id).unwrap());
        assert_eq!(world.get::<Position>(id).unwrap().x, i as f32);
    }
    assert_eq!(world.entity_count().unwrap(), 4);
}

#[test]
fn test_component_exhaustion_preserves_state() {
    let mut world = world(8, 4, 2);
    let filter = world.filter::<(Position,)>().unwrap();
    let ids = (0..3).map(|_| world.create_entity().unwrap()).collect::<Vec<_>>();
    world.get::<Position>(ids[0]).unwrap();
    world.get::<Position>(ids[1]).unwrap();

    let error = world.get::<Position>(ids[2]).unwrap_err();
    assert!(matches!(
        error,
        EcsError::CapacityExhausted {
            resource: PoolKind::Components { .. },
            capacity: 2
        }
    ));
    assert!(!world.has::<Position>(ids[2]).unwrap());

    world.begin_frame().unwrap();
    assert_eq!(filter.entity_list(), ids[..2].to_vec());
}

#[test]
fn test_type_registry_exhaustion() {
    let mut world = world(4, 1, 4);
    let entity = world.create_entity().unwrap();
    world.get::<Position>(entity).unwrap();

    assert_eq!(
        world.get::<Velocity>(entity).unwrap_err(),
        EcsError::CapacityExhausted {
            resource: PoolKind::ComponentTypes,
            capacity: 1
        }
    );
    assert!(world.has::<Position>(entity).unwrap());
}

// ============================================================================
// DISPOSE
// ============================================================================

#[test]
fn test_use_after_dispose() {
    let mut world = world(4, 4, 4);
    let entity = world.create_entity().unwrap();
    world.dispose();

    assert_eq!(world.get::<Position>(entity).unwrap_err(), EcsError::UseAfterDispose);
    assert_eq!(world.delete_entity(entity), Err(EcsError::UseAfterDispose));
    assert_eq!(world.end_frame(), Err(EcsError::UseAfterDispose));
    assert!(world.filter::<(Position,)>().is_err());
    assert!(world.layout().is_err());
}
