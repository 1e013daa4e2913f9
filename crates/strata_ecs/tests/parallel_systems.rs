//! # Parallel System Tests
//!
//! Systems running on worker threads share `&World` and the filter handles.
//! Deletion marks and filter change queues are the only shared writes.
//!
//! Run with: cargo test -p strata_ecs --test parallel_systems

use std::collections::BTreeSet;

use strata_ecs::{Component, EntityId, World, WorldConfiguration};

#[derive(Default)]
struct Health(u32);
impl Component for Health {}

#[derive(Default)]
struct Marker;
impl Component for Marker {}

const WORKERS: u32 = 4;
const ENTITIES: usize = 256;

fn populated_world() -> (World, Vec<EntityId>) {
    let mut world = World::new(WorldConfiguration::new(ENTITIES, 4, ENTITIES)).unwrap();
    let ids = (0..ENTITIES)
        .map(|i| {
            let id = world.create_entity().unwrap();
            world.get::<Health>(id).unwrap().0 = u32::try_from(i).unwrap();
            id
        })
        .collect::<Vec<_>>();
    (world, ids)
}

#[test]
fn test_parallel_deletion_marks() {
    let (mut world, ids) = populated_world();
    let filter = world.filter::<(Health,)>().unwrap();
    world.begin_frame().unwrap();
    world.end_frame().unwrap();
    assert_eq!(filter.len(), ENTITIES);

    // Each worker deletes the even ids in its own stripe
    std::thread::scope(|scope| {
        for worker in 0..WORKERS {
            let world = &world;
            let filter = &filter;
            scope.spawn(move || {
                for id in filter.entity_list() {
                    if id.index() % WORKERS == worker && id.index() % 2 == 0 {
                        world.delete_entity(id).unwrap();
                    }
                }
            });
        }
    });

    let expected = ids
        .iter()
        .copied()
        .filter(|id| id.index() % 2 == 0)
        .collect::<Vec<_>>();
    assert_eq!(world.marked_for_deletion().unwrap(), expected);

    world.begin_frame().unwrap();
    assert_eq!(filter.entity_removed_list(), expected);
    assert_eq!(filter.len(), ENTITIES / 2);
    world.end_frame().unwrap();

    assert_eq!(world.entity_count().unwrap(), ENTITIES / 2);
    for id in expected {
        assert!(!world.is_entity_allocated(id).unwrap());
    }
}

#[test]
fn test_parallel_queueing_into_shared_filter() {
    let (mut world, _) = populated_world();
    let filter = world.filter::<(Marker,)>().unwrap();
    world.begin_frame().unwrap();

    std::thread::scope(|scope| {
        for worker in 0..WORKERS {
            let filter = &filter;
            scope.spawn(move || {
                for i in 0..64u32 {
                    filter.queue_addition(EntityId::new(worker * 64 + i), Vec::new());
                }
            });
        }
    });

    // Queued changes stay invisible to readers until the swap
    assert!(filter.entity_added_list().is_empty());

    world.end_frame().unwrap();
    world.begin_frame().unwrap();
    let added = filter.entity_added_list().into_iter().collect::<BTreeSet<_>>();
    assert_eq!(added.len(), 256);
    assert_eq!(filter.len(), 256);
}

#[test]
fn test_readers_see_frozen_lists_during_tick() {
    let (mut world, ids) = populated_world();
    let filter = world.filter::<(Health,)>().unwrap();
    world.begin_frame().unwrap();
    let published = filter.entity_added_list();
    assert_eq!(published, ids);

    for &id in &ids[..16] {
        world.remove::<Health>(id).unwrap();
    }

    std::thread::scope(|scope| {
        for _ in 0..WORKERS {
            let filter = &filter;
            let published = &published;
            scope.spawn(move || {
                assert_eq!(&filter.entity_added_list(), published);
                assert!(filter.entity_removed_list().is_empty());
                assert_eq!(filter.len(), ENTITIES);
            });
        }
    });
}
