//! # STRATA ECS
//!
//! Fixed-capacity Entity Component System for the simulation layer:
//! - Entity and component pools sized once, at world creation
//! - Per-world component type indices assigned on first use
//! - Materialized filters with double-buffered added/removed tracking
//!
//! ## Architecture Rules
//!
//! 1. **No growth** - Running out of a pool is an error, never a resize
//! 2. **One-frame latency** - A change made during tick N shows up in the
//!    added/removed lists of tick N + 1, for that tick only
//! 3. **Two-phase deletion** - `begin_frame` strips a deleted entity's
//!    components, `end_frame` frees its slot
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_ecs::{Component, World, WorldConfiguration};
//!
//! #[derive(Default)]
//! struct Position { x: f32 }
//! impl Component for Position {}
//!
//! let mut world = World::new(WorldConfiguration::new(8, 8, 8))?;
//! let positioned = world.filter::<(Position,)>()?;
//!
//! let entity = world.create_entity()?;
//! world.get::<Position>(entity)?.x = 1.0;
//!
//! world.begin_frame()?;
//! assert_eq!(positioned.entity_added_list(), vec![entity]);
//! world.end_frame()?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod events;
pub mod filter;
pub mod memory;
pub mod snapshot;
pub mod sync;

pub use config::WorldConfiguration;
pub use ecs::{
    Component, ComponentDescriptor, ComponentReference, ComponentSet, Entity, EntityId, EntityMut,
    EntityRef, World,
};
pub use error::{EcsError, EcsResult, PoolKind};
pub use events::WorldEvent;
pub use filter::{ComponentPredicate, Filter, FilterBuilder, FilterEvaluator, FilterState, PredicateKind};
pub use memory::{ComponentPool, ComponentPoolCollection, EntityPool, ErasedPool};
pub use snapshot::{
    ChangeSetLayout, ComponentPoolLayout, EntityLayout, FilterLayout, FilterMemberLayout, WorldLayout,
};
