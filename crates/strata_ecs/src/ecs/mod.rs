//! # Entity Component System
//!
//! A fixed-capacity ECS whose queries are materialized filters.
//!
//! ## Design Philosophy
//!
//! - All storage is pre-allocated at world creation
//! - Component types get small per-world indices on first use
//! - Entity ids and component slots are bump-allocated and never reused
//! - Entity mutation goes through `&mut World`; only deletion marks and
//!   filter change queues are shared across threads

mod component;
mod entity;
mod view;
mod world;

pub use component::{Component, ComponentDescriptor, ComponentReference, ComponentSet};
pub use entity::{Entity, EntityId};
pub use view::{EntityMut, EntityRef};
pub use world::World;
