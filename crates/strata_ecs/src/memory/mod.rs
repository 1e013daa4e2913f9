//! # Memory Management
//!
//! Fixed-capacity pools for entities and components.
//!
//! ## Design Philosophy
//!
//! All memory is allocated when the world is created or when a component
//! type is first registered. During gameplay:
//! - No pool grows
//! - Freed slots are not recycled
//! - Exhaustion is reported as an error, never absorbed

mod collection;
mod component_pool;
mod entity_pool;

pub use collection::ComponentPoolCollection;
pub use component_pool::{ComponentPool, ErasedPool};
pub use entity_pool::EntityPool;
