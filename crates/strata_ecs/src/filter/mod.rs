//! # Filters
//!
//! Materialized, incrementally maintained queries over entities.
//!
//! ```text
//! World::get::<T>()  ──► evaluate every filter ──► queue_addition (current)
//! World::remove::<T>() ─► evaluate every filter ──► queue_removal  (current)
//!
//! begin_frame ──► swap_dirty_buffers: current -> entity_map, current -> previous
//!
//! systems ──► entity_list()          (entity_map)
//!         └─► entity_added_list()    (previous)
//!         └─► entity_removed_list()  (previous)
//! ```

mod builder;
mod evaluator;
mod query;
mod state;

pub use builder::{FilterBuilder, TOKEN_SEPARATOR};
pub use evaluator::{ComponentPredicate, FilterEvaluator, PredicateKind};
pub use query::Filter;
pub use state::FilterState;
