//! # Synchronization Primitives for Parallel Systems
//!
//! ## The Problem
//!
//! ```text
//! Worker 1 (movement system):  entity gains Velocity  -> filter must learn it
//! Worker 2 (combat system):    entity dies            -> filter must learn it
//! Worker 3 (render extract):   iterates filter.added  -> must not see a moving target
//! ```
//!
//! ## The Solution: Double Buffering
//!
//! ```text
//! Tick N:
//!   Writers append to buffer A
//!   Readers iterate buffer B (changes published at the start of tick N)
//!
//! begin_frame:
//!   Apply A, publish A, clear B and make it writable
//! ```
//!
//! Writers only ever touch the current buffer, readers only the published
//! one, and the flip happens on the frame driver between ticks.

mod change_buffer;
mod deferred;

pub use change_buffer::{ChangeSet, DoubleBuffer};
pub use deferred::DeferredDeletions;
