//! # Filter Compilation
//!
//! A builder collects with/without predicates and a sorted set of canonical
//! tokens. The tokens, joined with `|`, form the filter id, so the order in
//! which predicates are declared never changes which filter is returned.
//! Type names are not guaranteed unique, so `World::compile_filter` checks
//! the `TypeId`s behind a reused id and fails on a collision.
//!
//! ```rust,ignore
//! let moving = FilterBuilder::<(Position, Velocity)>::new()
//!     .without::<Frozen>()
//!     .build(&mut world)?;
//! ```

use std::collections::BTreeSet;
use std::marker::PhantomData;

use super::evaluator::PredicateKind;
use super::query::Filter;
use crate::ecs::{Component, ComponentDescriptor, ComponentSet, World};
use crate::error::EcsResult;

/// Separator between canonical tokens in a filter id.
pub const TOKEN_SEPARATOR: &str = "|";

/// Transient builder for a [`Filter`].
///
/// Starts with one `with` predicate per type in `Q`.
pub struct FilterBuilder<Q: ComponentSet> {
    tokens: BTreeSet<String>,
    predicates: Vec<(ComponentDescriptor, PredicateKind)>,
    _marker: PhantomData<fn() -> Q>,
}

impl<Q: ComponentSet> FilterBuilder<Q> {
    /// Creates a builder seeded with the types of `Q`.
    #[must_use]
    pub fn new() -> Self {
        let mut builder = Self {
            tokens: BTreeSet::new(),
            predicates: Vec::new(),
            _marker: PhantomData,
        };
        for descriptor in Q::descriptors() {
            builder.push(descriptor, PredicateKind::With);
        }
        builder
    }

    /// Requires component `T`.
    #[must_use]
    pub fn with<T: Component>(mut self) -> Self {
        self.push(ComponentDescriptor::of::<T>(), PredicateKind::With);
        self
    }

    /// Excludes component `T`.
    #[must_use]
    pub fn without<T: Component>(mut self) -> Self {
        self.push(ComponentDescriptor::of::<T>(), PredicateKind::Without);
        self
    }

    /// The canonical id the built filter will have.
    #[must_use]
    pub fn id(&self) -> String {
        self.tokens
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(TOKEN_SEPARATOR)
    }

    /// Number of distinct predicates.
    #[inline]
    #[must_use]
    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    /// Compiles the filter in `world`, or returns the one already compiled
    /// for the same predicate set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UseAfterDispose`](crate::EcsError::UseAfterDispose)
    /// on a disposed world and
    /// [`EcsError::CapacityExhausted`](crate::EcsError::CapacityExhausted) if
    /// registering a predicate type overflows the type registry.
    pub fn build(self, world: &mut World) -> EcsResult<Filter<Q>> {
        let state = world.compile_filter(&self.id(), &self.predicates)?;
        Ok(Filter::from_state(state))
    }

    fn push(&mut self, descriptor: ComponentDescriptor, kind: PredicateKind) {
        let token = format!("{}:{}", kind.token_prefix(), descriptor.type_name);
        if self.tokens.insert(token) {
            self.predicates.push((descriptor, kind));
        }
    }
}

impl<Q: ComponentSet> Default for FilterBuilder<Q> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Position;
    impl Component for Position {}

    #[derive(Default)]
    struct Velocity;
    impl Component for Velocity {}

    #[derive(Default)]
    struct Frozen;
    impl Component for Frozen {}

    #[test]
    fn test_id_is_order_independent() {
        let a = FilterBuilder::<(Position,)>::new()
            .with::<Velocity>()
            .without::<Frozen>();
        let b = FilterBuilder::<(Velocity,)>::new()
            .without::<Frozen>()
            .with::<Position>();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_id_tokens() {
        let builder = FilterBuilder::<(Position,)>::new().without::<Frozen>();
        let id = builder.id();
        let tokens = id.split(TOKEN_SEPARATOR).collect::<Vec<_>>();
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].starts_with("with:") && tokens[0].ends_with("Position"));
        assert!(tokens[1].starts_with("without:") && tokens[1].ends_with("Frozen"));
    }

    #[test]
    fn test_duplicate_predicates_collapse() {
        let builder = FilterBuilder::<(Position, Velocity)>::new()
            .with::<Position>()
            .with::<Velocity>();
        assert_eq!(builder.predicate_count(), 2);
    }

    #[test]
    fn test_contradiction_keeps_both_tokens() {
        let builder = FilterBuilder::<(Position,)>::new().without::<Position>();
        assert_eq!(builder.predicate_count(), 2);
    }
}
