//! # Filter Evaluation
//!
//! A filter matches an entity when every predicate holds. The evaluator has
//! no state; it runs once per compiled filter on every component add or
//! remove, so a mutation costs O(filter count).

use serde::{Deserialize, Serialize};

use crate::ecs::Entity;

/// Whether a predicate requires or excludes a component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PredicateKind {
    /// The entity must hold the component.
    With,
    /// The entity must not hold the component.
    Without,
}

impl PredicateKind {
    /// Prefix used in canonical filter tokens.
    #[inline]
    #[must_use]
    pub const fn token_prefix(self) -> &'static str {
        match self {
            Self::With => "with",
            Self::Without => "without",
        }
    }
}

/// One with/without condition on a component type index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentPredicate {
    /// Type index the predicate tests.
    pub type_index: usize,
    /// With or without.
    pub kind: PredicateKind,
}

impl ComponentPredicate {
    /// Requires `type_index`.
    #[inline]
    #[must_use]
    pub const fn with(type_index: usize) -> Self {
        Self {
            type_index,
            kind: PredicateKind::With,
        }
    }

    /// Excludes `type_index`.
    #[inline]
    #[must_use]
    pub const fn without(type_index: usize) -> Self {
        Self {
            type_index,
            kind: PredicateKind::Without,
        }
    }

    /// Tests this predicate against an entity's component table.
    #[inline]
    #[must_use]
    pub fn holds(&self, entity: &Entity) -> bool {
        match self.kind {
            PredicateKind::With => entity.has(self.type_index),
            PredicateKind::Without => !entity.has(self.type_index),
        }
    }
}

/// Stateless AND-evaluator over component predicates.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Returns `true` if every predicate holds for `entity`.
    ///
    /// An empty predicate list matches every entity.
    #[inline]
    #[must_use]
    pub fn evaluate(predicates: &[ComponentPredicate], entity: &Entity) -> bool {
        predicates.iter().all(|predicate| predicate.holds(entity))
    }
}
