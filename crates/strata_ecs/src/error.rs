//! # ECS Error Types
//!
//! All errors that can occur in the ECS core. Every one of them is a
//! programming error, not a transient condition: nothing here is retried.

use std::fmt;

use thiserror::Error;

use crate::ecs::EntityId;

/// The fixed-capacity resource that ran out of slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PoolKind {
    /// The world's entity pool.
    Entities,
    /// The component pool of one component type.
    Components {
        /// Full type name of the component.
        type_name: &'static str,
    },
    /// The registry of distinct component types.
    ComponentTypes,
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entities => f.write_str("entity pool"),
            Self::Components { type_name } => write!(f, "component pool<{type_name}>"),
            Self::ComponentTypes => f.write_str("component type registry"),
        }
    }
}

/// Errors that can occur in the ECS core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// A pool or the type registry has no free slot left.
    #[error("{resource} exhausted: capacity {capacity}")]
    CapacityExhausted {
        /// Which resource ran out.
        resource: PoolKind,
        /// Its fixed capacity.
        capacity: usize,
    },

    /// Component type was never registered with this world.
    #[error("unknown component type: {type_name}")]
    UnknownType {
        /// Full type name of the component.
        type_name: String,
    },

    /// Component index beyond the pool's fixed length.
    #[error("index {index} out of range for pool of length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Pool length.
        len: usize,
    },

    /// The world was disposed.
    #[error("world used after dispose")]
    UseAfterDispose,

    /// The entity does not hold a component of the requested type.
    #[error("entity {entity} holds no {type_name} component")]
    FilterReferenceNotFound {
        /// Entity that was queried.
        entity: EntityId,
        /// Full type name of the component.
        type_name: String,
    },

    /// A filter id is already compiled for a different set of types.
    #[error("filter id {id} already names a different predicate set")]
    FilterIdConflict {
        /// Canonical filter id.
        id: String,
    },

    /// Operation on an entity slot that is not allocated.
    #[error("entity {0} is not allocated")]
    EntityNotAllocated(EntityId),

    /// Invalid world configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A structural snapshot does not fit the world it is restored into.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
}

impl EcsError {
    /// Shorthand for [`EcsError::UnknownType`].
    #[must_use]
    pub fn unknown_type(type_name: &str) -> Self {
        Self::UnknownType {
            type_name: type_name.to_owned(),
        }
    }
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EcsError::CapacityExhausted {
            resource: PoolKind::Components { type_name: "game::Position" },
            capacity: 8,
        };
        assert_eq!(
            err.to_string(),
            "component pool<game::Position> exhausted: capacity 8"
        );

        let err = EcsError::EntityNotAllocated(EntityId::new(3));
        assert_eq!(err.to_string(), "entity #3 is not allocated");
    }
}
