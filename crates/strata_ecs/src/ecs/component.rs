//! # Component System
//!
//! Components are plain data records. Each type gets a pool of fixed
//! capacity in every world that uses it, and every slot of that pool is
//! default-constructed up front.

use std::any::{type_name, TypeId};

use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use crate::memory::{ComponentPool, ErasedPool};

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Default`: pools are pre-filled and new slots are reset to the default
/// - `Send + Sync`: filters and worlds are shared across worker threads
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Default)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// impl Component for Position {}
/// ```
pub trait Component: Default + Send + Sync + 'static {}

/// Locator of one live component.
///
/// A plain value, never an owning pointer. It stays valid only while the
/// referenced slot belongs to `entity_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentReference {
    /// Owning entity.
    pub entity_id: EntityId,
    /// Type index of the component within its world.
    pub type_index: usize,
    /// Slot inside the component pool.
    pub component_index: usize,
}

/// Runtime description of a component type.
///
/// Carries what the type registry needs to create a pool for a type it has
/// only seen through a filter builder.
#[derive(Clone, Copy, Debug)]
pub struct ComponentDescriptor {
    /// Rust type id.
    pub type_id: TypeId,
    /// Full type name, also used in filter ids.
    pub type_name: &'static str,
    make_pool: fn(usize) -> Box<dyn ErasedPool>,
}

impl ComponentDescriptor {
    /// Describes component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            make_pool: new_pool::<T>,
        }
    }

    pub(crate) fn make_pool(&self, capacity: usize) -> Box<dyn ErasedPool> {
        (self.make_pool)(capacity)
    }
}

impl PartialEq for ComponentDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentDescriptor {}

fn new_pool<T: Component>(capacity: usize) -> Box<dyn ErasedPool> {
    Box::new(ComponentPool::<T>::new(capacity))
}

/// A tuple of component types, used as the type list of a filter.
pub trait ComponentSet: 'static {
    /// Descriptors of every type in the set, in declaration order.
    fn descriptors() -> Vec<ComponentDescriptor>;
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn descriptors() -> Vec<ComponentDescriptor> {
                vec![$(ComponentDescriptor::of::<$name>()),+]
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
