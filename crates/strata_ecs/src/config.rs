//! # World Configuration
//!
//! Capacities are fixed for the lifetime of a world. There is no growth
//! path, so the numbers here are the hard limits of the simulation.
//!
//! ```toml
//! entity_pool_initial_size = 4096
//! component_pool_count = 32
//! component_pool_initial_size = 4096
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Immutable sizing of a [`World`](crate::World).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfiguration {
    /// Maximum number of entities ever created in the world.
    pub entity_pool_initial_size: usize,
    /// Maximum number of distinct component types.
    pub component_pool_count: usize,
    /// Slots per component pool.
    pub component_pool_initial_size: usize,
}

impl WorldConfiguration {
    /// Creates a configuration from the three capacities.
    #[inline]
    #[must_use]
    pub const fn new(
        entity_pool_initial_size: usize,
        component_pool_count: usize,
        component_pool_initial_size: usize,
    ) -> Self {
        Self {
            entity_pool_initial_size,
            component_pool_count,
            component_pool_initial_size,
        }
    }

    /// Parses and validates a configuration from TOML text.
    ///
    /// Missing keys fall back to [`WorldConfiguration::default`].
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on malformed TOML or zero capacities.
    pub fn from_toml_str(source: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every capacity is usable.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if a capacity is zero or the entity
    /// pool does not fit 32-bit entity ids.
    pub fn validate(&self) -> EcsResult<()> {
        if self.entity_pool_initial_size == 0 {
            return Err(EcsError::InvalidConfig(
                "entity_pool_initial_size must be greater than zero".into(),
            ));
        }
        if self.entity_pool_initial_size > u32::MAX as usize {
            return Err(EcsError::InvalidConfig(format!(
                "entity_pool_initial_size {} exceeds u32::MAX",
                self.entity_pool_initial_size
            )));
        }
        if self.component_pool_count == 0 {
            return Err(EcsError::InvalidConfig(
                "component_pool_count must be greater than zero".into(),
            ));
        }
        if self.component_pool_initial_size == 0 {
            return Err(EcsError::InvalidConfig(
                "component_pool_initial_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for WorldConfiguration {
    fn default() -> Self {
        Self::new(1024, 64, 1024)
    }
}
