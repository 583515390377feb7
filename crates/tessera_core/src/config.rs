//! # World Configuration
//!
//! Tuning knobs for a [`World`](crate::World), loaded once at startup.
//!
//! ```toml
//! column_capacity = 64
//! scratch_pool_size = 8
//! warn_unproductive_queries = true
//! graph_name = "archetypes"
//! ```
//!
//! Every field is optional; missing fields take their [`Default`] value.

use std::path::Path;

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

/// Configuration for a [`World`](crate::World).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Initial capacity reserved by every column of a newly created archetype.
    pub column_capacity: usize,
    /// Number of scratch buffers pre-created for structural operations.
    pub scratch_pool_size: usize,
    /// Emit a warning when a query yields no values.
    pub warn_unproductive_queries: bool,
    /// Name of the DOT graph produced by diagnostics.
    pub graph_name: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            column_capacity: 0,
            scratch_pool_size: 4,
            warn_unproductive_queries: true,
            graph_name: "archetypes".to_owned(),
        }
    }
}

impl WorldConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the text is not valid TOML or
    /// contains unknown or mistyped fields.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        toml::from_str(text).map_err(|err| EcsError::InvalidConfig(err.to_string()))
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| EcsError::InvalidConfig(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
