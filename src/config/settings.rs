//! Server and branch-directory configuration from config.toml
//!
//! The ledger core does not own the restaurant catalog; branches and their
//! brand membership belong to the menu subsystem. What the ledger needs from
//! that world is a branch → brand mapping (to resolve the brand of an order
//! and to validate transfers), so it is seeded here from a TOML file the
//! same way initial data is provisioned elsewhere in the deployment.

use crate::core::BranchDirectory;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize)]
pub struct Config {
    /// HTTP server binding
    #[serde(default)]
    pub server: ServerConfig,
    /// Known branches and their brand membership
    pub branches: Vec<BranchConfig>,
}

/// HTTP server binding configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind, e.g. "127.0.0.1"
    pub host: String,
    /// TCP port for the REST API
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Configuration for a single branch
#[derive(Debug, Deserialize, Clone)]
pub struct BranchConfig {
    /// Branch identifier as assigned by the menu subsystem
    pub id: i64,
    /// Brand the branch belongs to
    pub brand_id: i64,
    /// Display name, informational only
    pub name: String,
}

/// In-memory branch → brand directory built from configuration.
///
/// Implements [`BranchDirectory`] for the order flow (brand resolution) and
/// the transfer coordinator (same-brand validation).
#[derive(Debug, Clone, Default)]
pub struct StaticBranchDirectory {
    brands: HashMap<i64, i64>,
}

impl StaticBranchDirectory {
    /// Builds a directory from the configured branch list.
    #[must_use]
    pub fn from_config(branches: &[BranchConfig]) -> Self {
        Self {
            brands: branches.iter().map(|b| (b.id, b.brand_id)).collect(),
        }
    }

    /// Builds a directory from explicit (`branch_id`, `brand_id`) pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[(i64, i64)]) -> Self {
        Self {
            brands: pairs.iter().copied().collect(),
        }
    }
}

impl BranchDirectory for StaticBranchDirectory {
    fn brand_of(&self, branch_id: i64) -> Option<i64> {
        self.brands.get(&branch_id).copied()
    }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads configuration from the default location (./config.toml)
pub fn load_default_config() -> Result<Config> {
    load_config("config.toml")
}
