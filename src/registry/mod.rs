//! Gear registry: maps wire addresses to internal gear ids
//!
//! The registry is owned by an external inventory system. The monitor only
//! reads it: once per frame to resolve a [`GearKey`], and once per analytics
//! request to list the gears of a config group.

mod static_registry;

pub use static_registry::{GearEntry, RegistryFile, ServerEntry, StaticRegistry};

use crate::types::{GearId, GearKey};
use std::path::PathBuf;

/// Read-only view of the gear inventory.
///
/// Implementations must be thread-safe (Send + Sync); ingestion tasks and
/// API handlers call into the same instance concurrently.
pub trait GearRegistry: Send + Sync {
    /// Resolve a wire address. `Ok(None)` means the gear is not registered.
    fn resolve(&self, key: &GearKey) -> Result<Option<GearId>, RegistryError>;

    /// All gears whose server belongs to `config_id`, ascending by id.
    fn gears_in_group(&self, config_id: u32) -> Result<Vec<GearId>, RegistryError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry I/O error ({path}): {err}", path = .0.display(), err = .1)]
    Io(PathBuf, std::io::Error),
    #[error("registry parse error ({path}): {err}", path = .0.display(), err = .1)]
    Parse(PathBuf, toml::de::Error),
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}
