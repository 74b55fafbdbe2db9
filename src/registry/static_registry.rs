//! Registry loaded from a TOML inventory export
//!
//! ```toml
//! [[server]]
//! id = 3735928559        # gateway hardware id
//! config_id = 15
//!
//! [[gear]]
//! id = 169
//! server_id = 3735928559
//! channel = 0
//! unit = 12
//! name = "corridor-east"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::{GearRegistry, RegistryError};
use crate::types::{GearId, GearKey};

/// Gateway entry; `id` is the hardware id carried in every frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    pub id: u64,
    pub config_id: u32,
    #[serde(default)]
    pub host: String,
}

/// Gear entry, addressed by (gateway, channel, unit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearEntry {
    pub id: u64,
    pub server_id: u64,
    pub channel: u8,
    pub unit: u8,
    #[serde(default)]
    pub name: String,
}

/// On-disk inventory layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default, rename = "server")]
    pub servers: Vec<ServerEntry>,
    #[serde(default, rename = "gear")]
    pub gears: Vec<GearEntry>,
}

/// Immutable in-memory registry built from a [`RegistryFile`].
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    by_key: HashMap<GearKey, GearId>,
    groups: HashMap<u32, Vec<GearId>>,
}

impl StaticRegistry {
    /// Registry with no gears; every frame resolves to "not found".
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_file(file: &RegistryFile) -> Self {
        let server_groups: HashMap<u64, u32> =
            file.servers.iter().map(|s| (s.id, s.config_id)).collect();

        let mut by_key = HashMap::with_capacity(file.gears.len());
        let mut groups: HashMap<u32, Vec<GearId>> = HashMap::new();

        for gear in &file.gears {
            let key = GearKey {
                hardware_id: gear.server_id,
                channel: gear.channel,
                unit: gear.unit,
            };
            if let Some(previous) = by_key.insert(key, GearId(gear.id)) {
                warn!(key = %key, previous = %previous, replacement = gear.id, "Duplicate gear address in registry");
            }
            match server_groups.get(&gear.server_id) {
                Some(config_id) => groups.entry(*config_id).or_default().push(GearId(gear.id)),
                None => warn!(gear_id = gear.id, server_id = gear.server_id, "Gear references unknown server"),
            }
        }

        for ids in groups.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }

        Self { by_key, groups }
    }

    /// Load the inventory export at `path`.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Io(path.to_path_buf(), e))?;
        let file: RegistryFile =
            toml::from_str(&contents).map_err(|e| RegistryError::Parse(path.to_path_buf(), e))?;

        let registry = Self::from_file(&file);
        info!(
            path = %path.display(),
            servers = file.servers.len(),
            gears = registry.len(),
            "Gear registry loaded"
        );
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

impl GearRegistry for StaticRegistry {
    fn resolve(&self, key: &GearKey) -> Result<Option<GearId>, RegistryError> {
        Ok(self.by_key.get(key).copied())
    }

    fn gears_in_group(&self, config_id: u32) -> Result<Vec<GearId>, RegistryError> {
        Ok(self.groups.get(&config_id).cloned().unwrap_or_default())
    }

    fn backend_name(&self) -> &'static str {
        "Static"
    }
}
