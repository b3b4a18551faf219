use std::path::Path;

use anyhow::{bail, Context, Result};
use crysmap_game::{LocationData, LocationId, NUM_LOCATIONS};
use hashbrown::HashMap;
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: LocationId,
    #[serde(flatten)]
    pub data: LocationData,
}

/// Names and grouping data for the locations, keyed by location ID.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: HashMap<LocationId, LocationData>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self> {
        let catalog_str = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read catalog at {}", path.display()))?;
        Catalog::from_json(&catalog_str)
            .with_context(|| format!("Unable to parse catalog at {}", path.display()))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(s)?;
        Catalog::from_entries(entries)
    }

    pub fn from_entries(entries: Vec<CatalogEntry>) -> Result<Self> {
        let mut catalog = Catalog::default();
        for entry in entries {
            if entry.id < 0 || entry.id as usize >= NUM_LOCATIONS {
                bail!("catalog location id out of range: {}", entry.id);
            }
            if catalog.entries.contains_key(&entry.id) {
                bail!("duplicate catalog entry for location {:02x}", entry.id);
            }
            if entry.data.name.is_empty() {
                warn!(
                    "Catalog entry for location {:02x} has no name; it will be treated as unused",
                    entry.id
                );
            }
            catalog.entries.insert(entry.id, entry.data);
        }
        Ok(catalog)
    }

    pub fn get(&self, id: LocationId) -> Option<&LocationData> {
        self.entries.get(&id)
    }

    /// Catalog data for `id`, or an empty (unnamed) entry if it has none.
    pub fn data_for(&self, id: LocationId) -> LocationData {
        self.entries.get(&id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
