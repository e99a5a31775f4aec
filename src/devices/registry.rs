// MIT License - Copyright (c) 2026 Peter Wright
// Zone registry

use std::collections::HashMap;

use tracing::{info, warn};

use crate::config::ZoneEntry;
use crate::devices::zone::{ZoneDescriptor, ZoneType};
use crate::error::{BridgeError, Result};

/// Configured zones keyed by zone id.
///
/// Built once at startup and never mutated afterwards. Iteration follows
/// configuration order.
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    zones: HashMap<String, ZoneDescriptor>,
    order: Vec<String>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configured zone entries.
    ///
    /// Entries with an unknown type or a duplicate id are logged and skipped.
    pub fn from_config(entries: &[ZoneEntry]) -> Self {
        let mut registry = Self::new();
        for entry in entries {
            match registry.add_entry(entry) {
                Ok(()) => info!(
                    "Zone {} registered: {}, {}",
                    entry.id, entry.zone_type, entry.name
                ),
                Err(e) => warn!("Skipping zone {}: {}", entry.id, e),
            }
        }
        registry
    }

    /// Register a single configuration entry.
    pub fn add_entry(&mut self, entry: &ZoneEntry) -> Result<()> {
        let zone_type =
            ZoneType::from_name(&entry.zone_type).ok_or_else(|| BridgeError::UnknownZoneType {
                id: entry.id.clone(),
                zone_type: entry.zone_type.clone(),
            })?;
        let mut zone = ZoneDescriptor::new(entry.id.clone(), zone_type, entry.name.clone());
        zone.full_name = entry.fullname.clone();
        self.insert(zone)
    }

    /// Register a zone. The first registration of an id wins.
    pub fn insert(&mut self, zone: ZoneDescriptor) -> Result<()> {
        if self.zones.contains_key(&zone.id) {
            return Err(BridgeError::InvalidConfig {
                details: format!("zone {} already exists", zone.id),
            });
        }
        self.order.push(zone.id.clone());
        self.zones.insert(zone.id.clone(), zone);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ZoneDescriptor> {
        self.zones.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.zones.contains_key(id)
    }

    /// All zones of the given type, in configuration order.
    pub fn by_type(&self, zone_type: ZoneType) -> Vec<&ZoneDescriptor> {
        self.iter().filter(|z| z.zone_type == zone_type).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZoneDescriptor> {
        self.order.iter().filter_map(|id| self.zones.get(id))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
