//! Site hierarchy: plant → area → device
//!
//! The core never looks a device up in storage. Callers that need plant or
//! area level figures hand over a [`SiteDirectory`] describing which area and
//! plant each device belongs to.

use crate::error::AlertError;
use crate::reading::ConsumptionReading;
use crate::stats::{ConsumptionStats, RunningStats};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Identifier of a plant (top of the hierarchy)
    PlantId
);
entity_id!(
    /// Identifier of an area inside a plant
    AreaId
);
entity_id!(
    /// Identifier of a metering device inside an area
    DeviceId
);

/// Level of the site hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeLevel {
    Plant,
    Area,
    Device,
}

/// Exactly one entity of the hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SiteScope {
    Plant(PlantId),
    Area(AreaId),
    Device(DeviceId),
}

impl SiteScope {
    /// Build from the three optional ids of an external record. Exactly one
    /// must be set.
    pub fn from_parts(
        plant_id: Option<PlantId>,
        area_id: Option<AreaId>,
        device_id: Option<DeviceId>,
    ) -> Result<Self, AlertError> {
        match (plant_id, area_id, device_id) {
            (Some(plant), None, None) => Ok(SiteScope::Plant(plant)),
            (None, Some(area), None) => Ok(SiteScope::Area(area)),
            (None, None, Some(device)) => Ok(SiteScope::Device(device)),
            (plant, area, device) => Err(AlertError::InvalidScope {
                count: [plant.is_some(), area.is_some(), device.is_some()]
                    .iter()
                    .filter(|set| **set)
                    .count(),
            }),
        }
    }

    pub fn level(&self) -> ScopeLevel {
        match self {
            SiteScope::Plant(_) => ScopeLevel::Plant,
            SiteScope::Area(_) => ScopeLevel::Area,
            SiteScope::Device(_) => ScopeLevel::Device,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            SiteScope::Plant(id) => id.as_str(),
            SiteScope::Area(id) => id.as_str(),
            SiteScope::Device(id) => id.as_str(),
        }
    }
}

/// Where a device sits in the hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePlacement {
    pub area_id: AreaId,
    pub plant_id: PlantId,
}

/// Device → area → plant lookup supplied by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteDirectory {
    devices: HashMap<DeviceId, DevicePlacement>,
}

impl SiteDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or move) a device
    pub fn insert(
        &mut self,
        device_id: impl Into<DeviceId>,
        area_id: impl Into<AreaId>,
        plant_id: impl Into<PlantId>,
    ) {
        self.devices.insert(
            device_id.into(),
            DevicePlacement {
                area_id: area_id.into(),
                plant_id: plant_id.into(),
            },
        );
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_device(
        mut self,
        device_id: impl Into<DeviceId>,
        area_id: impl Into<AreaId>,
        plant_id: impl Into<PlantId>,
    ) -> Self {
        self.insert(device_id, area_id, plant_id);
        self
    }

    pub fn placement(&self, device_id: &DeviceId) -> Option<&DevicePlacement> {
        self.devices.get(device_id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Check whether a device belongs to the scope.
    ///
    /// Devices missing from the directory only match a device scope naming
    /// them directly.
    pub fn contains(&self, scope: &SiteScope, device_id: &DeviceId) -> bool {
        match scope {
            SiteScope::Device(id) => id == device_id,
            SiteScope::Area(area) => self
                .placement(device_id)
                .map_or(false, |p| &p.area_id == area),
            SiteScope::Plant(plant) => self
                .placement(device_id)
                .map_or(false, |p| &p.plant_id == plant),
        }
    }

    /// Readings belonging to the scope, in input order
    pub fn readings_in_scope<'a>(
        &self,
        readings: &'a [ConsumptionReading],
        scope: &SiteScope,
    ) -> Vec<&'a ConsumptionReading> {
        readings
            .iter()
            .filter(|r| self.contains(scope, &r.device_id))
            .collect()
    }

    /// Statistics per entity at the given level.
    ///
    /// Readings from devices unknown to the directory are left out of plant
    /// and area rollups.
    pub fn rollup(
        &self,
        readings: &[ConsumptionReading],
        level: ScopeLevel,
    ) -> BTreeMap<String, ConsumptionStats> {
        let mut groups: BTreeMap<String, RunningStats> = BTreeMap::new();
        let mut unplaced = 0usize;

        for reading in readings {
            let key = match level {
                ScopeLevel::Device => Some(reading.device_id.to_string()),
                ScopeLevel::Area => self
                    .placement(&reading.device_id)
                    .map(|p| p.area_id.to_string()),
                ScopeLevel::Plant => self
                    .placement(&reading.device_id)
                    .map(|p| p.plant_id.to_string()),
            };

            match key {
                Some(key) => groups.entry(key).or_default().push(reading.consumption_kwh),
                None => unplaced += 1,
            }
        }

        if unplaced > 0 {
            log::debug!("{} readings from unplaced devices left out of {:?} rollup", unplaced, level);
        }

        groups
            .into_iter()
            .map(|(key, stats)| (key, stats.to_stats()))
            .collect()
    }
}
