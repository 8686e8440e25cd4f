//! Geofence event detection
//!
//! Membership is recomputed on every position and diffed against the
//! previous set. Enters are emitted before exits, each in catalog order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{Position, ZoneCatalog};

/// Set of zone ids containing the last known position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneMembership(BTreeSet<String>);

impl ZoneMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, zone_id: &str) -> bool {
        self.0.contains(zone_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for ZoneMembership {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Direction of a membership change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeofenceTransition {
    Enter,
    Exit,
}

impl GeofenceTransition {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofenceTransition::Enter => "enter",
            GeofenceTransition::Exit => "exit",
        }
    }
}

/// A single zone enter/exit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeofenceChange {
    pub zone_id: String,
    pub transition: GeofenceTransition,
}

impl GeofenceChange {
    fn enter(zone_id: &str) -> Self {
        Self {
            zone_id: zone_id.to_string(),
            transition: GeofenceTransition::Enter,
        }
    }

    fn exit(zone_id: &str) -> Self {
        Self {
            zone_id: zone_id.to_string(),
            transition: GeofenceTransition::Exit,
        }
    }
}

/// Changes between two membership sets.
///
/// Exits for ids the catalog no longer knows are skipped.
pub fn diff(
    previous: &ZoneMembership,
    current: &ZoneMembership,
    catalog: &ZoneCatalog,
) -> Vec<GeofenceChange> {
    let enters = catalog
        .iter()
        .filter(|z| current.contains(&z.id) && !previous.contains(&z.id))
        .map(|z| GeofenceChange::enter(&z.id));

    let exits = catalog
        .iter()
        .filter(|z| previous.contains(&z.id) && !current.contains(&z.id))
        .map(|z| GeofenceChange::exit(&z.id));

    enters.chain(exits).collect()
}

/// Tracks membership across updates
#[derive(Debug, Clone, Default)]
pub struct GeofenceDetector {
    previous: ZoneMembership,
}

impl GeofenceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute changes for a new position and remember its membership
    pub fn detect(&mut self, position: &Position, catalog: &ZoneCatalog) -> Vec<GeofenceChange> {
        let current = catalog.membership(position);
        let changes = diff(&self.previous, &current, catalog);
        self.previous = current;
        changes
    }

    pub fn membership(&self) -> &ZoneMembership {
        &self.previous
    }

    pub fn reset(&mut self) {
        self.previous = ZoneMembership::new();
    }
}
