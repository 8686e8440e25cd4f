//! Zone catalog
//!
//! A static list of circular geofences, each classified by risk. The catalog
//! is validated once at construction and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::{Coordinate, Position, ZoneMembership};

/// Risk classification of a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Safe,
    Caution,
    Restricted,
    Crowded,
}

impl ZoneKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKind::Safe => "safe",
            ZoneKind::Caution => "caution",
            ZoneKind::Restricted => "restricted",
            ZoneKind::Crowded => "crowded",
        }
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A circular geofence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Stable identifier, unique within a catalog
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Center latitude in degrees
    pub lat: f64,
    /// Center longitude in degrees
    pub lng: f64,
    /// Radius in meters (> 0)
    pub radius_m: f64,
    pub kind: ZoneKind,
    /// Display color, no effect on scoring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Zone {
    pub fn new(id: &str, name: &str, lat: f64, lng: f64, radius_m: f64, kind: ZoneKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            lat,
            lng,
            radius_m,
            kind,
            color: None,
        }
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    /// Whether the position lies inside (or on the edge of) this zone
    pub fn contains(&self, position: &Position) -> bool {
        position.distance_to(&self.center()) <= self.radius_m
    }
}

/// Errors from building or loading a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Zone has an empty id")]
    EmptyId,

    #[error("Duplicate zone id: {0}")]
    DuplicateId(String),

    #[error("Zone {id} has invalid radius {radius}")]
    InvalidRadius { id: String, radius: f64 },

    #[error("Zone {0} has a non-finite center")]
    InvalidCenter(String),

    #[error("Failed to read catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    zones: Vec<Zone>,
}

/// Built-in catalog around NIT Hamirpur
const EMBEDDED_CATALOG: &str = include_str!("../zones/hamirpur.toml");

/// Validated, read-only list of zones
#[derive(Debug, Clone, Default, Serialize)]
pub struct ZoneCatalog {
    zones: Vec<Zone>,
}

impl ZoneCatalog {
    /// Build a catalog, checking radius, center and id invariants
    pub fn new(zones: Vec<Zone>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();

        for zone in &zones {
            if zone.id.is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if !seen.insert(zone.id.as_str()) {
                return Err(CatalogError::DuplicateId(zone.id.clone()));
            }
            if !zone.radius_m.is_finite() || zone.radius_m <= 0.0 {
                return Err(CatalogError::InvalidRadius {
                    id: zone.id.clone(),
                    radius: zone.radius_m,
                });
            }
            if !zone.lat.is_finite() || !zone.lng.is_finite() {
                return Err(CatalogError::InvalidCenter(zone.id.clone()));
            }
        }

        Ok(Self { zones })
    }

    /// The catalog compiled into the binary
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_toml_str(EMBEDDED_CATALOG)
    }

    /// Parse a catalog from TOML (`[[zones]]` tables)
    pub fn from_toml_str(s: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(s)?;
        Self::new(file.zones)
    }

    /// Load a catalog from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Zones in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Zones containing the position, in catalog order
    pub fn containing<'a>(&'a self, position: &'a Position) -> impl Iterator<Item = &'a Zone> + 'a {
        self.zones.iter().filter(move |z| z.contains(position))
    }

    /// Current membership set for a position
    pub fn membership(&self, position: &Position) -> ZoneMembership {
        self.containing(position).map(|z| z.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Count of zones per kind
    pub fn count_kind(&self, kind: ZoneKind) -> usize {
        self.zones.iter().filter(|z| z.kind == kind).count()
    }
}
