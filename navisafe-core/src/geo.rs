//! Positions and great-circle distance
//!
//! Coordinates are WGS84 degrees. Distances are meters on a spherical Earth.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{EARTH_RADIUS_M, MANUAL_ACCURACY_M};

/// Errors from coordinate validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("Non-finite coordinate: lat={lat}, lng={lng}")]
    NonFinite { lat: f64, lng: f64 },
}

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Validate and normalize a raw coordinate.
    ///
    /// Non-finite values are rejected. Latitude is clamped to [-90, 90] and
    /// longitude wrapped into [-180, 180).
    pub fn normalized(lat: f64, lng: f64) -> Result<Self, GeoError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(GeoError::NonFinite { lat, lng });
        }

        let lat = lat.clamp(-90.0, 90.0);
        let lng = if (-180.0..180.0).contains(&lng) {
            lng
        } else {
            (lng + 180.0).rem_euclid(360.0) - 180.0
        };

        Ok(Self { lat, lng })
    }

    /// Great-circle distance to another coordinate in meters
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_m(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Haversine distance between two points in meters.
///
/// Total over finite inputs; the `a` term is clamped so rounding can never
/// push `sqrt(1 - a)` into NaN.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// A timestamped position sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    /// Horizontal accuracy in meters, if the source reports one
    pub accuracy_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl Position {
    /// Create a validated position stamped with the current time
    pub fn new(lat: f64, lng: f64, accuracy_m: Option<f64>) -> Result<Self, GeoError> {
        Self::at(lat, lng, accuracy_m, Utc::now())
    }

    /// Create a validated position with an explicit timestamp
    pub fn at(
        lat: f64,
        lng: f64,
        accuracy_m: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, GeoError> {
        let coord = Coordinate::normalized(lat, lng)?;
        let accuracy_m = accuracy_m.filter(|a| a.is_finite() && *a >= 0.0);

        Ok(Self {
            lat: coord.lat,
            lng: coord.lng,
            accuracy_m,
            timestamp,
        })
    }

    /// A manually injected position (fixed nominal accuracy)
    pub fn manual(lat: f64, lng: f64) -> Result<Self, GeoError> {
        Self::new(lat, lng, Some(MANUAL_ACCURACY_M))
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }

    /// Distance from this position to a coordinate in meters
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        self.coordinate().distance_to(other)
    }
}
