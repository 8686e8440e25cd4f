//! NaviSafe Core - Domain model for geofenced tourist safety tracking
//!
//! This crate provides the pure, I/O-free building blocks:
//! - Positions and great-circle distance
//! - The static zone catalog (safe, caution, crowded, restricted geofences)
//! - Safety scoring over zone membership
//! - Geofence enter/exit detection
//! - The emergency escalation state machine
//! - Tracking events and per-subject state
//! - TOML configuration

pub mod geo;
pub mod zones;
pub mod scoring;
pub mod geofence;
pub mod escalation;
pub mod events;
pub mod tracking;
pub mod config;

pub use geo::*;
pub use zones::*;
pub use scoring::*;
pub use geofence::*;
pub use escalation::*;
pub use events::*;
pub use tracking::*;
pub use config::*;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default emergency countdown in seconds
pub const DEFAULT_COUNTDOWN_SECS: u32 = 5;

/// Score below which a low safety score alert is raised
pub const DEFAULT_LOW_SCORE_THRESHOLD: u8 = 30;

/// Fallback coordinate used when the sensor never produces a fix
pub const DEFAULT_FALLBACK_LAT: f64 = 28.754605;

/// Fallback coordinate used when the sensor never produces a fix
pub const DEFAULT_FALLBACK_LNG: f64 = 77.503009;

/// Accuracy reported for manually injected positions, in meters
pub const MANUAL_ACCURACY_M: f64 = 10.0;
