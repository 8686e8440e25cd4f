//! Tracking events pushed to the real-time channel
//!
//! Events are best-effort notifications: no acknowledgement, no retry and
//! no ordering guarantee once they leave the tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{GeofenceTransition, Position, SafetyScore, ZoneKind};

/// Kinds of safety alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Score fell below the low-score threshold
    LowSafetyScore,
    /// Subject entered a restricted zone
    RestrictedZone,
    /// Countdown expired and authorities were contacted
    EmergencyCallInitiated,
}

/// Event payloads, tagged by channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackingEvent {
    LocationUpdate {
        subject_id: String,
        lat: f64,
        lng: f64,
        safety_score: SafetyScore,
        /// Kind of the first containing zone in catalog order
        zone_kind: Option<ZoneKind>,
        timestamp: DateTime<Utc>,
    },

    GeofenceEvent {
        subject_id: String,
        transition: GeofenceTransition,
        zone_name: String,
        zone_kind: ZoneKind,
        lat: f64,
        lng: f64,
        timestamp: DateTime<Utc>,
    },

    SafetyAlert {
        subject_id: String,
        alert_kind: AlertKind,
        lat: f64,
        lng: f64,
        safety_score: SafetyScore,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl TrackingEvent {
    /// Channel name on the real-time transport
    pub fn channel(&self) -> &'static str {
        match self {
            TrackingEvent::LocationUpdate { .. } => "location_update",
            TrackingEvent::GeofenceEvent { .. } => "geofence_event",
            TrackingEvent::SafetyAlert { .. } => "safety_alert",
        }
    }

    pub fn subject_id(&self) -> &str {
        match self {
            TrackingEvent::LocationUpdate { subject_id, .. }
            | TrackingEvent::GeofenceEvent { subject_id, .. }
            | TrackingEvent::SafetyAlert { subject_id, .. } => subject_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TrackingEvent::LocationUpdate { timestamp, .. }
            | TrackingEvent::GeofenceEvent { timestamp, .. }
            | TrackingEvent::SafetyAlert { timestamp, .. } => *timestamp,
        }
    }

    pub fn location_update(
        subject_id: &str,
        position: &Position,
        safety_score: SafetyScore,
        zone_kind: Option<ZoneKind>,
    ) -> Self {
        TrackingEvent::LocationUpdate {
            subject_id: subject_id.to_string(),
            lat: position.lat,
            lng: position.lng,
            safety_score,
            zone_kind,
            timestamp: position.timestamp,
        }
    }

    pub fn geofence(
        subject_id: &str,
        position: &Position,
        transition: GeofenceTransition,
        zone_name: &str,
        zone_kind: ZoneKind,
    ) -> Self {
        TrackingEvent::GeofenceEvent {
            subject_id: subject_id.to_string(),
            transition,
            zone_name: zone_name.to_string(),
            zone_kind,
            lat: position.lat,
            lng: position.lng,
            timestamp: position.timestamp,
        }
    }

    pub fn alert(
        subject_id: &str,
        lat: f64,
        lng: f64,
        alert_kind: AlertKind,
        safety_score: SafetyScore,
        message: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        TrackingEvent::SafetyAlert {
            subject_id: subject_id.to_string(),
            alert_kind,
            lat,
            lng,
            safety_score,
            message,
            timestamp,
        }
    }

    /// Whether this is a safety alert of the given kind
    pub fn is_alert(&self, kind: AlertKind) -> bool {
        matches!(self, TrackingEvent::SafetyAlert { alert_kind, .. } if *alert_kind == kind)
    }
}
