//! Per-subject tracking state
//!
//! One owned struct per tracked subject. Every transition (new position,
//! countdown tick, dismissal, reset) is a method that mutates the state and
//! returns the events to broadcast. Nothing here performs I/O; the owner
//! decides where events go and when ticks happen.

use chrono::Utc;

use crate::{
    score, AlertKind, EmergencyAlert, Escalation, EscalationInput, EscalationState,
    GeofenceChange, GeofenceDetector, GeofenceTransition, Position, SafetyScore, TrackingConfig,
    TrackingEvent, ZoneCatalog, ZoneKind, ZoneMembership,
};

/// Result of feeding one position through scorer, detector and escalation
#[derive(Debug, Clone)]
pub struct Observation {
    pub score: SafetyScore,
    pub changes: Vec<GeofenceChange>,
    /// Events in emission order
    pub events: Vec<TrackingEvent>,
    /// Set when this position started a countdown
    pub countdown_started: Option<String>,
    /// Set only when the countdown is configured to zero seconds
    pub escalation: Option<Escalation>,
}

/// An expired countdown and the alert announcing it
#[derive(Debug, Clone)]
pub struct EscalationReport {
    pub escalation: Escalation,
    pub event: TrackingEvent,
}

/// Mutable state for one tracked subject
#[derive(Debug, Clone)]
pub struct SubjectState {
    subject_id: String,
    last_position: Option<Position>,
    last_score: Option<SafetyScore>,
    detector: GeofenceDetector,
    escalation: EscalationState,
    escalation_count: u32,
}

impl SubjectState {
    pub fn new(subject_id: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            last_position: None,
            last_score: None,
            detector: GeofenceDetector::new(),
            escalation: EscalationState::Idle,
            escalation_count: 0,
        }
    }

    /// Process a new position
    pub fn observe(
        &mut self,
        position: Position,
        catalog: &ZoneCatalog,
        config: &TrackingConfig,
    ) -> Observation {
        let score = score(&position, catalog, &config.thresholds);
        let changes = self.detector.detect(&position, catalog);

        let mut events = Vec::with_capacity(changes.len() + 2);
        let mut countdown_started = None;
        let mut escalation = None;

        for change in &changes {
            let Some(zone) = catalog.get(&change.zone_id) else {
                continue;
            };

            events.push(TrackingEvent::geofence(
                &self.subject_id,
                &position,
                change.transition,
                &zone.name,
                zone.kind,
            ));

            if change.transition == GeofenceTransition::Enter && zone.kind == ZoneKind::Restricted {
                let was_counting = self.escalation.is_counting_down();
                let (next, escalated) = std::mem::take(&mut self.escalation).step(
                    EscalationInput::RestrictedEntered(zone.name.clone()),
                    config.countdown_secs,
                );
                self.escalation = next;

                if !was_counting && self.escalation.is_counting_down() {
                    countdown_started = Some(zone.name.clone());
                }
                if let Some(escalated) = escalated {
                    self.escalation_count += 1;
                    events.push(self.emergency_event(&escalated.zone_name, Some(&position)));
                    escalation = Some(escalated);
                }

                events.push(TrackingEvent::alert(
                    &self.subject_id,
                    position.lat,
                    position.lng,
                    AlertKind::RestrictedZone,
                    score,
                    format!("CRITICAL: Subject entered restricted zone: {}", zone.name),
                    position.timestamp,
                ));
            }
        }

        let zone_kind = catalog.containing(&position).next().map(|z| z.kind);
        events.push(TrackingEvent::location_update(
            &self.subject_id,
            &position,
            score,
            zone_kind,
        ));

        let threshold = config.low_score_threshold;
        let dropped = self
            .last_score
            .is_some_and(|prev| prev.value() >= threshold && score.value() < threshold);
        if dropped {
            events.push(TrackingEvent::alert(
                &self.subject_id,
                position.lat,
                position.lng,
                AlertKind::LowSafetyScore,
                score,
                format!("Safety score dropped to {}% - immediate attention required", score),
                position.timestamp,
            ));
        }

        self.last_position = Some(position);
        self.last_score = Some(score);

        Observation {
            score,
            changes,
            events,
            countdown_started,
            escalation,
        }
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self, config: &TrackingConfig) -> Option<EscalationReport> {
        let (next, escalated) =
            std::mem::take(&mut self.escalation).step(EscalationInput::Tick, config.countdown_secs);
        self.escalation = next;

        let escalation = escalated?;
        self.escalation_count += 1;
        let event = self.emergency_event(&escalation.zone_name, self.last_position.as_ref());
        Some(EscalationReport { escalation, event })
    }

    /// Cancel a running countdown. Returns whether one was running.
    pub fn dismiss(&mut self) -> bool {
        let was_counting = self.escalation.is_counting_down();
        let (next, _) = std::mem::take(&mut self.escalation).step(EscalationInput::Dismiss, 0);
        self.escalation = next;
        was_counting
    }

    /// Drop membership, position and any countdown. The escalation count is
    /// kept.
    pub fn reset(&mut self) {
        let (next, _) = std::mem::take(&mut self.escalation).step(EscalationInput::Reset, 0);
        self.escalation = next;
        self.detector.reset();
        self.last_position = None;
        self.last_score = None;
    }

    fn emergency_event(&self, zone_name: &str, position: Option<&Position>) -> TrackingEvent {
        let (lat, lng) = position.map_or((0.0, 0.0), |p| (p.lat, p.lng));
        TrackingEvent::alert(
            &self.subject_id,
            lat,
            lng,
            AlertKind::EmergencyCallInitiated,
            SafetyScore::MIN,
            format!(
                "EMERGENCY: Police call initiated automatically for subject in {}",
                zone_name
            ),
            Utc::now(),
        )
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn position(&self) -> Option<&Position> {
        self.last_position.as_ref()
    }

    pub fn score(&self) -> Option<SafetyScore> {
        self.last_score
    }

    pub fn membership(&self) -> &ZoneMembership {
        self.detector.membership()
    }

    pub fn escalation(&self) -> &EscalationState {
        &self.escalation
    }

    pub fn emergency_alert(&self) -> EmergencyAlert {
        self.escalation.alert()
    }

    pub fn escalation_count(&self) -> u32 {
        self.escalation_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTRAL: (f64, f64) = (31.7086, 76.5270);
    const NORTH_RESTRICTED: (f64, f64) = (31.7166, 76.5270);
    const SOUTH_RESTRICTED: (f64, f64) = (31.7006, 76.5270);

    fn setup() -> (SubjectState, ZoneCatalog, TrackingConfig) {
        (
            SubjectState::new("tourist-1"),
            ZoneCatalog::embedded().unwrap(),
            TrackingConfig::default(),
        )
    }

    fn at((lat, lng): (f64, f64)) -> Position {
        Position::manual(lat, lng).unwrap()
    }

    #[test]
    fn test_central_safe_zone_scenario() {
        let (mut state, catalog, config) = setup();
        let obs = state.observe(at(CENTRAL), &catalog, &config);

        assert_eq!(obs.score.value(), 95);
        assert_eq!(state.membership().iter().collect::<Vec<_>>(), vec!["green-safe-zone-center"]);
        assert!(!state.emergency_alert().active);
        assert!(obs.countdown_started.is_none());

        assert_eq!(obs.events.len(), 2);
        assert_eq!(obs.events[0].channel(), "geofence_event");
        assert!(matches!(
            &obs.events[1],
            TrackingEvent::LocationUpdate { zone_kind: Some(ZoneKind::Safe), .. }
        ));
    }

    #[test]
    fn test_restricted_zone_scenario() {
        let (mut state, catalog, config) = setup();
        let obs = state.observe(at(NORTH_RESTRICTED), &catalog, &config);

        assert_eq!(obs.score.value(), 15);
        assert_eq!(obs.changes.len(), 1);
        assert_eq!(obs.changes[0].zone_id, "red-restricted-far-north");
        assert_eq!(obs.changes[0].transition, GeofenceTransition::Enter);
        assert_eq!(obs.countdown_started.as_deref(), Some("North Restricted Zone"));
        assert_eq!(state.escalation().remaining(), Some(5));

        assert!(obs.events.iter().any(|e| e.is_alert(AlertKind::RestrictedZone)));
        // First position: no previous score, so no low-score alert
        assert!(!obs.events.iter().any(|e| e.is_alert(AlertKind::LowSafetyScore)));
    }

    #[test]
    fn test_dismiss_at_three() {
        let (mut state, catalog, config) = setup();
        state.observe(at(NORTH_RESTRICTED), &catalog, &config);

        assert!(state.tick(&config).is_none());
        assert!(state.tick(&config).is_none());
        assert_eq!(state.escalation().remaining(), Some(3));

        assert!(state.dismiss());
        assert_eq!(state.escalation(), &EscalationState::Idle);
        assert_eq!(state.escalation_count(), 0);
        assert!(!state.dismiss());
    }

    #[test]
    fn test_tick_at_one_escalates() {
        let (mut state, catalog, config) = setup();
        state.observe(at(NORTH_RESTRICTED), &catalog, &config);

        for _ in 0..4 {
            assert!(state.tick(&config).is_none());
        }
        assert_eq!(state.escalation().remaining(), Some(1));

        let report = state.tick(&config).expect("countdown should expire");
        assert_eq!(report.escalation.zone_name, "North Restricted Zone");
        assert!(report.event.is_alert(AlertKind::EmergencyCallInitiated));
        assert_eq!(state.escalation(), &EscalationState::Idle);
        assert_eq!(state.escalation_count(), 1);

        assert!(state.tick(&config).is_none());
        assert_eq!(state.escalation_count(), 1);
    }

    #[test]
    fn test_low_score_alert_on_drop() {
        let (mut state, catalog, config) = setup();
        state.observe(at(CENTRAL), &catalog, &config);
        let obs = state.observe(at(SOUTH_RESTRICTED), &catalog, &config);

        assert!(obs.events.iter().any(|e| e.is_alert(AlertKind::LowSafetyScore)));

        // Staying low does not repeat it
        let obs = state.observe(at(SOUTH_RESTRICTED), &catalog, &config);
        assert!(!obs.events.iter().any(|e| e.is_alert(AlertKind::LowSafetyScore)));
    }

    #[test]
    fn test_event_order() {
        let (mut state, catalog, config) = setup();
        state.observe(at(CENTRAL), &catalog, &config);
        let obs = state.observe(at(NORTH_RESTRICTED), &catalog, &config);

        let channels: Vec<_> = obs.events.iter().map(|e| e.channel()).collect();
        assert_eq!(
            channels,
            vec![
                "geofence_event", // enter north restricted
                "safety_alert",   // restricted zone
                "geofence_event", // exit central
                "location_update",
                "safety_alert", // low score
            ]
        );
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let (mut state, catalog, config) = setup();
        state.observe(at(NORTH_RESTRICTED), &catalog, &config);
        state.reset();

        assert_eq!(state.escalation(), &EscalationState::Idle);
        assert!(state.membership().is_empty());
        assert!(state.position().is_none());
        assert!(state.tick(&config).is_none());

        // Re-entering after reset starts a fresh countdown
        let obs = state.observe(at(NORTH_RESTRICTED), &catalog, &config);
        assert!(obs.countdown_started.is_some());
    }

    #[test]
    fn test_zero_countdown_escalates_on_entry() {
        let (mut state, catalog, _) = setup();
        let config = TrackingConfig {
            countdown_secs: 0,
            ..Default::default()
        };

        let obs = state.observe(at(NORTH_RESTRICTED), &catalog, &config);
        assert!(obs.escalation.is_some());
        assert!(obs.countdown_started.is_none());
        assert_eq!(state.escalation_count(), 1);
        assert!(obs.events.iter().any(|e| e.is_alert(AlertKind::EmergencyCallInitiated)));
    }
}
