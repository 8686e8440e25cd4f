//! Tracker actor
//!
//! Owns a subject's [`SubjectState`], its position source and the single
//! emergency countdown. Everything that mutates state arrives through one
//! `select!` loop:
//! - commands from [`TrackerHandle`]s
//! - samples from the position stream
//! - countdown ticks (only while counting down)
//! - the sensor fallback timer (only after a timeout with no fix)

use futures::StreamExt;
use navisafe_broadcast::EventQueue;
use navisafe_core::{
    Coordinate, EmergencyAlert, GeoError, NavisafeConfig, Position, SafetyScore, SubjectState,
    TrackingConfig, TrackingEvent, ZoneCatalog,
};
use navisafe_sources::{PermissionStatus, PositionSource, PositionStream, SourceError, SourceMode};
use serde::Serialize;
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, warn};

/// Countdown cadence
const TICK: Duration = Duration::from_secs(1);

/// Pending commands per tracker
const COMMAND_BUFFER: usize = 32;

/// Errors from tracker operations
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Tracker has stopped")]
    Stopped,

    #[error("Invalid position: {0}")]
    InvalidPosition(#[from] GeoError),

    #[error("No sensor source configured")]
    NoSource,

    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

/// Per-tracker settings
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub subject_id: String,
    pub tracking: TrackingConfig,
    /// Delay between a sensor timeout and the fallback coordinate
    pub fallback_delay: Duration,
    pub fallback: Coordinate,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let config = NavisafeConfig::default();
        Self::from_config(&format!("tourist-{}", &uuid::Uuid::new_v4().to_string()[..8]), &config)
    }
}

impl TrackerConfig {
    pub fn from_config(subject_id: &str, config: &NavisafeConfig) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            tracking: config.tracking.clone(),
            fallback_delay: Duration::from_millis(config.sensor.fallback_delay_ms),
            fallback: Coordinate::new(config.sensor.fallback_lat, config.sensor.fallback_lng),
        }
    }

    pub fn with_subject(mut self, subject_id: &str) -> Self {
        self.subject_id = subject_id.to_string();
        self
    }
}

/// Point-in-time view of a tracker
#[derive(Debug, Clone, Serialize)]
pub struct TrackerSnapshot {
    pub subject_id: String,
    pub position: Option<Position>,
    pub safety_score: Option<SafetyScore>,
    /// Ids of zones containing the last position
    pub zones: Vec<String>,
    pub manual_mode: bool,
    pub tracking: bool,
    pub error: Option<String>,
    pub permission: PermissionStatus,
    pub emergency_alert: EmergencyAlert,
    pub escalation_count: u32,
}

enum Command {
    Inject {
        lat: f64,
        lng: f64,
        reply: oneshot::Sender<Result<SafetyScore, TrackerError>>,
    },
    Dismiss {
        reply: oneshot::Sender<bool>,
    },
    EnableSensor {
        reply: oneshot::Sender<Result<(), TrackerError>>,
    },
    Snapshot {
        reply: oneshot::Sender<TrackerSnapshot>,
    },
    Stop {
        reply: oneshot::Sender<TrackerSnapshot>,
    },
}

/// Cloneable handle to a running tracker
#[derive(Clone)]
pub struct TrackerHandle {
    subject_id: Arc<str>,
    tx: mpsc::Sender<Command>,
}

impl TrackerHandle {
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Whether the tracker task has exited
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, TrackerError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| TrackerError::Stopped)?;
        rx.await.map_err(|_| TrackerError::Stopped)
    }

    /// Apply a manual coordinate. Switches the tracker to manual mode.
    pub async fn inject(&self, lat: f64, lng: f64) -> Result<SafetyScore, TrackerError> {
        self.request(|reply| Command::Inject { lat, lng, reply }).await?
    }

    /// Cancel a running emergency countdown. Returns whether one was running.
    pub async fn dismiss(&self) -> Result<bool, TrackerError> {
        self.request(|reply| Command::Dismiss { reply }).await
    }

    /// Leave manual mode and restart the sensor source
    pub async fn enable_sensor_mode(&self) -> Result<(), TrackerError> {
        self.request(|reply| Command::EnableSensor { reply }).await?
    }

    pub async fn snapshot(&self) -> Result<TrackerSnapshot, TrackerError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Stop tracking. Cancels the countdown and pending samples and returns
    /// the final (reset) snapshot.
    pub async fn stop(&self) -> Result<TrackerSnapshot, TrackerError> {
        self.request(|reply| Command::Stop { reply }).await
    }
}

/// The tracker actor, before it is spawned
pub struct Tracker {
    config: TrackerConfig,
    catalog: Arc<ZoneCatalog>,
    publisher: EventQueue,
    state: SubjectState,
    source: Option<Box<dyn PositionSource>>,
    stream: Option<PositionStream>,
    countdown: Option<Interval>,
    fallback: Option<Pin<Box<Sleep>>>,
    manual_mode: bool,
    tracking: bool,
    error: Option<String>,
    permission: PermissionStatus,
}

impl Tracker {
    pub fn new(config: TrackerConfig, catalog: Arc<ZoneCatalog>, publisher: EventQueue) -> Self {
        let state = SubjectState::new(&config.subject_id);
        Self {
            config,
            catalog,
            publisher,
            state,
            source: None,
            stream: None,
            countdown: None,
            fallback: None,
            manual_mode: false,
            tracking: false,
            error: None,
            permission: PermissionStatus::Unknown,
        }
    }

    pub fn with_source(mut self, source: Box<dyn PositionSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Start the actor task
    pub fn spawn(self) -> TrackerHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = TrackerHandle {
            subject_id: Arc::from(self.config.subject_id.as_str()),
            tx,
        };
        tokio::spawn(self.run(rx));
        handle
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        self.tracking = true;
        self.start_sensor().await;
        info!("Tracking started for {}", self.config.subject_id);

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(Command::Stop { reply }) => {
                        self.shutdown().await;
                        let _ = reply.send(self.snapshot());
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                sample = next_sample(&mut self.stream) => match sample {
                    Some(sample) => self.handle_sample(sample).await,
                    None => {
                        info!("Position source for {} ended", self.config.subject_id);
                        self.stream = None;
                    }
                },
                _ = next_tick(&mut self.countdown) => self.handle_tick(),
                _ = fallback_fired(&mut self.fallback) => self.handle_fallback().await,
            }
        }

        debug!("Tracker task for {} exited", self.config.subject_id);
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Inject { lat, lng, reply } => {
                let result = self.inject(lat, lng).await;
                let _ = reply.send(result);
            }
            Command::Dismiss { reply } => {
                let dismissed = self.state.dismiss();
                self.countdown = None;
                if dismissed {
                    info!("Emergency alert dismissed by {}", self.config.subject_id);
                }
                let _ = reply.send(dismissed);
            }
            Command::EnableSensor { reply } => {
                let _ = reply.send(self.enable_sensor().await);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::Stop { reply } => {
                // Handled in the run loop; kept for exhaustiveness
                self.shutdown().await;
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn handle_sample(&mut self, sample: Result<Position, SourceError>) {
        match sample {
            Ok(position) => {
                if self.permission != PermissionStatus::Granted && self.source_mode() == Some(SourceMode::Sensor) {
                    self.permission = PermissionStatus::Granted;
                }
                self.fallback = None;
                self.error = None;
                self.apply(position);
            }
            Err(e) if e.is_timeout() => {
                debug!("Sensor timeout for {}: {}", self.config.subject_id, e);
                if !self.manual_mode && self.state.position().is_none() && self.fallback.is_none() {
                    info!(
                        "No fix yet for {}, fallback in {:?}",
                        self.config.subject_id, self.config.fallback_delay
                    );
                    self.fallback = Some(Box::pin(sleep(self.config.fallback_delay)));
                }
            }
            Err(SourceError::PermissionDenied) => {
                self.permission_denied().await;
            }
            Err(e) => {
                warn!("Position source error for {}: {}", self.config.subject_id, e);
                self.error = Some(e.to_string());
            }
        }
    }

    fn handle_tick(&mut self) {
        if let Some(report) = self.state.tick(&self.config.tracking) {
            warn!(
                "Escalating: authorities contacted for {} in {}",
                self.config.subject_id, report.escalation.zone_name
            );
            self.countdown = None;
            self.publish(report.event);
        } else if !self.state.escalation().is_counting_down() {
            self.countdown = None;
        }
    }

    async fn handle_fallback(&mut self) {
        self.fallback = None;
        if self.manual_mode || self.state.position().is_some() {
            return;
        }

        let Coordinate { lat, lng } = self.config.fallback;
        info!(
            "Sensor unavailable for {}, starting at {:.6}, {:.6}",
            self.config.subject_id, lat, lng
        );
        if let Err(e) = self.inject(lat, lng).await {
            warn!("Fallback position rejected: {}", e);
        }
    }

    /// Feed a position through scoring, geofencing and escalation
    fn apply(&mut self, position: Position) -> SafetyScore {
        let observation = self.state.observe(position, &self.catalog, &self.config.tracking);

        for change in &observation.changes {
            if let Some(zone) = self.catalog.get(&change.zone_id) {
                info!(
                    "{} {} zone: {} ({})",
                    self.config.subject_id,
                    change.transition.as_str(),
                    zone.name,
                    zone.kind
                );
            }
        }

        if let Some(zone_name) = &observation.countdown_started {
            warn!(
                "Emergency countdown ({}s) started for {} in {}",
                self.config.tracking.countdown_secs, self.config.subject_id, zone_name
            );
            let start = Instant::now() + TICK;
            let mut countdown = interval_at(start, TICK);
            countdown.set_missed_tick_behavior(MissedTickBehavior::Burst);
            self.countdown = Some(countdown);
        }

        if let Some(escalation) = &observation.escalation {
            warn!(
                "Escalating: authorities contacted for {} in {}",
                self.config.subject_id, escalation.zone_name
            );
        }

        for event in observation.events {
            self.publish(event);
        }

        debug!("{} safety score {}", self.config.subject_id, observation.score);
        observation.score
    }

    async fn inject(&mut self, lat: f64, lng: f64) -> Result<SafetyScore, TrackerError> {
        let position = Position::manual(lat, lng)?;

        if !self.manual_mode {
            info!("{} switched to manual positioning", self.config.subject_id);
            self.manual_mode = true;
            if self.source_mode() == Some(SourceMode::Sensor) {
                self.stop_sensor().await;
            }
        }

        self.fallback = None;
        self.error = None;
        Ok(self.apply(position))
    }

    async fn enable_sensor(&mut self) -> Result<(), TrackerError> {
        if self.source.is_none() {
            return Err(TrackerError::NoSource);
        }

        self.stop_sensor().await;
        self.manual_mode = false;
        self.error = None;
        self.start_sensor().await;

        match &self.error {
            Some(e) if self.manual_mode => Err(TrackerError::Source(SourceError::Unavailable(e.clone()))),
            _ => Ok(()),
        }
    }

    async fn start_sensor(&mut self) {
        let Some(source) = self.source.as_mut() else {
            self.manual_mode = true;
            return;
        };

        if source.mode() == SourceMode::Manual {
            self.manual_mode = true;
        }

        match source.start().await {
            Ok(stream) => {
                debug!("Source {} started for {}", source.name(), self.config.subject_id);
                self.stream = Some(stream);
            }
            Err(SourceError::PermissionDenied) => self.permission_denied().await,
            Err(e) => {
                warn!(
                    "Failed to start source for {}: {}, using manual positioning",
                    self.config.subject_id, e
                );
                self.error = Some(e.to_string());
                self.manual_mode = true;
            }
        }
    }

    async fn stop_sensor(&mut self) {
        self.stream = None;
        if let Some(source) = self.source.as_mut() {
            source.stop().await;
        }
    }

    async fn permission_denied(&mut self) {
        warn!(
            "Location access denied for {}, using manual positioning",
            self.config.subject_id
        );
        self.permission = PermissionStatus::Denied;
        self.error = Some(SourceError::PermissionDenied.to_string());
        self.manual_mode = true;
        self.fallback = None;
        self.stop_sensor().await;
    }

    async fn shutdown(&mut self) {
        self.stop_sensor().await;
        self.countdown = None;
        self.fallback = None;
        self.state.reset();
        self.tracking = false;
        info!("Tracking stopped for {}", self.config.subject_id);
    }

    fn source_mode(&self) -> Option<SourceMode> {
        self.source.as_ref().map(|s| s.mode())
    }

    fn publish(&self, event: TrackingEvent) {
        if !self.publisher.send(event) {
            debug!("Broadcast queue closed, event dropped");
        }
    }

    fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            subject_id: self.config.subject_id.clone(),
            position: self.state.position().cloned(),
            safety_score: self.state.score(),
            zones: self.state.membership().iter().map(String::from).collect(),
            manual_mode: self.manual_mode,
            tracking: self.tracking,
            error: self.error.clone(),
            permission: self.permission,
            emergency_alert: self.state.emergency_alert(),
            escalation_count: self.state.escalation_count(),
        }
    }
}

async fn next_sample(stream: &mut Option<PositionStream>) -> Option<Result<Position, SourceError>> {
    match stream {
        Some(stream) => stream.next().await,
        None => pending().await,
    }
}

async fn next_tick(countdown: &mut Option<Interval>) {
    match countdown {
        Some(countdown) => {
            countdown.tick().await;
        }
        None => pending().await,
    }
}

async fn fallback_fired(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navisafe_core::AlertKind;
    use navisafe_sources::{ManualSource, SimulatedFailure, SimulatedSensor, SimulatedSensorConfig};

    const CENTRAL: (f64, f64) = (31.7086, 76.5270);
    const NORTH_RESTRICTED: (f64, f64) = (31.7166, 76.5270);
    const SOUTH_RESTRICTED: (f64, f64) = (31.7006, 76.5270);

    fn tracker(queue: &EventQueue) -> Tracker {
        let config = TrackerConfig::default().with_subject("tourist-1");
        let catalog = Arc::new(ZoneCatalog::embedded().unwrap());
        Tracker::new(config, catalog, queue.clone())
    }

    fn count_alerts(events: &[TrackingEvent], kind: AlertKind) -> usize {
        events.iter().filter(|e| e.is_alert(kind)).count()
    }

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_central_safe_zone() {
        let queue = EventQueue::new(64);
        let handle = tracker(&queue).spawn();

        let score = handle.inject(CENTRAL.0, CENTRAL.1).await.unwrap();
        assert_eq!(score.value(), 95);

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.zones, vec!["green-safe-zone-center".to_string()]);
        assert!(snap.manual_mode);
        assert!(snap.tracking);
        assert!(!snap.emergency_alert.active);

        let channels: Vec<_> = queue.drain().iter().map(|e| e.channel()).collect();
        assert_eq!(channels, vec!["geofence_event", "location_update"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restricted_entry_starts_countdown() {
        let queue = EventQueue::new(64);
        let handle = tracker(&queue).spawn();

        let score = handle.inject(NORTH_RESTRICTED.0, NORTH_RESTRICTED.1).await.unwrap();
        assert_eq!(score.value(), 15);

        let snap = handle.snapshot().await.unwrap();
        assert!(snap.emergency_alert.active);
        assert_eq!(snap.emergency_alert.countdown_seconds, 5);
        assert_eq!(snap.emergency_alert.zone_name, "North Restricted Zone");

        let events = queue.drain();
        assert_eq!(count_alerts(&events, AlertKind::RestrictedZone), 1);
        assert_eq!(
            events.iter().filter(|e| e.channel() == "geofence_event").count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_at_three_prevents_escalation() {
        let queue = EventQueue::new(64);
        let handle = tracker(&queue).spawn();
        handle.inject(NORTH_RESTRICTED.0, NORTH_RESTRICTED.1).await.unwrap();

        wait(2_500).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.emergency_alert.countdown_seconds, 3);

        assert!(handle.dismiss().await.unwrap());
        wait(10_000).await;

        let snap = handle.snapshot().await.unwrap();
        assert!(!snap.emergency_alert.active);
        assert_eq!(snap.escalation_count, 0);
        assert_eq!(count_alerts(&queue.drain(), AlertKind::EmergencyCallInitiated), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_escalates_exactly_once() {
        let queue = EventQueue::new(64);
        let handle = tracker(&queue).spawn();
        handle.inject(NORTH_RESTRICTED.0, NORTH_RESTRICTED.1).await.unwrap();

        wait(4_500).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.emergency_alert.countdown_seconds, 1);

        wait(1_000).await;
        let snap = handle.snapshot().await.unwrap();
        assert!(!snap.emergency_alert.active);
        assert_eq!(snap.escalation_count, 1);

        wait(10_000).await;
        assert_eq!(handle.snapshot().await.unwrap().escalation_count, 1);
        assert_eq!(count_alerts(&queue.drain(), AlertKind::EmergencyCallInitiated), 1);

        // Dismissing afterwards has nothing to cancel
        assert!(!handle.dismiss().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_restricted_zone_keeps_countdown() {
        let queue = EventQueue::new(64);
        let handle = tracker(&queue).spawn();
        handle.inject(NORTH_RESTRICTED.0, NORTH_RESTRICTED.1).await.unwrap();

        wait(2_500).await;
        handle.inject(SOUTH_RESTRICTED.0, SOUTH_RESTRICTED.1).await.unwrap();

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.emergency_alert.zone_name, "North Restricted Zone");
        assert_eq!(snap.emergency_alert.countdown_seconds, 3);
        assert_eq!(count_alerts(&queue.drain(), AlertKind::RestrictedZone), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_countdown() {
        let queue = EventQueue::new(64);
        let handle = tracker(&queue).spawn();
        handle.inject(NORTH_RESTRICTED.0, NORTH_RESTRICTED.1).await.unwrap();

        wait(2_000).await;
        let snap = handle.stop().await.unwrap();
        assert!(!snap.tracking);
        assert!(!snap.emergency_alert.active);
        assert!(snap.zones.is_empty());
        assert!(snap.position.is_none());

        wait(10_000).await;
        assert_eq!(count_alerts(&queue.drain(), AlertKind::EmergencyCallInitiated), 0);
        assert!(matches!(handle.snapshot().await, Err(TrackerError::Stopped)));
        assert!(handle.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_injection_leaves_state() {
        let queue = EventQueue::new(64);
        let handle = tracker(&queue).spawn();
        handle.inject(CENTRAL.0, CENTRAL.1).await.unwrap();

        let result = handle.inject(f64::NAN, 76.5).await;
        assert!(matches!(result, Err(TrackerError::InvalidPosition(_))));

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.safety_score.map(|s| s.value()), Some(95));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sensor_positions_tracked() {
        let queue = EventQueue::new(64);
        let sensor = SimulatedSensor::new(
            SimulatedSensorConfig::default()
                .with_start(CENTRAL.0, CENTRAL.1)
                .with_step(0.0)
                .with_seed(1),
        );
        let handle = tracker(&queue).with_source(Box::new(sensor)).spawn();

        wait(1_500).await;
        let snap = handle.snapshot().await.unwrap();
        assert!(!snap.manual_mode);
        assert_eq!(snap.permission, PermissionStatus::Granted);
        assert_eq!(snap.safety_score.map(|s| s.value()), Some(95));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_to_coordinate() {
        let queue = EventQueue::new(64);
        let sensor = SimulatedSensor::new(
            SimulatedSensorConfig::default().with_failure(SimulatedFailure::NoFix),
        );
        let handle = tracker(&queue).with_source(Box::new(sensor)).spawn();

        wait(3_000).await;
        let snap = handle.snapshot().await.unwrap();
        assert!(snap.position.is_none());
        assert!(snap.error.is_none());

        wait(4_000).await;
        let snap = handle.snapshot().await.unwrap();
        assert!(snap.manual_mode);
        let position = snap.position.expect("fallback applied");
        assert!((position.lat - navisafe_core::DEFAULT_FALLBACK_LAT).abs() < 1e-9);
        assert!((position.lng - navisafe_core::DEFAULT_FALLBACK_LNG).abs() < 1e-9);
        assert_eq!(snap.safety_score.map(|s| s.value()), Some(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_denied_degrades_to_manual() {
        let queue = EventQueue::new(64);
        let sensor = SimulatedSensor::new(
            SimulatedSensorConfig::default().with_failure(SimulatedFailure::PermissionDenied),
        );
        let handle = tracker(&queue).with_source(Box::new(sensor)).spawn();

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.permission, PermissionStatus::Denied);
        assert!(snap.manual_mode);
        assert!(snap.error.is_some());

        assert_eq!(handle.inject(CENTRAL.0, CENTRAL.1).await.unwrap().value(), 95);
        assert!(handle.snapshot().await.unwrap().error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_sensor_mode_resumes_sensor() {
        let queue = EventQueue::new(64);
        let sensor = SimulatedSensor::new(
            SimulatedSensorConfig::default()
                .with_start(CENTRAL.0, CENTRAL.1)
                .with_step(0.0),
        );
        let handle = tracker(&queue).with_source(Box::new(sensor)).spawn();

        handle.inject(NORTH_RESTRICTED.0, NORTH_RESTRICTED.1).await.unwrap();
        assert!(handle.snapshot().await.unwrap().manual_mode);
        handle.dismiss().await.unwrap();

        handle.enable_sensor_mode().await.unwrap();
        wait(1_500).await;

        let snap = handle.snapshot().await.unwrap();
        assert!(!snap.manual_mode);
        assert_eq!(snap.zones, vec!["green-safe-zone-center".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_sensor_without_source() {
        let queue = EventQueue::new(64);
        let handle = tracker(&queue).spawn();
        assert!(matches!(
            handle.enable_sensor_mode().await,
            Err(TrackerError::NoSource)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_source_stream() {
        let queue = EventQueue::new(64);
        let (source, injector) = ManualSource::new(8);
        let handle = tracker(&queue).with_source(Box::new(source)).spawn();

        // Let the actor start the source before injecting
        let snap = handle.snapshot().await.unwrap();
        assert!(snap.manual_mode);

        injector.inject(CENTRAL.0, CENTRAL.1).unwrap();
        wait(10).await;

        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.safety_score.map(|s| s.value()), Some(95));
    }
}
