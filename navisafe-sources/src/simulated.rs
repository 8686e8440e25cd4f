//! Simulated position sensor
//!
//! Random walk around a starting coordinate at a fixed interval. Failures
//! can be scripted so the tracker's fallback paths can be exercised without
//! hardware.

use async_trait::async_trait;
use futures::StreamExt;
use navisafe_core::{Coordinate, Position};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::debug;

use crate::{PositionSource, PositionStream, SourceError, SourceMode};

/// Meters per degree of latitude
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Scripted failure behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulatedFailure {
    #[default]
    None,
    /// `start` fails as if the user refused location access
    PermissionDenied,
    /// The first N samples are timeouts
    Timeouts(u32),
    /// Every sample is a timeout
    NoFix,
}

/// Simulated sensor configuration
#[derive(Debug, Clone)]
pub struct SimulatedSensorConfig {
    pub start: Coordinate,
    /// Time between samples
    pub interval: Duration,
    /// Maximum displacement per sample along each axis, in meters
    pub step_m: f64,
    /// Reported accuracy
    pub accuracy_m: f64,
    /// Timeout reported with scripted timeouts
    pub timeout_ms: u64,
    pub failure: SimulatedFailure,
    /// Fixed seed for reproducible walks
    pub seed: Option<u64>,
}

impl Default for SimulatedSensorConfig {
    fn default() -> Self {
        Self {
            // Central Safe Zone
            start: Coordinate::new(31.7086, 76.5270),
            interval: Duration::from_secs(1),
            step_m: 40.0,
            accuracy_m: 15.0,
            timeout_ms: 15_000,
            failure: SimulatedFailure::None,
            seed: None,
        }
    }
}

impl SimulatedSensorConfig {
    pub fn with_start(mut self, lat: f64, lng: f64) -> Self {
        self.start = Coordinate::new(lat, lng);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_failure(mut self, failure: SimulatedFailure) -> Self {
        self.failure = failure;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_step(mut self, step_m: f64) -> Self {
        self.step_m = step_m.max(0.0);
        self
    }
}

struct WalkState {
    rng: StdRng,
    current: Coordinate,
    ticker: Interval,
    timeouts_left: Option<u32>,
    running: Arc<AtomicBool>,
    config: SimulatedSensorConfig,
}

impl WalkState {
    fn step(&mut self) -> Result<Position, SourceError> {
        if let Some(left) = self.timeouts_left.as_mut() {
            if *left > 0 {
                *left -= 1;
                return Err(SourceError::Timeout(self.config.timeout_ms));
            }
        }

        let step = self.config.step_m;
        let dn = self.rng.gen_range(-1.0..=1.0) * step;
        let de = self.rng.gen_range(-1.0..=1.0) * step;
        let lng_scale = (METERS_PER_DEGREE * self.current.lat.to_radians().cos()).max(1.0);

        let next = Coordinate::normalized(
            self.current.lat + dn / METERS_PER_DEGREE,
            self.current.lng + de / lng_scale,
        )?;
        self.current = next;

        Ok(Position::new(next.lat, next.lng, Some(self.config.accuracy_m))?)
    }
}

/// Random-walk sensor
pub struct SimulatedSensor {
    config: SimulatedSensorConfig,
    running: Arc<AtomicBool>,
}

impl SimulatedSensor {
    pub fn new(config: SimulatedSensorConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositionSource for SimulatedSensor {
    fn name(&self) -> &str {
        "simulated"
    }

    fn mode(&self) -> SourceMode {
        SourceMode::Sensor
    }

    async fn start(&mut self) -> Result<PositionStream, SourceError> {
        if self.config.failure == SimulatedFailure::PermissionDenied {
            return Err(SourceError::PermissionDenied);
        }

        // A fresh flag per start so a stopped stream never resumes
        self.running.store(false, Ordering::SeqCst);
        self.running = Arc::new(AtomicBool::new(true));

        let rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let timeouts_left = match self.config.failure {
            SimulatedFailure::Timeouts(n) => Some(n),
            SimulatedFailure::NoFix => Some(u32::MAX),
            _ => None,
        };

        let mut ticker = interval(self.config.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            "Simulated sensor starting at {:.6}, {:.6}",
            self.config.start.lat, self.config.start.lng
        );

        let state = WalkState {
            rng,
            current: self.config.start,
            ticker,
            timeouts_left,
            running: self.running.clone(),
            config: self.config.clone(),
        };

        let stream = futures::stream::unfold(state, |mut state| async move {
            state.ticker.tick().await;
            if !state.running.load(Ordering::SeqCst) {
                return None;
            }
            let item = state.step();
            Some((item, state))
        });

        Ok(stream.boxed())
    }

    async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navisafe_core::haversine_m;

    fn config() -> SimulatedSensorConfig {
        SimulatedSensorConfig::default()
            .with_interval(Duration::from_millis(100))
            .with_seed(7)
    }

    #[tokio::test(start_paused = true)]
    async fn test_walk_stays_near_start() {
        let mut sensor = SimulatedSensor::new(config());
        let mut stream = sensor.start().await.unwrap();

        let mut previous = config().start;
        for _ in 0..20 {
            let p = stream.next().await.unwrap().unwrap();
            // Each axis moves at most step_m, so a step is under step_m * sqrt(2)
            let d = haversine_m(previous.lat, previous.lng, p.lat, p.lng);
            assert!(d <= 40.0 * 1.5, "step of {} m", d);
            previous = p.coordinate();
        }
        assert!(sensor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_seeded_walk_is_reproducible() {
        let mut a = SimulatedSensor::new(config());
        let mut b = SimulatedSensor::new(config());
        let mut sa = a.start().await.unwrap();
        let mut sb = b.start().await.unwrap();

        for _ in 0..5 {
            let pa = sa.next().await.unwrap().unwrap();
            let pb = sb.next().await.unwrap().unwrap();
            assert_eq!((pa.lat, pa.lng), (pb.lat, pb.lng));
        }
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let mut sensor =
            SimulatedSensor::new(config().with_failure(SimulatedFailure::PermissionDenied));
        assert!(matches!(sensor.start().await, Err(SourceError::PermissionDenied)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_timeouts_then_fix() {
        let mut sensor = SimulatedSensor::new(config().with_failure(SimulatedFailure::Timeouts(2)));
        let mut stream = sensor.start().await.unwrap();

        assert!(stream.next().await.unwrap().unwrap_err().is_timeout());
        assert!(stream.next().await.unwrap().unwrap_err().is_timeout());
        assert!(stream.next().await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_stream() {
        let mut sensor = SimulatedSensor::new(config());
        let mut stream = sensor.start().await.unwrap();
        assert!(stream.next().await.is_some());

        sensor.stop().await;
        assert!(stream.next().await.is_none());
        assert!(!sensor.is_running());
    }
}
