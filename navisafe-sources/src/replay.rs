//! Replay of recorded positions
//!
//! Reads JSON lines of the form `{"lat": 31.7, "lng": 76.5, "accuracy_m": 12.0}`
//! and plays them back at a fixed interval. Blank lines and lines starting
//! with `#` are ignored.

use async_trait::async_trait;
use futures::StreamExt;
use navisafe_core::Position;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::{PositionSource, PositionStream, SourceError, SourceMode};

/// One recorded sample
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayRecord {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub accuracy_m: Option<f64>,
}

/// Parse JSON-lines content into records
pub fn parse_records(content: &str) -> Result<Vec<ReplayRecord>, SourceError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| {
            serde_json::from_str(line.trim()).map_err(|e| SourceError::Parse {
                line: idx + 1,
                message: e.to_string(),
            })
        })
        .collect()
}

/// Plays recorded positions back once
pub struct ReplaySource {
    records: Arc<Vec<ReplayRecord>>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl ReplaySource {
    pub fn new(records: Vec<ReplayRecord>, interval: Duration) -> Self {
        Self {
            records: Arc::new(records),
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P, interval: Duration) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new(parse_records(&content)?, interval))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl PositionSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    fn mode(&self) -> SourceMode {
        SourceMode::Sensor
    }

    async fn start(&mut self) -> Result<PositionStream, SourceError> {
        if self.records.is_empty() {
            return Err(SourceError::Unavailable("no recorded positions".to_string()));
        }

        self.running.store(false, Ordering::SeqCst);
        self.running = Arc::new(AtomicBool::new(true));

        let mut ticker = interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Replaying {} recorded positions", self.records.len());

        let records = self.records.clone();
        let running = self.running.clone();

        let stream = futures::stream::unfold((0usize, ticker), move |(idx, mut ticker)| {
            let records = records.clone();
            let running = running.clone();
            async move {
                let record = records.get(idx)?;
                ticker.tick().await;
                if !running.load(Ordering::SeqCst) {
                    return None;
                }
                let item = Position::new(record.lat, record.lng, record.accuracy_m)
                    .map_err(SourceError::from);
                Some((item, (idx + 1, ticker)))
            }
        });

        Ok(stream.boxed())
    }

    async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
