//! Manual positioning
//!
//! Coordinates typed in by an operator (or a test) stand in for a sensor.
//! The injector is cloneable and survives stop/start cycles; injections made
//! while the source is stopped are rejected.

use async_trait::async_trait;
use futures::StreamExt;
use navisafe_core::Position;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{PositionSource, PositionStream, SourceError, SourceMode};

type SharedSender = Arc<Mutex<Option<mpsc::Sender<Position>>>>;

/// Handle for pushing coordinates into a running [`ManualSource`]
#[derive(Clone)]
pub struct ManualInjector {
    sender: SharedSender,
}

impl ManualInjector {
    /// Inject a coordinate. Returns the position that was queued.
    pub fn inject(&self, lat: f64, lng: f64) -> Result<Position, SourceError> {
        let position = Position::manual(lat, lng)?;

        let guard = self.sender.lock();
        let sender = guard.as_ref().ok_or(SourceError::Closed)?;
        sender.try_send(position.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SourceError::Busy,
            mpsc::error::TrySendError::Closed(_) => SourceError::Closed,
        })?;

        debug!("Injected manual position {:.6}, {:.6}", position.lat, position.lng);
        Ok(position)
    }
}

/// Position source fed by [`ManualInjector::inject`]
pub struct ManualSource {
    sender: SharedSender,
    buffer: usize,
}

impl ManualSource {
    /// Create a source and its injector. `buffer` bounds pending samples.
    pub fn new(buffer: usize) -> (Self, ManualInjector) {
        let sender: SharedSender = Arc::new(Mutex::new(None));
        let injector = ManualInjector {
            sender: sender.clone(),
        };
        (
            Self {
                sender,
                buffer: buffer.max(1),
            },
            injector,
        )
    }
}

#[async_trait]
impl PositionSource for ManualSource {
    fn name(&self) -> &str {
        "manual"
    }

    fn mode(&self) -> SourceMode {
        SourceMode::Manual
    }

    async fn start(&mut self) -> Result<PositionStream, SourceError> {
        let (tx, rx) = mpsc::channel(self.buffer);
        *self.sender.lock() = Some(tx);

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|p| (Ok(p), rx))
        });
        Ok(stream.boxed())
    }

    async fn stop(&mut self) {
        self.sender.lock().take();
    }
}
