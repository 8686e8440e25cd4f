//! Common traits for position sources

use async_trait::async_trait;
use futures::stream::BoxStream;
use navisafe_core::{GeoError, Position};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from position sources
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Location access denied")]
    PermissionDenied,

    #[error("Position unavailable: {0}")]
    Unavailable(String),

    #[error("No position fix within {0} ms")]
    Timeout(u64),

    #[error("Source is not running")]
    Closed,

    #[error("Source is busy, sample dropped")]
    Busy,

    #[error("Invalid position: {0}")]
    InvalidPosition(#[from] GeoError),

    #[error("Failed to read positions: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl SourceError {
    /// Whether the tracker should arm the fallback timer instead of
    /// recording an error
    pub fn is_timeout(&self) -> bool {
        matches!(self, SourceError::Timeout(_))
    }
}

/// Where positions come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// A sensor (real, simulated or replayed)
    Sensor,
    /// Operator-injected coordinates
    Manual,
}

/// Location permission as last reported by the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// A stream of samples; errors are recoverable and the stream may continue
/// after one
pub type PositionStream = BoxStream<'static, Result<Position, SourceError>>;

/// Common interface for all position feeds
#[async_trait]
pub trait PositionSource: Send {
    /// Source name for diagnostics
    fn name(&self) -> &str;

    fn mode(&self) -> SourceMode;

    /// Begin producing positions
    async fn start(&mut self) -> Result<PositionStream, SourceError>;

    /// Stop producing positions; streams handed out by `start` end
    async fn stop(&mut self);
}
