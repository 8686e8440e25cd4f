//! Tracker registry
//!
//! At most one live tracker per subject. All trackers share the zone
//! catalog and the broadcast queue.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use navisafe_broadcast::EventQueue;
use navisafe_core::{NavisafeConfig, ZoneCatalog};
use navisafe_sources::PositionSource;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::{Tracker, TrackerConfig, TrackerError, TrackerHandle, TrackerSnapshot};

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Subject {0} is already being tracked")]
    AlreadyTracked(String),

    #[error("Subject {0} is not being tracked")]
    NotTracked(String),

    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Live trackers keyed by subject id
pub struct TrackerRegistry {
    config: NavisafeConfig,
    catalog: Arc<ZoneCatalog>,
    publisher: EventQueue,
    trackers: DashMap<String, TrackerHandle>,
}

impl TrackerRegistry {
    pub fn new(config: NavisafeConfig, catalog: Arc<ZoneCatalog>, publisher: EventQueue) -> Self {
        Self {
            config,
            catalog,
            publisher,
            trackers: DashMap::new(),
        }
    }

    /// Spawn a tracker for a subject. A tracker whose task has already
    /// exited is replaced.
    pub fn spawn(
        &self,
        subject_id: &str,
        source: Option<Box<dyn PositionSource>>,
    ) -> Result<TrackerHandle, RegistryError> {
        let spawn = || {
            let config = TrackerConfig::from_config(subject_id, &self.config);
            let mut tracker = Tracker::new(config, self.catalog.clone(), self.publisher.clone());
            if let Some(source) = source {
                tracker = tracker.with_source(source);
            }
            tracker.spawn()
        };

        let handle = match self.trackers.entry(subject_id.to_string()) {
            Entry::Occupied(entry) if !entry.get().is_closed() => {
                return Err(RegistryError::AlreadyTracked(subject_id.to_string()));
            }
            Entry::Occupied(mut entry) => {
                let handle = spawn();
                entry.insert(handle.clone());
                handle
            }
            Entry::Vacant(entry) => {
                let handle = spawn();
                entry.insert(handle.clone());
                handle
            }
        };

        info!("Registered tracker for {}", subject_id);
        Ok(handle)
    }

    pub fn get(&self, subject_id: &str) -> Option<TrackerHandle> {
        self.trackers.get(subject_id).map(|h| h.value().clone())
    }

    /// Stop and remove a subject's tracker
    pub async fn stop(&self, subject_id: &str) -> Result<TrackerSnapshot, RegistryError> {
        let (_, handle) = self
            .trackers
            .remove(subject_id)
            .ok_or_else(|| RegistryError::NotTracked(subject_id.to_string()))?;
        Ok(handle.stop().await?)
    }

    /// Stop every tracker, returning the snapshots of those still running
    pub async fn stop_all(&self) -> Vec<TrackerSnapshot> {
        let handles: Vec<_> = self.trackers.iter().map(|e| e.value().clone()).collect();
        self.trackers.clear();

        let mut snapshots = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(snapshot) = handle.stop().await {
                snapshots.push(snapshot);
            }
        }
        snapshots
    }

    /// Subject ids in sorted order
    pub fn subjects(&self) -> Vec<String> {
        let mut subjects: Vec<_> = self.trackers.iter().map(|e| e.key().clone()).collect();
        subjects.sort();
        subjects
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}
