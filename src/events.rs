//! Lock state notifications for collaborators outside the tracker.
//!
//! The tracker only emits events; what happens with them is up to the sinks.
//! A video recorder watching for a marker file is the usual consumer.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::EventsConfig;

/// Change of lock state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEvent {
    /// A new aircraft was locked, either from idle or replacing a lost one
    TargetAcquired { hex: String, label: String },
    /// The lock was dropped and nothing else qualified
    TargetLost { hex: String, label: String },
}

impl TrackEvent {
    pub fn hex(&self) -> &str {
        match self {
            TrackEvent::TargetAcquired { hex, .. } | TrackEvent::TargetLost { hex, .. } => hex,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TrackEvent::TargetAcquired { label, .. } | TrackEvent::TargetLost { label, .. } => {
                label
            }
        }
    }
}

/// Receiver of lock state changes
pub trait TrackEventSink: Send + Sync {
    fn notify(&self, event: &TrackEvent) -> Result<()>;
}

/// Writes every event to the log
pub struct LogSink;

impl TrackEventSink for LogSink {
    fn notify(&self, event: &TrackEvent) -> Result<()> {
        match event {
            TrackEvent::TargetAcquired { hex, label } => {
                info!("New target: {} ({})", label, hex);
            }
            TrackEvent::TargetLost { hex, label } => {
                info!("Target lost: {} ({}), no eligible aircraft", label, hex);
            }
        }
        Ok(())
    }
}

/// Keeps a file present exactly while a target is locked. The file holds
/// the label of the locked aircraft.
pub struct MarkerFileSink {
    path: PathBuf,
}

impl MarkerFileSink {
    /// Create the sink, clearing any marker left over from a previous run
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let sink = Self { path: path.into() };
        sink.remove_marker()?;
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn remove_marker(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed marker file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove marker file {:?}", self.path)),
        }
    }
}

impl TrackEventSink for MarkerFileSink {
    fn notify(&self, event: &TrackEvent) -> Result<()> {
        match event {
            TrackEvent::TargetAcquired { label, .. } => std::fs::write(&self.path, label)
                .with_context(|| format!("Failed to write marker file {:?}", self.path)),
            TrackEvent::TargetLost { .. } => self.remove_marker(),
        }
    }
}

/// Fan-out over all configured sinks. A failing sink is logged and does
/// not stop the others.
#[derive(Default)]
pub struct EventSinks {
    sinks: Vec<Box<dyn TrackEventSink>>,
}

impl EventSinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log sink plus the marker file sink when one is configured
    pub fn from_config(config: &EventsConfig) -> Result<Self> {
        let mut sinks = Self::new().with_sink(LogSink);
        if let Some(path) = &config.marker_file {
            info!("Signalling locks through marker file {}", path.display());
            sinks = sinks.with_sink(MarkerFileSink::new(path)?);
        }
        Ok(sinks)
    }

    pub fn with_sink(mut self, sink: impl TrackEventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn dispatch(&self, event: &TrackEvent) {
        match event {
            TrackEvent::TargetAcquired { .. } => {
                metrics::counter!("tracker.target.acquired").increment(1)
            }
            TrackEvent::TargetLost { .. } => metrics::counter!("tracker.target.lost").increment(1),
        }

        for sink in &self.sinks {
            if let Err(e) = sink.notify(event) {
                warn!("Track event sink failed for {}: {:#}", event.hex(), e);
            }
        }
    }
}
