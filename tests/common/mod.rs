//! Common test utilities for tracker integration tests
//!
//! Scripted stand-ins for the two external collaborators: the traffic feed
//! and the pointing device. Both record what the tracker did with them so
//! tests can assert on it afterwards.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use skytrack::config::TrackerConfig;
use skytrack::device::PointingDevice;
use skytrack::errors::{DeviceError, FeedError};
use skytrack::events::{TrackEvent, TrackEventSink};
use skytrack::feed::{AircraftReport, AircraftSource};

pub type Poll = Result<Vec<AircraftReport>, FeedError>;

/// Feed that plays back scripted polls, then reports an empty sky
#[derive(Clone, Default)]
pub struct ScriptedFeed {
    polls: Arc<Mutex<VecDeque<Poll>>>,
}

impl ScriptedFeed {
    pub fn new(polls: Vec<Poll>) -> Self {
        Self {
            polls: Arc::new(Mutex::new(polls.into())),
        }
    }

    pub fn push(&self, poll: Poll) {
        self.polls.lock().unwrap().push_back(poll);
    }
}

#[async_trait]
impl AircraftSource for ScriptedFeed {
    async fn fetch(&self) -> Result<Vec<AircraftReport>, FeedError> {
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Device that keeps every line written to it
#[derive(Clone, Default)]
pub struct RecordingDevice {
    lines: Arc<Mutex<Vec<String>>>,
    unplugged: Arc<Mutex<bool>>,
}

impl RecordingDevice {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn set_unplugged(&self, unplugged: bool) {
        *self.unplugged.lock().unwrap() = unplugged;
    }
}

#[async_trait]
impl PointingDevice for RecordingDevice {
    async fn send_line(&mut self, line: &str) -> Result<(), DeviceError> {
        if *self.unplugged.lock().unwrap() {
            return Err(DeviceError::Write(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "device unplugged",
            )));
        }
        self.lines.lock().unwrap().push(line.to_string());
        Ok(())
    }

    fn describe(&self) -> String {
        "recording device".to_string()
    }
}

/// Event sink that keeps every event
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<TrackEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<TrackEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl TrackEventSink for RecordingSink {
    fn notify(&self, event: &TrackEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Observer at (0, 0), 30 m, with loop delays short enough for tests
pub fn test_config() -> TrackerConfig {
    let mut config = TrackerConfig::default();
    config.observer.latitude = 0.0;
    config.observer.longitude = 0.0;
    config.observer.altitude_m = 30.0;
    config.feed.poll_interval_secs = 0.01;
    config.feed.retry_delay_secs = 0.01;
    config.feed.idle_delay_secs = 0.01;
    config.device.homing_delay_secs = 0.0;
    config.device.settle_delay_secs = 0.0;
    config
}

pub fn aircraft(
    hex: &str,
    flight: Option<&str>,
    lat: f64,
    lon: f64,
    alt_ft: f64,
    seen: f64,
) -> AircraftReport {
    AircraftReport {
        hex: hex.to_string(),
        flight: flight.map(str::to_string),
        lat: Some(lat),
        lon: Some(lon),
        altitude: Some(alt_ft),
        seen_pos: seen,
    }
}
