//! skytrack - points a pan/tilt camera mount at the nearest aircraft
//!
//! Polls a dump1090/readsb `aircraft.json` feed, keeps a lock on one
//! aircraft across polls, drives the mount over a serial line and serves a
//! small live dashboard.

pub mod actions;
pub mod config;
pub mod device;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod feed;
pub mod geometry;
pub mod log_format;
pub mod metrics;
pub mod selector;
pub mod status;
pub mod telemetry;
pub mod tracker;
pub mod tracking;
pub mod web;

pub use config::TrackerConfig;
pub use feed::{AircraftReport, AircraftSource, FeedClient};
pub use tracker::{CycleState, Tracker};
