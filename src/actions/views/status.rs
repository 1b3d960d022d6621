use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::selector::NearbyEntry;
use crate::status::StatusSnapshot;

/// Shown in place of a target label while idle
pub const NO_TARGET: &str = "N/A";

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Body of `GET /status`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    pub az: f64,
    pub el: f64,
    pub dist: f64,
    pub target: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&StatusSnapshot> for StatusView {
    fn from(snapshot: &StatusSnapshot) -> Self {
        let pointing = &snapshot.pointing;
        Self {
            az: round1(pointing.azimuth),
            el: round1(pointing.elevation),
            dist: round1(pointing.distance_km),
            target: pointing
                .target
                .clone()
                .unwrap_or_else(|| NO_TARGET.to_string()),
            updated_at: snapshot.updated_at,
        }
    }
}

/// One row of `GET /nearby`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyView {
    /// Callsign, or hex id when the aircraft has none
    pub flight: String,
    pub dist: f64,
    /// Feet, as reported
    pub alt: f64,
    pub seen: f64,
}

impl From<&NearbyEntry> for NearbyView {
    fn from(entry: &NearbyEntry) -> Self {
        Self {
            flight: entry.label.clone(),
            dist: round1(entry.distance_km),
            alt: entry.altitude_ft,
            seen: entry.seen_secs,
        }
    }
}
