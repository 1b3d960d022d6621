//! Ranking of one feed poll into a tracking candidate and a nearby list.
//!
//! Everything here is a pure function of the report list and the configured
//! limits, so repeated calls on the same input give the same answer.

use serde::Serialize;

use crate::config::{DisplayLimits, TrackingLimits};
use crate::feed::{AircraftReport, ReportPosition};
use crate::geometry::{
    FEET_TO_METERS, LookAngles, Observer, bearing_elevation, great_circle_distance_km,
};

/// One row of the nearby-traffic list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyEntry {
    pub hex: String,
    /// Callsign, or hex when the aircraft has not sent one
    pub label: String,
    pub distance_km: f64,
    pub altitude_ft: f64,
    pub seen_secs: f64,
}

/// Result of ranking one poll
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    /// Nearest eligible aircraft, if any
    pub candidate: Option<&'a AircraftReport>,
    /// Nearby list, ascending by distance and capped
    pub nearby: Vec<NearbyEntry>,
}

#[derive(Debug, Clone)]
pub struct TargetSelector {
    observer: Observer,
    tracking: TrackingLimits,
    display: DisplayLimits,
}

impl TargetSelector {
    pub fn new(observer: Observer, tracking: TrackingLimits, display: DisplayLimits) -> Self {
        Self {
            observer,
            tracking,
            display,
        }
    }

    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// Rank a full poll: nearby list plus the nearest candidate
    pub fn select<'a>(&self, reports: &'a [AircraftReport]) -> Selection<'a> {
        Selection {
            candidate: self.best_candidate(reports),
            nearby: self.nearby(reports),
        }
    }

    /// Build the informational list shown on the dashboard
    pub fn nearby(&self, reports: &[AircraftReport]) -> Vec<NearbyEntry> {
        let limits = &self.display;
        let mut entries: Vec<NearbyEntry> = self
            .located(reports)
            .filter(|(report, position, distance_km)| {
                report.seen_pos < limits.max_fix_age_secs
                    && position.altitude_ft <= limits.max_altitude_ft
                    && *distance_km <= limits.max_distance_km
            })
            .map(|(report, position, distance_km)| NearbyEntry {
                hex: report.hex.clone(),
                label: report.label().to_string(),
                distance_km,
                altitude_ft: position.altitude_ft,
                seen_secs: report.seen_pos,
            })
            .collect();

        // Stable, so equal distances keep feed order
        entries.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        entries.truncate(limits.max_entries);
        entries
    }

    /// Nearest aircraft passing the tracking filters. On equal distance the
    /// one listed first in the feed wins.
    pub fn best_candidate<'a>(&self, reports: &'a [AircraftReport]) -> Option<&'a AircraftReport> {
        let mut best: Option<(&AircraftReport, f64)> = None;

        for (report, position, distance_km) in self.located(reports) {
            if report.seen_pos >= self.tracking.max_fix_age_secs
                || !self.within_tracking_envelope(&position, distance_km)
            {
                continue;
            }
            match best {
                Some((_, best_distance)) if best_distance <= distance_km => {}
                _ => best = Some((report, distance_km)),
            }
        }

        best.map(|(report, _)| report)
    }

    /// Whether a locked aircraft may keep the lock. The freshness bound is
    /// inclusive here, unlike for new candidates.
    pub fn can_retain(&self, report: &AircraftReport) -> bool {
        let Some(position) = report.position() else {
            return false;
        };
        if report.seen_pos > self.tracking.max_fix_age_secs {
            return false;
        }
        let distance_km = great_circle_distance_km(&self.observer, position.lat, position.lon);
        self.within_tracking_envelope(&position, distance_km)
    }

    /// Pointing solution for a report, if it carries a position
    pub fn look_angles(&self, report: &AircraftReport, tilt_max: f64) -> Option<LookAngles> {
        let position = report.position()?;
        Some(bearing_elevation(
            &self.observer,
            position.lat,
            position.lon,
            position.altitude_ft * FEET_TO_METERS,
            tilt_max,
        ))
    }

    fn within_tracking_envelope(&self, position: &ReportPosition, distance_km: f64) -> bool {
        position.altitude_ft <= self.tracking.max_altitude_ft
            && distance_km <= self.tracking.max_distance_km
    }

    /// Reports that carry a full position, with their distance
    fn located<'r>(
        &self,
        reports: &'r [AircraftReport],
    ) -> impl Iterator<Item = (&'r AircraftReport, ReportPosition, f64)> {
        reports.iter().filter_map(move |report| {
            let position = report.position()?;
            let distance_km = great_circle_distance_km(&self.observer, position.lat, position.lon);
            Some((report, position, distance_km))
        })
    }
}
