//! Lock keeping across feed polls.
//!
//! Each poll first tries to keep the current target; only when that fails
//! is the selector asked for a new one, in the same cycle, so the mount is
//! not left idle for an extra poll after losing an aircraft.

use tracing::{debug, trace};

use crate::events::TrackEvent;
use crate::feed::AircraftReport;
use crate::geometry::LookAngles;
use crate::selector::{NearbyEntry, TargetSelector};

/// The only state carried from one poll to the next
#[derive(Debug, Clone, PartialEq)]
pub enum LockState {
    NoTarget,
    /// `report` is the last revision of the aircraft that passed
    /// revalidation
    Locked { hex: String, report: AircraftReport },
}

/// Target the mount should be pointed at this cycle
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedTarget {
    pub hex: String,
    pub label: String,
    pub angles: LookAngles,
}

/// Everything one poll produced
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub nearby: Vec<NearbyEntry>,
    /// `None` while idle
    pub target: Option<TrackedTarget>,
    /// Set when the lock changed this cycle
    pub event: Option<TrackEvent>,
}

pub struct TrackingStateMachine {
    selector: TargetSelector,
    tilt_max: f64,
    state: LockState,
}

impl TrackingStateMachine {
    pub fn new(selector: TargetSelector, tilt_max: f64) -> Self {
        Self {
            selector,
            tilt_max,
            state: LockState::NoTarget,
        }
    }

    pub fn state(&self) -> &LockState {
        &self.state
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, LockState::Locked { .. })
    }

    pub fn selector(&self) -> &TargetSelector {
        &self.selector
    }

    /// Evaluate one poll: revalidate the lock, reselect if it was lost and
    /// compute where to point.
    pub fn step(&mut self, reports: &[AircraftReport]) -> CycleOutcome {
        let nearby = self.selector.nearby(reports);
        let previous = std::mem::replace(&mut self.state, LockState::NoTarget);

        let retained = match &previous {
            LockState::Locked { hex, .. } => reports
                .iter()
                .find(|report| report.hex == *hex)
                .filter(|report| self.selector.can_retain(report)),
            LockState::NoTarget => None,
        };

        let event = match retained {
            Some(report) => {
                trace!("Keeping lock on {}", report.hex);
                self.state = LockState::Locked {
                    hex: report.hex.clone(),
                    report: report.clone(),
                };
                None
            }
            None => {
                if let LockState::Locked { hex, .. } = &previous {
                    debug!("Lock on {} no longer valid, reselecting", hex);
                }

                match self.selector.best_candidate(reports) {
                    Some(candidate) => {
                        self.state = LockState::Locked {
                            hex: candidate.hex.clone(),
                            report: candidate.clone(),
                        };
                        Some(TrackEvent::TargetAcquired {
                            hex: candidate.hex.clone(),
                            label: candidate.label().to_string(),
                        })
                    }
                    None => match previous {
                        LockState::Locked { hex, report } => Some(TrackEvent::TargetLost {
                            label: report.label().to_string(),
                            hex,
                        }),
                        LockState::NoTarget => None,
                    },
                }
            }
        };

        metrics::gauge!("tracker.locked").set(if self.is_tracking() { 1.0 } else { 0.0 });

        let target = match &self.state {
            LockState::Locked { hex, report } => self
                .selector
                .look_angles(report, self.tilt_max)
                .map(|angles| TrackedTarget {
                    hex: hex.clone(),
                    label: report.label().to_string(),
                    angles,
                }),
            LockState::NoTarget => None,
        };

        CycleOutcome {
            nearby,
            target,
            event,
        }
    }
}
