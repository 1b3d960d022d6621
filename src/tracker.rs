//! The long-lived poll cycle tying the feed, the lock logic, the mount and
//! the status snapshot together.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::TrackerConfig;
use crate::dispatcher::CommandDispatcher;
use crate::errors::CycleError;
use crate::events::{EventSinks, TrackEvent};
use crate::feed::AircraftSource;
use crate::selector::TargetSelector;
use crate::status::{StatusPublisher, StatusReader};
use crate::tracking::{LockState, TrackingStateMachine};

/// How a completed cycle left the lock, which decides the next wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Tracking,
    Idle,
}

#[derive(Debug, Clone, Copy)]
struct LoopTimings {
    poll_interval: Duration,
    retry_delay: Duration,
    idle_delay: Duration,
}

#[derive(Debug, Clone, Copy)]
struct HomePosition {
    pan: f64,
    tilt: f64,
    homing_delay: Duration,
    settle_delay: Duration,
}

pub struct Tracker<S> {
    source: S,
    machine: TrackingStateMachine,
    dispatcher: CommandDispatcher,
    status: StatusPublisher,
    events: EventSinks,
    timings: LoopTimings,
    home: HomePosition,
}

impl<S: AircraftSource> Tracker<S> {
    pub fn new(
        source: S,
        config: &TrackerConfig,
        dispatcher: CommandDispatcher,
        events: EventSinks,
    ) -> Self {
        let selector = TargetSelector::new(
            config.observer.observer(),
            config.tracking.clone(),
            config.display.clone(),
        );

        Self {
            source,
            machine: TrackingStateMachine::new(selector, dispatcher.tilt_max()),
            dispatcher,
            status: StatusPublisher::new(),
            events,
            timings: LoopTimings {
                poll_interval: config.feed.poll_interval(),
                retry_delay: config.feed.retry_delay(),
                idle_delay: config.feed.idle_delay(),
            },
            home: HomePosition {
                pan: config.device.home_pan,
                tilt: config.device.home_tilt,
                homing_delay: config.device.homing_delay(),
                settle_delay: config.device.settle_delay(),
            },
        }
    }

    /// Read handle for the dashboard
    pub fn reader(&self) -> StatusReader {
        self.status.reader()
    }

    pub fn lock_state(&self) -> &LockState {
        self.machine.state()
    }

    /// One poll: fetch, revalidate or reselect, publish, maybe point.
    ///
    /// The nearby list is published before the device is touched, so a
    /// failed write still leaves the dashboard current.
    pub async fn run_cycle(&mut self, now: Instant) -> Result<CycleState, CycleError> {
        let reports = match self.source.fetch().await {
            Ok(reports) => {
                metrics::counter!("tracker.feed.fetched").increment(1);
                reports
            }
            Err(e) => {
                metrics::counter!("tracker.feed.failed", "kind" => e.kind()).increment(1);
                return Err(e.into());
            }
        };

        let outcome = self.machine.step(&reports);

        if let Some(event) = &outcome.event {
            self.events.dispatch(event);
            if let TrackEvent::TargetLost { .. } = event {
                self.status.clear_target().await;
            }
        }

        self.status.publish_nearby(outcome.nearby).await;

        let Some(target) = outcome.target else {
            return Ok(CycleState::Idle);
        };

        self.dispatcher
            .maybe_send(&target.angles, &target.label, now, &self.status)
            .await?;

        Ok(CycleState::Tracking)
    }

    /// Move the mount to its home position: wait for the controller to boot,
    /// send the home command, then let the mount settle. Skipped without a
    /// device. Returns `false` if cancelled while waiting.
    pub async fn home(&mut self, cancel: &CancellationToken) -> bool {
        if !self.dispatcher.has_device() {
            debug!("No pointing device, skipping homing");
            return true;
        }

        info!(
            "Homing to pan {:.1}, tilt {:.1} in {:?}",
            self.home.pan, self.home.tilt, self.home.homing_delay
        );
        if !wait_or_cancel(cancel, self.home.homing_delay).await {
            return false;
        }

        if let Err(e) = self
            .dispatcher
            .send_now(self.home.pan, self.home.tilt, Instant::now())
            .await
        {
            error!("Failed to send home command: {}", e);
        }

        wait_or_cancel(cancel, self.home.settle_delay).await
    }

    /// Run until `cancel` fires. Cancellation is observed only between
    /// cycles and in waits, so a command that started writing completes.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Tracker starting");

        if !self.home(&cancel).await {
            info!("Tracker cancelled during homing");
            return;
        }

        while !cancel.is_cancelled() {
            let started = Instant::now();

            let delay = match self.run_cycle(started).await {
                Ok(CycleState::Tracking) => self.timings.poll_interval,
                Ok(CycleState::Idle) => self.timings.idle_delay,
                Err(CycleError::Feed(e)) => {
                    warn!("Feed poll failed: {}", e);
                    self.timings.retry_delay
                }
                Err(CycleError::Device(e)) => {
                    error!("Pointing command failed: {}", e);
                    self.timings.retry_delay
                }
            };

            metrics::histogram!("tracker.cycle.duration_ms")
                .record(started.elapsed().as_secs_f64() * 1000.0);

            if !wait_or_cancel(&cancel, delay).await {
                break;
            }
        }

        info!("Tracker stopped");
    }
}

/// Sleep for `delay`; `false` if cancelled first
async fn wait_or_cancel(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
