//! Rate-limited pointing command output.
//!
//! The tracker polls much faster than the mount can usefully move, so at
//! most one command goes out per send interval. The snapshot's pointing
//! fields are published only when a command actually goes out.

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::DeviceConfig;
use crate::device::PointingDevice;
use crate::errors::DeviceError;
use crate::geometry::LookAngles;
use crate::status::{Pointing, StatusPublisher};

/// Pan/tilt pair clamped to the mount's travel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointingCommand {
    pub pan: f64,
    pub tilt: f64,
}

impl PointingCommand {
    /// Clamp raw angles into `[0, pan_max]` and `[0, tilt_max]`. NaN maps
    /// to 0.
    pub fn clamped(pan: f64, tilt: f64, pan_max: f64, tilt_max: f64) -> Self {
        Self {
            pan: clamp_axis(pan, pan_max),
            tilt: clamp_axis(tilt, tilt_max),
        }
    }

    /// Wire form understood by the mount firmware: `p:<pan>,t:<tilt>\n`
    pub fn encode(&self) -> String {
        format!("p:{:.1},t:{:.1}\n", self.pan, self.tilt)
    }
}

fn clamp_axis(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

/// What `maybe_send` did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchOutcome {
    /// Written to the device and published
    Sent(PointingCommand),
    /// No device attached; published to the snapshot only
    Published(PointingCommand),
    /// Too soon after the previous command
    RateLimited,
}

pub struct CommandDispatcher {
    device: Option<Box<dyn PointingDevice>>,
    send_interval: Duration,
    pan_max: f64,
    tilt_max: f64,
    last_sent: Option<Instant>,
}

impl CommandDispatcher {
    pub fn new(device: Option<Box<dyn PointingDevice>>, config: &DeviceConfig) -> Self {
        Self {
            device,
            send_interval: config.send_interval(),
            pan_max: config.pan_max,
            tilt_max: config.tilt_max,
            last_sent: None,
        }
    }

    /// Dispatcher with no hardware attached
    pub fn status_only(config: &DeviceConfig) -> Self {
        Self::new(None, config)
    }

    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    pub fn tilt_max(&self) -> f64 {
        self.tilt_max
    }

    /// Send a command for `angles` unless one went out less than a send
    /// interval before `now`. On a device error nothing is published and the
    /// next call may try again immediately.
    pub async fn maybe_send(
        &mut self,
        angles: &LookAngles,
        target_label: &str,
        now: Instant,
        status: &StatusPublisher,
    ) -> Result<DispatchOutcome, DeviceError> {
        if let Some(last) = self.last_sent
            && now.saturating_duration_since(last) < self.send_interval
        {
            metrics::counter!("tracker.commands.rate_limited").increment(1);
            return Ok(DispatchOutcome::RateLimited);
        }

        let command =
            PointingCommand::clamped(angles.azimuth, angles.elevation, self.pan_max, self.tilt_max);
        let written = self.write(&command).await?;
        self.last_sent = Some(now);

        status
            .publish_pointing(Pointing {
                azimuth: angles.azimuth,
                elevation: angles.elevation,
                distance_km: angles.distance_km,
                target: Some(target_label.to_string()),
            })
            .await;

        debug!(
            "{} (Dist: {:.1} km) (Target: {})",
            command.encode().trim_end(),
            angles.distance_km,
            target_label
        );

        Ok(if written {
            DispatchOutcome::Sent(command)
        } else {
            DispatchOutcome::Published(command)
        })
    }

    /// Send a command right away, ignoring the rate limit. Used for the
    /// home position at startup and for manual pointing.
    pub async fn send_now(
        &mut self,
        pan: f64,
        tilt: f64,
        now: Instant,
    ) -> Result<PointingCommand, DeviceError> {
        let command = PointingCommand::clamped(pan, tilt, self.pan_max, self.tilt_max);
        if self.write(&command).await? {
            info!("Sent {}", command.encode().trim_end());
        }
        self.last_sent = Some(now);
        Ok(command)
    }

    /// Returns whether the command reached a device
    async fn write(&mut self, command: &PointingCommand) -> Result<bool, DeviceError> {
        let Some(device) = self.device.as_mut() else {
            return Ok(false);
        };

        match device.send_line(&command.encode()).await {
            Ok(()) => {
                metrics::counter!("tracker.commands.sent").increment(1);
                Ok(true)
            }
            Err(e) => {
                metrics::counter!("tracker.commands.failed").increment(1);
                Err(e)
            }
        }
    }
}
