use anyhow::{Context, Result};
use std::time::Instant;
use tracing::info;

use skytrack::config::TrackerConfig;
use skytrack::device::SerialDevice;
use skytrack::dispatcher::CommandDispatcher;

/// Send a single pointing command, for calibrating the mount
pub async fn handle_point(config: TrackerConfig, pan: f64, tilt: f64) -> Result<()> {
    let device = SerialDevice::open(&config.device.port, config.device.baud_rate)
        .context("Failed to open pointing device")?;
    let mut dispatcher = CommandDispatcher::new(Some(Box::new(device)), &config.device);

    let command = dispatcher
        .send_now(pan, tilt, Instant::now())
        .await
        .context("Failed to send pointing command")?;

    if command.pan != pan || command.tilt != tilt {
        info!(
            "Requested pan {:.1}, tilt {:.1} was clamped to the mount's travel",
            pan, tilt
        );
    }
    println!("{}", command.encode().trim_end());
    Ok(())
}
