//! Serial link to the pan/tilt mount controller.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{info, warn};

use crate::config::DeviceConfig;
use crate::errors::DeviceError;

/// Something that accepts newline-framed pointing commands
#[async_trait]
pub trait PointingDevice: Send {
    /// Write one complete line, including its terminator
    async fn send_line(&mut self, line: &str) -> Result<(), DeviceError>;

    /// Human readable name for logs
    fn describe(&self) -> String;
}

/// Mount controller on a serial port.
///
/// After a failed write the port is closed and reopened on the next write,
/// so a controller that was unplugged and plugged back in recovers without a
/// restart.
pub struct SerialDevice {
    port: String,
    baud_rate: u32,
    stream: Option<SerialStream>,
}

impl SerialDevice {
    /// Open the port. Fails if the port does not exist or is busy.
    pub fn open(port: &str, baud_rate: u32) -> Result<Self, DeviceError> {
        let stream = open_stream(port, baud_rate)?;
        info!("Connected to serial port {} at {} baud", port, baud_rate);
        metrics::gauge!("tracker.device.connected").set(1.0);

        Ok(Self {
            port: port.to_string(),
            baud_rate,
            stream: Some(stream),
        })
    }
}

/// Open the configured serial port.
///
/// A port that cannot be opened is fatal only when `required` is set;
/// otherwise the tracker runs without hardware and `None` is returned.
pub fn open_configured(config: &DeviceConfig) -> anyhow::Result<Option<Box<dyn PointingDevice>>> {
    match SerialDevice::open(&config.port, config.baud_rate) {
        Ok(device) => Ok(Some(Box::new(device))),
        Err(e) if config.required => {
            Err(anyhow::Error::new(e).context("Pointing device is required but unavailable"))
        }
        Err(e) => {
            warn!("{}; continuing in status-only mode", e);
            metrics::gauge!("tracker.device.connected").set(0.0);
            Ok(None)
        }
    }
}

fn open_stream(port: &str, baud_rate: u32) -> Result<SerialStream, DeviceError> {
    tokio_serial::new(port, baud_rate)
        .timeout(Duration::from_secs(1))
        .open_native_async()
        .map_err(|source| DeviceError::Open {
            port: port.to_string(),
            baud_rate,
            source,
        })
}

#[async_trait]
impl PointingDevice for SerialDevice {
    async fn send_line(&mut self, line: &str) -> Result<(), DeviceError> {
        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => {
                info!("Reopening serial port {}", self.port);
                let stream = open_stream(&self.port, self.baud_rate)?;
                metrics::gauge!("tracker.device.connected").set(1.0);
                stream
            }
        };

        let result = async {
            stream.write_all(line.as_bytes()).await?;
            stream.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                self.stream = Some(stream);
                Ok(())
            }
            Err(e) => {
                // Port stays closed until the next command
                warn!("Write to {} failed: {}", self.port, e);
                metrics::gauge!("tracker.device.connected").set(0.0);
                Err(DeviceError::Write(e))
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.port, self.baud_rate)
    }
}
