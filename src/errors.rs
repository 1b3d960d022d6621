//! Error types for the two external collaborators the tracker talks to.
//!
//! Feed and device failures are recoverable at the cycle level, so they are
//! kept as typed values the tracker loop can match on. Everything around
//! startup and configuration uses `anyhow`.

use thiserror::Error;

/// Failure to obtain a usable aircraft list from the traffic feed
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network failure, DNS failure or request timeout
    #[error("feed request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Feed answered with something other than 200 OK
    #[error("feed returned HTTP {0}")]
    Status(u16),

    /// Body was not a valid aircraft document
    #[error("malformed feed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl FeedError {
    /// Short label used as a metrics/log dimension
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Request(e) if e.is_timeout() => "timeout",
            FeedError::Request(_) => "request",
            FeedError::Status(_) => "status",
            FeedError::Malformed(_) => "malformed",
        }
    }
}

/// Failure talking to the pointing device
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to open serial port {port} at {baud_rate} baud: {source}")]
    Open {
        port: String,
        baud_rate: u32,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("write to pointing device failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Why a tracker cycle ended early
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}
