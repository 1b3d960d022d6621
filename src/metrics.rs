use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder, once per process.
/// Returns a handle that can be used to render metrics for scraping
pub fn init_metrics() -> Result<PrometheusHandle> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Ok(handle.clone());
    }

    // Buckets: 1ms .. 10s, a cycle is dominated by the feed request
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("tracker.cycle.duration_ms".to_string()),
            &[
                1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
            ],
        )
        .context("Failed to set buckets for tracker.cycle.duration_ms")?
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    Ok(METRICS_HANDLE.get_or_init(|| handle).clone())
}

/// Background task to update process metrics
/// Updates uptime and memory usage metrics every 5 seconds
pub async fn process_metrics_task(cancel: CancellationToken) {
    let start_time = Instant::now();

    loop {
        metrics::gauge!("process.uptime.seconds").set(start_time.elapsed().as_secs() as f64);
        metrics::gauge!("process.is_up").set(1.0);

        #[cfg(target_os = "linux")]
        {
            if let Ok(status) = std::fs::read_to_string("/proc/self/status")
                && let Some(line) = status.lines().find(|line| line.starts_with("VmRSS:"))
                && let Some(kb_str) = line.split_whitespace().nth(1)
                && let Ok(kb) = kb_str.parse::<f64>()
            {
                metrics::gauge!("process.memory.bytes").set(kb * 1024.0);
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(5)) => {}
        }
    }
}

/// Initialize tracker metrics to zero/default values
/// This ensures metrics always appear in Prometheus queries even if no events have occurred
pub fn initialize_tracker_metrics() {
    // Feed polling
    metrics::counter!("tracker.feed.fetched").absolute(0);
    for kind in ["timeout", "request", "status", "malformed"] {
        metrics::counter!("tracker.feed.failed", "kind" => kind).absolute(0);
    }

    // Lock changes
    metrics::counter!("tracker.target.acquired").absolute(0);
    metrics::counter!("tracker.target.lost").absolute(0);
    metrics::gauge!("tracker.locked").set(0.0);
    metrics::gauge!("tracker.nearby.count").set(0.0);

    // Pointing commands
    metrics::counter!("tracker.commands.sent").absolute(0);
    metrics::counter!("tracker.commands.failed").absolute(0);
    metrics::counter!("tracker.commands.rate_limited").absolute(0);
    metrics::gauge!("tracker.device.connected").set(0.0);

    // Dashboard
    metrics::counter!("dashboard.requests").absolute(0);
}
