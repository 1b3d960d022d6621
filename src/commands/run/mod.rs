use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use skytrack::config::TrackerConfig;
use skytrack::device::open_configured;
use skytrack::dispatcher::CommandDispatcher;
use skytrack::events::EventSinks;
use skytrack::feed::FeedClient;
use skytrack::metrics::{init_metrics, initialize_tracker_metrics, process_metrics_task};
use skytrack::tracker::Tracker;
use skytrack::web::{AppState, start_web_server};

mod shutdown;

use shutdown::spawn_shutdown_handler;

pub async fn handle_run(config: TrackerConfig) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "run");
    });

    let metrics_handle = init_metrics()?;
    initialize_tracker_metrics();

    let cancel = CancellationToken::new();
    spawn_shutdown_handler(cancel.clone());
    tokio::spawn(process_metrics_task(cancel.clone()));

    info!(
        "Observer at {:.5}, {:.5} ({:.0} m)",
        config.observer.latitude, config.observer.longitude, config.observer.altitude_m
    );

    let feed = FeedClient::new(&config.feed).context("Failed to create feed client")?;
    info!("Polling traffic feed at {}", feed.url());

    let device = open_configured(&config.device)?;
    match &device {
        Some(device) => info!("Pointing device: {}", device.describe()),
        None => warn!("Running without a pointing device, dashboard only"),
    }

    let dispatcher = CommandDispatcher::new(device, &config.device);
    let events = EventSinks::from_config(&config.events)?;
    let tracker = Tracker::new(feed, &config, dispatcher, events);

    let state = AppState {
        status: tracker.reader(),
        metrics: Some(metrics_handle),
    };

    let tracker_handle = tokio::spawn(tracker.run(cancel.clone()));
    let web_result = start_web_server(&config.dashboard, state, cancel.clone()).await;

    // Stop the tracker too if the dashboard could not start
    cancel.cancel();
    tracker_handle.await.context("Tracker task panicked")?;

    web_result?;
    info!("Shutdown complete");
    Ok(())
}
