use anyhow::{Context, Result};

use skytrack::config::TrackerConfig;
use skytrack::feed::{AircraftSource, FeedClient};
use skytrack::selector::TargetSelector;

/// One feed poll, printed as the dashboard would show it plus the aircraft
/// the tracker would lock on to
pub async fn handle_scan(config: TrackerConfig) -> Result<()> {
    let feed = FeedClient::new(&config.feed)?;
    let reports = feed
        .fetch()
        .await
        .with_context(|| format!("Failed to poll {}", feed.url()))?;

    let selector = TargetSelector::new(
        config.observer.observer(),
        config.tracking.clone(),
        config.display.clone(),
    );
    let selection = selector.select(&reports);

    println!("{} aircraft in feed", reports.len());
    println!();
    println!(
        "{:<10} {:<8} {:>9} {:>9} {:>7}",
        "FLIGHT", "HEX", "DIST km", "ALT ft", "SEEN s"
    );
    for entry in &selection.nearby {
        println!(
            "{:<10} {:<8} {:>9.1} {:>9.0} {:>7.1}",
            entry.label, entry.hex, entry.distance_km, entry.altitude_ft, entry.seen_secs
        );
    }
    println!();

    let target = selection.candidate.and_then(|candidate| {
        selector
            .look_angles(candidate, config.device.tilt_max)
            .map(|angles| (candidate, angles))
    });

    match target {
        Some((candidate, angles)) => println!(
            "Target: {} ({}) az {:.1} el {:.1} dist {:.1} km",
            candidate.label(),
            candidate.hex,
            angles.azimuth,
            angles.elevation,
            angles.distance_km
        ),
        None => println!("Target: none within tracking limits"),
    }

    Ok(())
}
