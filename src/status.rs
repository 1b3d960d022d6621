//! Status snapshot shared between the tracker loop and the dashboard.
//!
//! The tracker owns the only `StatusPublisher`; the dashboard gets cloned
//! `StatusReader` handles. Each update builds a complete new snapshot and
//! swaps the pointer, so a reader holds either the old snapshot or the new
//! one and never a mix.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::selector::NearbyEntry;

/// Pointing fields, updated whenever a command goes out
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Pointing {
    pub azimuth: f64,
    pub elevation: f64,
    pub distance_km: f64,
    /// Label of the locked aircraft, `None` while idle
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub pointing: Pointing,
    /// Ascending by distance, capped by the display limits
    pub nearby: Vec<NearbyEntry>,
    pub updated_at: DateTime<Utc>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            pointing: Pointing::default(),
            nearby: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

type SharedSnapshot = Arc<RwLock<Arc<StatusSnapshot>>>;

/// Writer side of the snapshot, held only by the tracker loop
#[derive(Debug, Default)]
pub struct StatusPublisher {
    current: SharedSnapshot,
}

impl StatusPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only handle for the dashboard
    pub fn reader(&self) -> StatusReader {
        StatusReader {
            current: self.current.clone(),
        }
    }

    /// Replace the pointing fields with values that were just sent
    pub async fn publish_pointing(&self, pointing: Pointing) {
        self.update(|snapshot| snapshot.pointing = pointing).await;
    }

    /// Replace the nearby list
    pub async fn publish_nearby(&self, nearby: Vec<NearbyEntry>) {
        metrics::gauge!("tracker.nearby.count").set(nearby.len() as f64);
        self.update(|snapshot| snapshot.nearby = nearby).await;
    }

    /// Drop the target label; the last angles stay since the mount holds
    /// its position
    pub async fn clear_target(&self) {
        self.update(|snapshot| snapshot.pointing.target = None).await;
    }

    async fn update(&self, apply: impl FnOnce(&mut StatusSnapshot)) {
        let mut guard = self.current.write().await;
        let mut next = StatusSnapshot::clone(&guard);
        apply(&mut next);
        next.updated_at = Utc::now();
        *guard = Arc::new(next);
    }
}

/// Read-only view of the latest snapshot
#[derive(Debug, Clone)]
pub struct StatusReader {
    current: SharedSnapshot,
}

impl StatusReader {
    /// The latest complete snapshot. Holding it does not block the writer.
    pub async fn snapshot(&self) -> Arc<StatusSnapshot> {
        self.current.read().await.clone()
    }

    pub async fn pointing(&self) -> Pointing {
        self.snapshot().await.pointing.clone()
    }

    pub async fn nearby(&self) -> Vec<NearbyEntry> {
        self.snapshot().await.nearby.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(hex: &str, km: f64) -> NearbyEntry {
        NearbyEntry {
            hex: hex.to_string(),
            label: hex.to_uppercase(),
            distance_km: km,
            altitude_ft: 5000.0,
            seen_secs: 1.0,
        }
    }

    #[tokio::test]
    async fn test_fields_update_independently() {
        let publisher = StatusPublisher::new();
        let reader = publisher.reader();

        publisher
            .publish_pointing(Pointing {
                azimuth: 90.0,
                elevation: 9.0,
                distance_km: 5.6,
                target: Some("GLO1234".to_string()),
            })
            .await;
        publisher.publish_nearby(vec![entry("a", 1.0)]).await;

        let snapshot = reader.snapshot().await;
        assert_eq!(snapshot.pointing.azimuth, 90.0);
        assert_eq!(snapshot.nearby.len(), 1);

        // nearby replaced wholesale, pointing untouched
        publisher
            .publish_nearby(vec![entry("b", 2.0), entry("c", 3.0)])
            .await;
        assert_eq!(reader.pointing().await.target.as_deref(), Some("GLO1234"));
        let hexes: Vec<String> = reader.nearby().await.into_iter().map(|e| e.hex).collect();
        assert_eq!(hexes, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn test_clear_target_keeps_angles() {
        let publisher = StatusPublisher::new();
        publisher
            .publish_pointing(Pointing {
                azimuth: 120.0,
                elevation: 30.0,
                distance_km: 2.0,
                target: Some("TAP101".to_string()),
            })
            .await;
        publisher.clear_target().await;

        let pointing = publisher.reader().pointing().await;
        assert_eq!(pointing.target, None);
        assert_eq!(pointing.azimuth, 120.0);
        assert_eq!(pointing.elevation, 30.0);
    }

    #[tokio::test]
    async fn test_held_snapshot_is_not_mutated() {
        let publisher = StatusPublisher::new();
        let reader = publisher.reader();

        let before = reader.snapshot().await;
        publisher.publish_nearby(vec![entry("a", 1.0)]).await;

        assert!(before.nearby.is_empty());
        assert_eq!(reader.snapshot().await.nearby.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_partial_pointing() {
        let publisher = StatusPublisher::new();
        let reader = publisher.reader();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let reader = reader.clone();
                tokio::spawn(async move {
                    for _ in 0..500 {
                        let p = reader.pointing().await;
                        assert_eq!(p.azimuth, p.elevation);
                        assert_eq!(p.azimuth, p.distance_km);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for i in 0..500 {
            let v = i as f64;
            publisher
                .publish_pointing(Pointing {
                    azimuth: v,
                    elevation: v,
                    distance_km: v,
                    target: None,
                })
                .await;
        }

        for handle in readers {
            handle.await.unwrap();
        }
    }
}
