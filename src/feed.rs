//! Client for the `aircraft.json` traffic feed served by dump1090/readsb.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::FeedConfig;
use crate::errors::FeedError;

/// Fix-age assumed when the feed omits `seen_pos`; large enough to fail
/// every freshness gate
pub const DEFAULT_SEEN_POS_SECS: f64 = 9999.0;

/// One aircraft entry from a single feed poll
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawReport")]
pub struct AircraftReport {
    /// ICAO 24-bit address, the identity used to keep a lock across polls
    pub hex: String,
    /// Callsign, trimmed of the feed's space padding
    pub flight: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Barometric altitude in feet, from `altitude` (dump1090) or `alt_baro`
    /// (readsb). `"ground"` and other non-numeric values are treated as
    /// missing.
    pub altitude: Option<f64>,
    /// Seconds since the last position update
    pub seen_pos: f64,
}

/// Entry as it appears on the wire. Newer feeds may carry both altitude keys.
#[derive(Debug, Deserialize)]
struct RawReport {
    hex: String,
    #[serde(default, deserialize_with = "deserialize_callsign")]
    flight: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_altitude")]
    altitude: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_altitude")]
    alt_baro: Option<f64>,
    #[serde(default = "default_seen_pos")]
    seen_pos: f64,
}

impl From<RawReport> for AircraftReport {
    fn from(raw: RawReport) -> Self {
        Self {
            hex: raw.hex,
            flight: raw.flight,
            lat: raw.lat,
            lon: raw.lon,
            altitude: raw.altitude.or(raw.alt_baro),
            seen_pos: raw.seen_pos,
        }
    }
}

/// Position fields of a report, present only when all three are known
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportPosition {
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: f64,
}

impl AircraftReport {
    /// Label shown to humans: callsign if known, otherwise the hex id
    pub fn label(&self) -> &str {
        self.flight.as_deref().unwrap_or(&self.hex)
    }

    pub fn position(&self) -> Option<ReportPosition> {
        Some(ReportPosition {
            lat: self.lat?,
            lon: self.lon?,
            altitude_ft: self.altitude?,
        })
    }
}

fn default_seen_pos() -> f64 {
    DEFAULT_SEEN_POS_SECS
}

fn deserialize_callsign<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

fn deserialize_altitude<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|v| v.as_f64()))
}

#[derive(Debug, Deserialize)]
struct FeedDocument {
    #[serde(default)]
    aircraft: Vec<serde_json::Value>,
}

/// Decode a feed body into reports.
///
/// A body that is not a JSON object is an error for the whole poll. Single
/// entries that do not decode (no `hex`, wrong types) are dropped.
pub fn parse_feed(body: &[u8]) -> Result<Vec<AircraftReport>, FeedError> {
    let document: FeedDocument = serde_json::from_slice(body)?;
    let total = document.aircraft.len();

    let reports: Vec<AircraftReport> = document
        .aircraft
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<AircraftReport>(entry) {
            Ok(report) => Some(report),
            Err(e) => {
                trace!("Skipping undecodable aircraft entry: {}", e);
                None
            }
        })
        .collect();

    if reports.len() != total {
        debug!("Decoded {} of {} aircraft entries", reports.len(), total);
    }

    Ok(reports)
}

/// Anything that can produce the current aircraft list
#[async_trait]
pub trait AircraftSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<AircraftReport>, FeedError>;
}

/// HTTP client for the traffic feed with a bounded request timeout
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    url: String,
}

impl FeedClient {
    pub fn new(config: &FeedConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.timeout_secs))
            .user_agent(concat!("skytrack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AircraftSource for FeedClient {
    /// Fetch and decode the current aircraft list
    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<AircraftReport>, FeedError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FeedError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        trace!("Received {} byte feed document", body.len());
        parse_feed(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dump1090_document() {
        let body = br#"{
            "now": 1700000000.1,
            "messages": 1234,
            "aircraft": [
                {"hex": "e48c1a", "flight": "GLO1234 ", "lat": -23.5, "lon": -46.6,
                 "altitude": 4500, "seen_pos": 1.2, "speed": 210},
                {"hex": "a1b2c3", "altitude": 35000, "seen": 0.4}
            ]
        }"#;

        let reports = parse_feed(body).unwrap();
        assert_eq!(reports.len(), 2);

        let first = &reports[0];
        assert_eq!(first.hex, "e48c1a");
        assert_eq!(first.flight.as_deref(), Some("GLO1234"));
        assert_eq!(first.label(), "GLO1234");
        assert_eq!(
            first.position(),
            Some(ReportPosition {
                lat: -23.5,
                lon: -46.6,
                altitude_ft: 4500.0
            })
        );

        let second = &reports[1];
        assert_eq!(second.label(), "a1b2c3");
        assert_eq!(second.seen_pos, DEFAULT_SEEN_POS_SECS);
        assert!(second.position().is_none());
    }

    #[test]
    fn test_parse_readsb_alt_baro() {
        let body = br#"{"aircraft": [
            {"hex": "4ca7b5", "lat": 53.4, "lon": -6.2, "alt_baro": 2800, "seen_pos": 0.3},
            {"hex": "4ca7b6", "lat": 53.4, "lon": -6.3, "alt_baro": "ground", "seen_pos": 0.3}
        ]}"#;

        let reports = parse_feed(body).unwrap();
        assert_eq!(reports[0].altitude, Some(2800.0));
        assert_eq!(reports[1].altitude, None);
        assert!(reports[1].position().is_none());
    }

    #[test]
    fn test_both_altitude_keys_keep_entry() {
        let body = br#"{"aircraft": [
            {"hex": "e48c1a", "lat": 0.0, "lon": 0.1, "altitude": 3000, "alt_baro": 3000, "seen_pos": 0.5},
            {"hex": "e48c1b", "lat": 0.0, "lon": 0.1, "altitude": "ground", "alt_baro": 1200, "seen_pos": 0.5}
        ]}"#;

        let reports = parse_feed(body).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].altitude, Some(3000.0));
        assert!(reports[0].position().is_some());
        assert_eq!(reports[1].altitude, Some(1200.0));
    }

    #[test]
    fn test_blank_callsign_falls_back_to_hex() {
        let body = br#"{"aircraft": [{"hex": "abc123", "flight": "        "}]}"#;
        let reports = parse_feed(body).unwrap();
        assert_eq!(reports[0].flight, None);
        assert_eq!(reports[0].label(), "abc123");
    }

    #[test]
    fn test_bad_entries_are_dropped_not_fatal() {
        let body = br#"{"aircraft": [
            {"flight": "NOHEX"},
            {"hex": "ok0001", "lat": "not-a-number"},
            {"hex": "ok0002", "lat": 1.0, "lon": 2.0, "altitude": 100}
        ]}"#;

        let reports = parse_feed(body).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].hex, "ok0002");
    }

    #[test]
    fn test_missing_aircraft_key_is_empty() {
        let reports = parse_feed(br#"{"now": 1.0}"#).unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn test_malformed_body_is_error() {
        let err = parse_feed(b"<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, FeedError::Malformed(_)));
    }

    async fn serve(router: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/aircraft.json", addr)
    }

    fn client(url: String, timeout_secs: f64) -> FeedClient {
        FeedClient::new(&FeedConfig {
            url,
            timeout_secs,
            ..FeedConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_decodes_feed() {
        let router = axum::Router::new().route(
            "/aircraft.json",
            axum::routing::get(|| async {
                r#"{"aircraft": [{"hex": "e48c1a", "flight": "GLO1234 ", "lat": 0.0, "lon": 0.05, "altitude": 3000, "seen_pos": 0.4}]}"#
            }),
        );
        let feed = client(serve(router).await, 2.0);

        let reports = feed.fetch().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].label(), "GLO1234");
    }

    #[tokio::test]
    async fn test_fetch_non_200_is_status_error() {
        let router = axum::Router::new().route(
            "/aircraft.json",
            axum::routing::get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let feed = client(serve(router).await, 2.0);

        let err = feed.fetch().await.unwrap_err();
        assert!(matches!(err, FeedError::Status(503)), "got {err:?}");
        assert_eq!(err.kind(), "status");
    }

    #[tokio::test]
    async fn test_fetch_hanging_feed_times_out() {
        let router = axum::Router::new().route(
            "/aircraft.json",
            axum::routing::get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "{}"
            }),
        );
        let feed = client(serve(router).await, 0.2);

        let started = std::time::Instant::now();
        let err = feed.fetch().await.unwrap_err();
        assert!(matches!(err, FeedError::Request(_)), "got {err:?}");
        assert_eq!(err.kind(), "timeout");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
