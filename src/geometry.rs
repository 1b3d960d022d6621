//! Observer-relative geometry for pointing the mount.
//!
//! Distances use the haversine formula. The azimuth is a planar angle over
//! raw degree differences, not a true spherical bearing, and is only
//! accurate at the short ranges the tracker works at.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Conversion factor from feet (feed altitudes) to meters
pub const FEET_TO_METERS: f64 = 0.3048;

/// Fixed position of the camera mount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level
    pub altitude_m: f64,
}

/// Where the mount has to look to see an aircraft
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    /// Degrees in [0, 360)
    pub azimuth: f64,
    /// Degrees in [0, tilt_max]
    pub elevation: f64,
    pub distance_km: f64,
}

/// Great-circle distance in kilometers from the observer to a point
pub fn great_circle_distance_km(observer: &Observer, lat: f64, lon: f64) -> f64 {
    let lat1_rad = observer.latitude.to_radians();
    let lat2_rad = lat.to_radians();
    let delta_lat = (lat - observer.latitude).to_radians();
    let delta_lon = (lon - observer.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Azimuth, elevation and distance from the observer to a point at `alt_m`
/// meters above sea level. Elevation never goes below the horizon.
pub fn bearing_elevation(
    observer: &Observer,
    lat: f64,
    lon: f64,
    alt_m: f64,
    tilt_max: f64,
) -> LookAngles {
    let distance_km = great_circle_distance_km(observer, lat, lon);
    let distance_m = distance_km * 1000.0;
    let delta_alt = alt_m - observer.altitude_m;

    let azimuth = normalize_azimuth(
        (lon - observer.longitude)
            .to_radians()
            .atan2((lat - observer.latitude).to_radians())
            .to_degrees(),
    );

    // atan2(dz, 0) is +/-90 or 0, so the overhead case stays finite
    let elevation = delta_alt.atan2(distance_m).to_degrees().clamp(0.0, tilt_max);

    LookAngles {
        azimuth,
        elevation,
        distance_km,
    }
}

/// Map any angle in degrees into [0, 360)
fn normalize_azimuth(degrees: f64) -> f64 {
    let az = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if az >= 360.0 { 0.0 } else { az }
}
