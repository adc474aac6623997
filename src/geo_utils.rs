//! # Geographic Utilities
//!
//! Great-circle distance for GPS fixes.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_km`] | Great-circle distance between two coordinate pairs, in kilometers |
//! | [`distance_km`] | Same, between two [`GeoSample`]s |
//! | [`route_length_km`] | Total length of an ordered trace |
//! | [`is_valid_coordinate`] | Range and finiteness check |
//!
//! ## Example
//!
//! ```rust
//! use stride_engine::geo_utils;
//!
//! let d = geo_utils::haversine_km(34.0, -118.0, 34.0001, -118.0).unwrap();
//! assert!((d - 0.0111).abs() < 0.0001);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a spherical Earth (mean radius
//! ~6371 km), accurate to within 0.3% for the short hops a live run produces.
//! Coordinates are WGS84 degrees. Out-of-range input is rejected with
//! [`TrackerError::InvalidCoordinate`] instead of being wrapped or clamped.

use geo::{Distance, Haversine, Point};

use crate::error::{Result, TrackerError};
use crate::GeoSample;

const METERS_PER_KM: f64 = 1000.0;

/// Check that a coordinate pair is finite and inside [-90, 90] / [-180, 180].
#[inline]
pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

fn check(latitude: f64, longitude: f64) -> Result<()> {
    if is_valid_coordinate(latitude, longitude) {
        Ok(())
    } else {
        Err(TrackerError::InvalidCoordinate { latitude, longitude })
    }
}

/// Great-circle distance between two coordinates in kilometers.
///
/// Identical points return exactly 0.0. Either coordinate being out of range
/// is a contract violation and yields [`TrackerError::InvalidCoordinate`].
///
/// # Example
///
/// ```rust
/// use stride_engine::geo_utils::haversine_km;
///
/// let london_paris = haversine_km(51.5074, -0.1278, 48.8566, 2.3522).unwrap();
/// assert!((london_paris - 343.5).abs() < 5.0);
///
/// assert!(haversine_km(95.0, 0.0, 0.0, 0.0).is_err());
/// ```
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> Result<f64> {
    check(lat1, lng1)?;
    check(lat2, lng2)?;

    let point1 = Point::new(lng1, lat1);
    let point2 = Point::new(lng2, lat2);
    Ok(Haversine::distance(point1, point2) / METERS_PER_KM)
}

/// Great-circle distance between two samples in kilometers.
#[inline]
pub fn distance_km(from: &GeoSample, to: &GeoSample) -> Result<f64> {
    haversine_km(from.latitude, from.longitude, to.latitude, to.longitude)
}

/// Total length of an ordered trace in kilometers.
///
/// Empty and single-sample traces have length 0.0.
pub fn route_length_km(route: &[GeoSample]) -> Result<f64> {
    route
        .windows(2)
        .map(|w| distance_km(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================
