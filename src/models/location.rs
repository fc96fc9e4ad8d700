//! Location model for geographic coordinates and labelled points

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::WayGoError;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GeoPosition {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl GeoPosition {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a position, rejecting out-of-range or non-finite coordinates
    pub fn checked(latitude: f64, longitude: f64) -> crate::Result<Self> {
        let position = Self::new(latitude, longitude);
        position.validate()?;
        Ok(position)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(WayGoError::validation(format!(
                "latitude {} is outside [-90, 90]",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(WayGoError::validation(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }

    /// Great-circle distance in kilometers (Haversine, Earth radius 6371 km)
    #[must_use]
    pub fn distance_km(&self, other: &GeoPosition) -> f64 {
        haversine::distance(
            haversine::Location {
                latitude: self.latitude,
                longitude: self.longitude,
            },
            haversine::Location {
                latitude: other.latitude,
                longitude: other.longitude,
            },
            haversine::Units::Kilometers,
        )
    }

    /// `lat,lng` as used in provider query strings and map links
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }
}

/// A labelled point of a route: origin, destination or waypoint location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PointOfInterest {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    #[serde(rename = "nom")]
    pub name: String,
}

impl PointOfInterest {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn position(&self) -> GeoPosition {
        GeoPosition::new(self.latitude, self.longitude)
    }
}

/// Intermediate stop along a route
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Waypoint {
    pub location: PointOfInterest,
    #[serde(default = "default_stopover")]
    pub stopover: bool,
}

fn default_stopover() -> bool {
    true
}

/// A position reported by a geolocation source at a given instant
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PositionFix {
    pub position: GeoPosition,
    pub captured_at: DateTime<Utc>,
}

impl PositionFix {
    #[must_use]
    pub fn now(position: GeoPosition) -> Self {
        Self {
            position,
            captured_at: Utc::now(),
        }
    }

    /// True when the fix is older than `max_age` relative to `now`
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now.signed_duration_since(self.captured_at) > max_age
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paris_lyon_distance() {
        let paris = GeoPosition::new(48.8566, 2.3522);
        let lyon = GeoPosition::new(45.75, 4.85);
        let km = paris.distance_km(&lyon);
        assert!((km - 392.0).abs() < 5.0, "got {km}");
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = GeoPosition::new(48.8606, 2.3376);
        assert!(p.distance_km(&p).abs() < 1e-9);
    }

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert!(GeoPosition::checked(91.0, 0.0).is_err());
        assert!(GeoPosition::checked(0.0, -181.0).is_err());
        assert!(GeoPosition::checked(f64::NAN, 0.0).is_err());
        assert!(GeoPosition::checked(48.85, 2.35).is_ok());
    }

    #[test]
    fn test_point_of_interest_uses_source_field_names() {
        let json = r#"{"lat": 48.8606, "lng": 2.3376, "nom": "Louvre"}"#;
        let poi: PointOfInterest = serde_json::from_str(json).unwrap();
        assert_eq!(poi.name, "Louvre");
        assert_eq!(poi.position(), GeoPosition::new(48.8606, 2.3376));
    }

    #[test]
    fn test_fix_staleness() {
        let fix = PositionFix::now(GeoPosition::new(0.0, 0.0));
        let later = fix.captured_at + chrono::Duration::seconds(30);
        assert!(fix.is_stale(later, chrono::Duration::seconds(10)));
        assert!(!fix.is_stale(fix.captured_at, chrono::Duration::seconds(10)));
    }
}
