//! Route directions
//!
//! This module wraps the external directions provider:
//! - request/result types the rest of the crate works with
//! - the `DirectionsProvider` seam and its HTTP implementation
//! - a caching decorator backed by the persistent cache
//! - the per-view session that keeps only the latest answer
//! - deep links to open a route in a maps application

pub mod cache;
pub mod google;
pub mod links;
pub mod polyline;
pub mod session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::WayGoError;
use crate::models::{GeoPosition, PointOfInterest, RouteRecord};

pub use cache::CachedDirectionsProvider;
pub use google::GoogleDirectionsClient;
pub use session::{DirectionsSession, DirectionsState};

/// Status reported by the provider when a route was found
pub const STATUS_OK: &str = "OK";
/// Provider answered OK but without any route, or found none
pub const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";
/// The request never reached the provider or the connection failed
pub const STATUS_TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
/// The provider's answer could not be decoded
pub const STATUS_PARSE_ERROR: &str = "PARSE_ERROR";

/// Travel mode understood by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Walking,
    Bicycling,
    Driving,
}

impl TravelMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Driving => "driving",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intermediate point of a directions request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestWaypoint {
    pub position: GeoPosition,
    /// `false` routes through the point without splitting the leg there
    pub stopover: bool,
}

/// What to ask the provider for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub origin: GeoPosition,
    pub destination: GeoPosition,
    pub waypoints: Vec<RequestWaypoint>,
    /// Let the provider reorder the waypoints for a shorter path
    pub optimize_waypoints: bool,
    pub travel_mode: TravelMode,
}

impl DirectionsRequest {
    /// Plain A to B request
    #[must_use]
    pub fn between(origin: GeoPosition, destination: GeoPosition, travel_mode: TravelMode) -> Self {
        Self {
            origin,
            destination,
            waypoints: Vec::new(),
            optimize_waypoints: false,
            travel_mode,
        }
    }

    /// Full itinerary of a route, on foot, with optimized waypoints
    #[must_use]
    pub fn for_route(record: &RouteRecord) -> Self {
        Self {
            origin: record.origin.position(),
            destination: record.destination.position(),
            waypoints: record
                .waypoints
                .iter()
                .map(|w| RequestWaypoint {
                    position: w.location.position(),
                    stopover: w.stopover,
                })
                .collect(),
            optimize_waypoints: true,
            travel_mode: TravelMode::Walking,
        }
    }

    /// Walking directions from the user to the start of a route
    #[must_use]
    pub fn to_start(from: GeoPosition, start: &PointOfInterest) -> Self {
        Self::between(from, start.position(), TravelMode::Walking)
    }

    /// Stable key used by the directions cache
    #[must_use]
    pub fn cache_key(&self) -> String {
        let point = |p: &GeoPosition| {
            let (lat, lon) = p.rounded_coordinates(5);
            format!("{lat:.5},{lon:.5}")
        };
        let waypoints: Vec<String> = self
            .waypoints
            .iter()
            .map(|w| {
                let prefix = if w.stopover { "" } else { "via:" };
                format!("{prefix}{}", point(&w.position))
            })
            .collect();

        format!(
            "directions:{}:{}:{}:{}:{}",
            self.travel_mode,
            point(&self.origin),
            point(&self.destination),
            waypoints.join("|"),
            self.optimize_waypoints
        )
    }
}

/// One leg between two consecutive stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub distance_meters: u64,
    pub duration_seconds: u64,
    /// Provider-formatted distance, e.g. "1,2 km"
    pub distance_text: String,
    /// Provider-formatted duration, e.g. "15 min"
    pub duration_text: String,
    pub start_label: String,
    pub end_label: String,
}

/// Provider answer mapped into crate types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsResult {
    pub legs: Vec<Leg>,
    /// Decoded overview path, ready to draw
    pub path: Vec<GeoPosition>,
    /// Order the provider visited the request waypoints in
    pub waypoint_order: Vec<usize>,
    pub summary: Option<String>,
}

impl DirectionsResult {
    #[must_use]
    pub fn total_distance_meters(&self) -> u64 {
        self.legs.iter().map(|l| l.distance_meters).sum()
    }

    #[must_use]
    pub fn total_duration_seconds(&self) -> u64 {
        self.legs.iter().map(|l| l.duration_seconds).sum()
    }

    /// Leg-by-leg textual itinerary
    #[must_use]
    pub fn itinerary(&self) -> Vec<String> {
        self.legs
            .iter()
            .enumerate()
            .map(|(i, leg)| {
                format!(
                    "{}. {} → {} : {}, {}",
                    i + 1,
                    leg.start_label,
                    leg.end_label,
                    leg.distance_text,
                    leg.duration_text
                )
            })
            .collect()
    }
}

/// Typed provider failure carrying the provider's status string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("directions request failed with status {status}")]
pub struct DirectionsFailure {
    pub status: String,
    pub message: Option<String>,
}

impl DirectionsFailure {
    pub fn new<S: Into<String>>(status: S) -> Self {
        Self {
            status: status.into(),
            message: None,
        }
    }

    #[must_use]
    pub fn with_message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl From<DirectionsFailure> for WayGoError {
    fn from(failure: DirectionsFailure) -> Self {
        WayGoError::provider(failure.status)
    }
}

/// External service computing paths between points
#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn route(
        &self,
        request: &DirectionsRequest,
    ) -> std::result::Result<DirectionsResult, DirectionsFailure>;
}
