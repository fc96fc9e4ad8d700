//! Travel time estimation for walking and running

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::RouteRecord;
use crate::{Result, WayGoError};

/// Walking speed in m/s (about 5 km/h)
pub const WALKING_SPEED_MS: f64 = 1.4;
/// Running speed in m/s (about 10 km/h)
pub const RUNNING_SPEED_MS: f64 = 2.8;

/// How the user moves along a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementMode {
    #[default]
    #[serde(alias = "marche")]
    Walking,
    #[serde(alias = "course")]
    Running,
}

impl MovementMode {
    #[must_use]
    pub fn speed_ms(&self) -> f64 {
        match self {
            MovementMode::Walking => WALKING_SPEED_MS,
            MovementMode::Running => RUNNING_SPEED_MS,
        }
    }
}

impl fmt::Display for MovementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementMode::Walking => f.write_str("walking"),
            MovementMode::Running => f.write_str("running"),
        }
    }
}

impl FromStr for MovementMode {
    type Err = WayGoError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "walking" | "walk" | "marche" => Ok(MovementMode::Walking),
            "running" | "run" | "course" => Ok(MovementMode::Running),
            other => Err(WayGoError::validation(format!(
                "unknown movement mode '{other}', expected walking or running"
            ))),
        }
    }
}

/// Whole hours and minutes, displayed as `"1 h 5 min"` or `"59 min"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TravelDuration {
    pub hours: u64,
    pub minutes: u64,
}

impl TravelDuration {
    /// Build from a number of seconds, flooring both components
    #[must_use]
    pub fn from_seconds(seconds: f64) -> Self {
        let seconds = seconds.max(0.0);
        let hours = (seconds / 3600.0).floor() as u64;
        let minutes = ((seconds % 3600.0) / 60.0).floor() as u64;
        Self { hours, minutes }
    }

    #[must_use]
    pub fn total_minutes(&self) -> u64 {
        self.hours * 60 + self.minutes
    }
}

impl fmt::Display for TravelDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hours > 0 {
            write!(f, "{} h ", self.hours)?;
        }
        write!(f, "{} min", self.minutes)
    }
}

/// Time needed to cover `distance_meters` at the speed of `mode`
pub fn estimate_duration(distance_meters: f64, mode: MovementMode) -> Result<TravelDuration> {
    if !distance_meters.is_finite() {
        return Err(WayGoError::validation(format!(
            "distance must be a finite number of meters, got {distance_meters}"
        )));
    }
    if distance_meters < 0.0 {
        return Err(WayGoError::validation(format!(
            "distance cannot be negative, got {distance_meters} m"
        )));
    }

    Ok(TravelDuration::from_seconds(distance_meters / mode.speed_ms()))
}

/// Estimate from the catalog length of a route
pub fn estimate_route(record: &RouteRecord, mode: MovementMode) -> Result<TravelDuration> {
    estimate_duration(record.distance_meters(), mode)
}
