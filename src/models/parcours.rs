//! Route ("parcours") records as stored in the catalog

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::location::{PointOfInterest, Waypoint};
use crate::WayGoError;

/// Difficulty level of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(rename = "débutant", alias = "beginner")]
    Beginner,
    #[serde(rename = "intermédiaire", alias = "intermediate")]
    Intermediate,
    #[serde(rename = "expert", alias = "advanced")]
    Expert,
}

impl Difficulty {
    /// Label as written in the catalog
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "débutant",
            Difficulty::Intermediate => "intermédiaire",
            Difficulty::Expert => "expert",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = WayGoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "débutant" | "debutant" | "beginner" => Ok(Difficulty::Beginner),
            "intermédiaire" | "intermediaire" | "intermediate" => Ok(Difficulty::Intermediate),
            "expert" | "advanced" => Ok(Difficulty::Expert),
            other => Err(WayGoError::validation(format!(
                "unknown difficulty '{other}'"
            ))),
        }
    }
}

/// Optional effort figures published with some routes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    pub calories: Option<u32>,
    /// Average pace, e.g. "10 km/h"
    pub speed: Option<String>,
    /// Elevation gain, e.g. "45 m"
    pub elevation_gain: Option<String>,
    /// Heart rate range, e.g. "120-140"
    pub heart_rate: Option<String>,
}

/// A named route with its geometry and display metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRecord {
    /// Unique catalog key
    pub key: String,
    pub name: String,
    pub city: String,
    pub difficulty: Difficulty,
    pub description: String,
    /// Route length in kilometers
    pub distance_km: f64,
    pub estimated_duration: Option<String>,
    pub walking_duration: Option<String>,
    pub running_duration: Option<String>,
    /// Free-form activity type ("urbain", "nature", ...)
    pub route_type: Option<String>,
    pub origin: PointOfInterest,
    pub destination: PointOfInterest,
    pub waypoints: Vec<Waypoint>,
    pub image_url: Option<String>,
    pub stats: RouteStats,
}

/// Catalog entry exactly as written in the data file
#[derive(Debug, Deserialize)]
pub(crate) struct RawParcours {
    nom: String,
    ville: String,
    niveau: Difficulty,
    #[serde(default)]
    description: String,
    distance: String,
    #[serde(rename = "dureeEstimee")]
    duree_estimee: Option<String>,
    #[serde(rename = "dureeMarche")]
    duree_marche: Option<String>,
    #[serde(rename = "dureeCourse")]
    duree_course: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    calories: Option<u32>,
    vitesse: Option<String>,
    denivele: Option<String>,
    bpm: Option<String>,
    origine: PointOfInterest,
    destination: PointOfInterest,
    #[serde(rename = "pointsIntermediaires", default)]
    points_intermediaires: Vec<Waypoint>,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

impl RawParcours {
    pub(crate) fn into_record(self, key: String) -> crate::Result<RouteRecord> {
        let distance_km = parse_distance_km(&self.distance).map_err(|e| {
            WayGoError::catalog(format!("route '{key}': {e}"))
        })?;

        let record = RouteRecord {
            key,
            name: self.nom,
            city: self.ville,
            difficulty: self.niveau,
            description: self.description,
            distance_km,
            estimated_duration: self.duree_estimee,
            walking_duration: self.duree_marche,
            running_duration: self.duree_course,
            route_type: self.kind,
            origin: self.origine,
            destination: self.destination,
            waypoints: self.points_intermediaires,
            image_url: self.image_url,
            stats: RouteStats {
                calories: self.calories,
                speed: self.vitesse,
                elevation_gain: self.denivele,
                heart_rate: self.bpm,
            },
        };
        record.validate()?;
        Ok(record)
    }
}

impl RouteRecord {
    /// Every point must carry a usable coordinate and a label
    pub fn validate(&self) -> crate::Result<()> {
        let points = std::iter::once(&self.origin)
            .chain(self.waypoints.iter().map(|w| &w.location))
            .chain(std::iter::once(&self.destination));

        for point in points {
            point.position().validate().map_err(|e| {
                WayGoError::catalog(format!("route '{}': {e}", self.key))
            })?;
            if point.name.trim().is_empty() {
                return Err(WayGoError::catalog(format!(
                    "route '{}' has an unnamed point",
                    self.key
                )));
            }
        }
        Ok(())
    }

    /// Point labels in travel order: origin, waypoints, destination
    #[must_use]
    pub fn point_names(&self) -> Vec<&str> {
        std::iter::once(self.origin.name.as_str())
            .chain(self.waypoints.iter().map(|w| w.location.name.as_str()))
            .chain(std::iter::once(self.destination.name.as_str()))
            .collect()
    }

    #[must_use]
    pub fn distance_meters(&self) -> f64 {
        self.distance_km * 1000.0
    }
}

/// Parse a formatted distance such as `"5.2 km"`, `"10km"` or `"3,5 km"`
pub fn parse_distance_km(text: &str) -> crate::Result<f64> {
    let cleaned = text
        .trim()
        .trim_end_matches("km")
        .trim_end_matches("KM")
        .trim()
        .replace(',', ".");

    let value: f64 = cleaned
        .parse()
        .map_err(|_| WayGoError::validation(format!("cannot parse distance '{text}'")))?;

    if !value.is_finite() || value < 0.0 {
        return Err(WayGoError::validation(format!(
            "distance '{text}' must be a non-negative number"
        )));
    }
    Ok(value)
}
