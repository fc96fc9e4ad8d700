//! Data models for the WayGo route services
//!
//! This module contains the core domain models organized by concern:
//! - Location: geographic positions, labelled points and timestamped fixes
//! - Parcours: route records as loaded from the catalog

pub mod location;
pub mod parcours;

// Re-export all public types for convenient access
pub use location::{GeoPosition, PointOfInterest, PositionFix, Waypoint};
pub use parcours::{Difficulty, RouteRecord, RouteStats};
