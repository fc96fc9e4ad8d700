//! `WayGo` - walking and running route discovery
//!
//! This library provides the route catalog, nearest-city matching,
//! travel time estimates and the directions plumbing behind a route view.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod directions;
pub mod error;
pub mod geolocation;
pub mod logging;
pub mod models;
pub mod proximity;
pub mod route_view;
pub mod travel_time;
pub mod web;

// Re-export core types for public API
pub use catalog::RouteCatalog;
pub use config::WayGoConfig;
pub use directions::{DirectionsProvider, DirectionsRequest, DirectionsResult, DirectionsState};
pub use error::WayGoError;
pub use models::{GeoPosition, PointOfInterest, RouteRecord};
pub use proximity::ProximityResult;
pub use route_view::RouteView;
pub use travel_time::{MovementMode, TravelDuration};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WayGoError>;
