//! Proximity matching
//!
//! Finds the city of the route whose origin is closest to a position and
//! narrows the catalog to the routes of that city.

use serde::Serialize;
use tracing::debug;

use crate::models::{GeoPosition, RouteRecord};
use crate::{Result, WayGoError};

/// Routes of the city nearest to a position
#[derive(Debug, Clone, Serialize)]
pub struct ProximityResult {
    pub city: String,
    /// Distance from the position to the closest route origin, in km
    pub distance_km: f64,
    pub routes: Vec<RouteRecord>,
}

/// City of the record whose origin is closest to `position`.
///
/// Ties keep the first record in iteration order.
pub fn nearest_city<'a, I>(position: &GeoPosition, catalog: I) -> Result<String>
where
    I: IntoIterator<Item = &'a RouteRecord>,
{
    nearest_origin(position, catalog).map(|(record, _)| record.city.clone())
}

fn nearest_origin<'a, I>(position: &GeoPosition, catalog: I) -> Result<(&'a RouteRecord, f64)>
where
    I: IntoIterator<Item = &'a RouteRecord>,
{
    let mut nearest: Option<(&RouteRecord, f64)> = None;

    for record in catalog {
        let distance = position.distance_km(&record.origin.position());
        match nearest {
            Some((_, min_distance)) if distance >= min_distance => {}
            _ => nearest = Some((record, distance)),
        }
    }

    nearest.ok_or(WayGoError::NoRoutes)
}

/// All records of `city`, in catalog order. Empty when nothing matches.
pub fn filter_by_city<'a, I>(city: &str, catalog: I) -> Vec<RouteRecord>
where
    I: IntoIterator<Item = &'a RouteRecord>,
{
    catalog
        .into_iter()
        .filter(|record| record.city == city)
        .cloned()
        .collect()
}

/// Nearest city plus its routes
pub fn nearby<'a, I>(position: &GeoPosition, catalog: I) -> Result<ProximityResult>
where
    I: IntoIterator<Item = &'a RouteRecord> + Clone,
{
    let (nearest, distance_km) = nearest_origin(position, catalog.clone())?;
    let city = nearest.city.clone();
    let routes = filter_by_city(&city, catalog);

    debug!(
        "Nearest city to ({:.4}, {:.4}) is {} ({:.1}km), {} routes",
        position.latitude,
        position.longitude,
        city,
        distance_km,
        routes.len()
    );

    Ok(ProximityResult {
        city,
        distance_km,
        routes,
    })
}

/// Records whose origin lies within `radius_km`, closest first
pub fn within_radius<'a, I>(
    position: &GeoPosition,
    radius_km: f64,
    catalog: I,
) -> Vec<(&'a RouteRecord, f64)>
where
    I: IntoIterator<Item = &'a RouteRecord>,
{
    let mut results: Vec<(&RouteRecord, f64)> = catalog
        .into_iter()
        .map(|record| (record, position.distance_km(&record.origin.position())))
        .filter(|(_, distance)| *distance <= radius_km)
        .collect();

    // stable sort keeps catalog order between equal distances
    results.sort_by(|a, b| a.1.total_cmp(&b.1));
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, PointOfInterest, RouteStats};

    fn record(key: &str, city: &str, lat: f64, lng: f64) -> RouteRecord {
        RouteRecord {
            key: key.to_string(),
            name: key.to_string(),
            city: city.to_string(),
            difficulty: Difficulty::Beginner,
            description: String::new(),
            distance_km: 5.0,
            estimated_duration: None,
            walking_duration: None,
            running_duration: None,
            route_type: None,
            origin: PointOfInterest::new(lat, lng, "start"),
            destination: PointOfInterest::new(lat, lng, "end"),
            waypoints: vec![],
            image_url: None,
            stats: RouteStats::default(),
        }
    }

    fn paris_lyon() -> Vec<RouteRecord> {
        vec![
            record("louvre", "Paris", 48.8606, 2.3376),
            record("bellecour", "Lyon", 45.75, 4.85),
        ]
    }

    #[test]
    fn test_nearest_city_paris() {
        let catalog = paris_lyon();
        let city = nearest_city(&GeoPosition::new(48.8566, 2.3522), &catalog).unwrap();
        assert_eq!(city, "Paris");
    }

    #[test]
    fn test_nearest_city_lyon() {
        let catalog = paris_lyon();
        let city = nearest_city(&GeoPosition::new(45.76, 4.84), &catalog).unwrap();
        assert_eq!(city, "Lyon");
    }

    #[test]
    fn test_empty_catalog_fails() {
        let catalog: Vec<RouteRecord> = vec![];
        let err = nearest_city(&GeoPosition::new(0.0, 0.0), &catalog).unwrap_err();
        assert!(matches!(err, WayGoError::NoRoutes));
    }

    #[test]
    fn test_tie_goes_to_first_record() {
        let catalog = vec![
            record("a", "First", 10.0, 10.0),
            record("b", "Second", 10.0, 10.0),
        ];
        let city = nearest_city(&GeoPosition::new(0.0, 0.0), &catalog).unwrap();
        assert_eq!(city, "First");
    }

    #[test]
    fn test_filter_by_city_keeps_order_and_is_idempotent() {
        let catalog = vec![
            record("p1", "Paris", 48.86, 2.33),
            record("l1", "Lyon", 45.75, 4.85),
            record("p2", "Paris", 48.87, 2.34),
        ];
        let first = filter_by_city("Paris", &catalog);
        let second = filter_by_city("Paris", &catalog);
        assert_eq!(first, second);
        let keys: Vec<&str> = first.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["p1", "p2"]);
    }

    #[test]
    fn test_filter_by_unknown_city_is_empty() {
        let catalog = paris_lyon();
        assert!(filter_by_city("Marseille", &catalog).is_empty());
    }

    #[test]
    fn test_nearby_combines_both_steps() {
        let mut catalog = paris_lyon();
        catalog.push(record("orsay", "Paris", 48.86, 2.3266));
        let result = nearby(&GeoPosition::new(48.8566, 2.3522), &catalog).unwrap();
        assert_eq!(result.city, "Paris");
        assert_eq!(result.routes.len(), 2);
        assert!(result.distance_km < 2.0);
    }

    #[test]
    fn test_within_radius_sorted() {
        let catalog = vec![
            record("far", "Paris", 48.90, 2.40),
            record("near", "Paris", 48.857, 2.353),
            record("lyon", "Lyon", 45.75, 4.85),
        ];
        let found = within_radius(&GeoPosition::new(48.8566, 2.3522), 20.0, &catalog);
        let keys: Vec<&str> = found.iter().map(|(r, _)| r.key.as_str()).collect();
        assert_eq!(keys, vec!["near", "far"]);
    }
}
