//! Deep links that open an itinerary in Google Maps

use crate::models::{GeoPosition, RouteRecord};

const MAPS_DIR_URL: &str = "https://www.google.com/maps/dir/?api=1";

/// Link showing the whole route, waypoints included, on foot
#[must_use]
pub fn route_url(record: &RouteRecord) -> String {
    let waypoints: Vec<String> = record
        .waypoints
        .iter()
        .map(|w| w.location.position().to_query())
        .collect();

    let mut url = format!(
        "{MAPS_DIR_URL}&origin={}&destination={}",
        record.origin.position().to_query(),
        record.destination.position().to_query()
    );
    if !waypoints.is_empty() {
        url.push_str("&waypoints=");
        url.push_str(&urlencoding::encode(&waypoints.join("|")));
    }
    url.push_str("&travelmode=walking");
    url
}

/// Link guiding the user from `from` to the start of the route
#[must_use]
pub fn start_url(from: &GeoPosition, record: &RouteRecord) -> String {
    format!(
        "{MAPS_DIR_URL}&origin={}&destination={}&travelmode=walking",
        from.to_query(),
        record.origin.position().to_query()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RouteCatalog;

    #[test]
    fn test_route_url_lists_waypoints() {
        let catalog = RouteCatalog::bundled().unwrap();
        let record = catalog.get("monuments").unwrap();
        let url = route_url(record);
        assert!(url.starts_with("https://www.google.com/maps/dir/?api=1&origin=48.864824,2.334595"));
        assert!(url.contains("&destination=48.85837,2.294481"));
        assert!(url.contains("&waypoints=48.872829842%2C2.321332048%7C48.866667%2C2.333333"));
        assert!(url.ends_with("&travelmode=walking"));
    }

    #[test]
    fn test_start_url() {
        let catalog = RouteCatalog::bundled().unwrap();
        let record = catalog.get("monuments").unwrap();
        let url = start_url(&GeoPosition::new(48.85, 2.35), record);
        assert_eq!(
            url,
            "https://www.google.com/maps/dir/?api=1&origin=48.85,2.35&destination=48.864824,2.334595&travelmode=walking"
        );
    }
}
