use rstest::{fixture, rstest};

use waygo::proximity::{filter_by_city, nearest_city};
use waygo::travel_time::estimate_duration;
use waygo::{GeoPosition, MovementMode, RouteCatalog};

#[fixture]
fn catalog() -> RouteCatalog {
    RouteCatalog::bundled().unwrap()
}

#[rstest]
#[case(48.8566, 2.3522)]
#[case(45.7640, 4.8357)]
#[case(-33.8688, 151.2093)]
#[case(90.0, 180.0)]
#[case(0.0, 0.0)]
fn test_nearest_city_is_a_catalog_city(catalog: RouteCatalog, #[case] lat: f64, #[case] lng: f64) {
    let city = nearest_city(&GeoPosition::new(lat, lng), &catalog).unwrap();
    assert!(catalog.cities().contains(&city.as_str()));
}

#[rstest]
fn test_filter_by_city_is_idempotent(catalog: RouteCatalog) {
    for city in catalog.cities() {
        let once = filter_by_city(city, &catalog);
        let twice = filter_by_city(city, &once);
        assert_eq!(once, twice);

        // catalog order preserved
        let keys: Vec<&str> = once.iter().map(|r| r.key.as_str()).collect();
        let expected: Vec<&str> = catalog
            .iter()
            .filter(|r| r.city == city)
            .map(|r| r.key.as_str())
            .collect();
        assert_eq!(keys, expected);
    }
}

#[rstest]
fn test_filter_unknown_city_is_empty(catalog: RouteCatalog) {
    assert!(filter_by_city("Atlantis", &catalog).is_empty());
}

#[rstest]
#[case(0.0)]
#[case(1.0)]
#[case(84.0)]
#[case(5000.0)]
#[case(42_195.0)]
fn test_running_never_slower_than_walking(#[case] meters: f64) {
    let walking = estimate_duration(meters, MovementMode::Walking).unwrap();
    let running = estimate_duration(meters, MovementMode::Running).unwrap();
    assert!(running <= walking);
}

#[rstest]
fn test_route_estimates_follow_catalog_distance(catalog: RouteCatalog) {
    for record in &catalog {
        let walking = waygo::travel_time::estimate_route(record, MovementMode::Walking).unwrap();
        let expected = estimate_duration(record.distance_km * 1000.0, MovementMode::Walking).unwrap();
        assert_eq!(walking, expected);
    }
}
