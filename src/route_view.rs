//! Route view
//!
//! State owned by one displayed route: its itinerary, the walk from the user
//! to its start, the selected movement mode and the display figures. All of
//! it lives and dies with the view; `close` (or dropping the view) releases
//! the position subscription and discards in-flight directions.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{AbortHandle, Abortable};
use rand::RngExt;
use serde::Serialize;
use tracing::{debug, info};

use crate::directions::{
    DirectionsProvider, DirectionsRequest, DirectionsSession, DirectionsState, links,
};
use crate::geolocation::{GeolocationSource, PositionUpdate, PositionWatch};
use crate::models::{GeoPosition, RouteRecord};
use crate::travel_time::{self, MovementMode, TravelDuration};

const MONTHS: [&str; 12] = [
    "Janvier",
    "Février",
    "Mars",
    "Avril",
    "Mai",
    "Juin",
    "Juillet",
    "Août",
    "Septembre",
    "Octobre",
    "Novembre",
    "Décembre",
];

fn settled(state: &DirectionsState) -> bool {
    !matches!(
        state,
        DirectionsState::Idle | DirectionsState::Requesting { .. }
    )
}

/// Walk from the user's position to the route start
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeToStart {
    pub duration_text: String,
    pub distance_text: String,
    pub duration_seconds: u64,
    pub distance_meters: u64,
}

/// Serializable picture of a view
#[derive(Debug, Clone, Serialize)]
pub struct RouteViewSummary {
    pub key: String,
    pub name: String,
    pub city: String,
    pub mode: MovementMode,
    pub estimated_time: Option<String>,
    pub itinerary: Vec<String>,
    pub directions: DirectionsState,
    pub time_to_start: Option<TimeToStart>,
    pub participants: u32,
    pub featured_month: String,
    pub maps_url: String,
}

pub struct RouteView {
    record: RouteRecord,
    route_directions: Arc<DirectionsSession>,
    start_directions: Arc<DirectionsSession>,
    position: Option<PositionWatch>,
    follower: Option<AbortHandle>,
    last_position: Option<GeoPosition>,
    mode: MovementMode,
    participants: u32,
    featured_month: &'static str,
}

impl RouteView {
    /// Open a view and request the route itinerary
    pub fn open(record: RouteRecord, provider: Arc<dyn DirectionsProvider>) -> Self {
        let route_directions = Arc::new(DirectionsSession::new(Arc::clone(&provider)));
        let start_directions = Arc::new(DirectionsSession::new(provider));

        let mut rng = rand::rng();
        let participants = rng.random_range(100..=500);
        let featured_month = MONTHS[rng.random_range(0..MONTHS.len())];

        info!("Opening route view for {}", record.key);
        route_directions.spawn_request(DirectionsRequest::for_route(&record));

        Self {
            record,
            route_directions,
            start_directions,
            position: None,
            follower: None,
            last_position: None,
            mode: MovementMode::default(),
            participants,
            featured_month,
        }
    }

    #[must_use]
    pub fn record(&self) -> &RouteRecord {
        &self.record
    }

    #[must_use]
    pub fn mode(&self) -> MovementMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: MovementMode) {
        self.mode = mode;
    }

    #[must_use]
    pub fn directions(&self) -> DirectionsState {
        self.route_directions.state()
    }

    /// Wait for the itinerary request to settle
    pub async fn wait_for_directions(&self) -> DirectionsState {
        let mut rx = self.route_directions.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            if settled(&state) {
                return state;
            }
            if rx.changed().await.is_err() {
                return self.route_directions.state();
            }
        }
    }

    /// Ask for the itinerary again, e.g. after a provider failure
    pub fn retry_directions(&self) {
        self.route_directions
            .spawn_request(DirectionsRequest::for_route(&self.record));
    }

    /// Record a new user position and refresh the walk to the start
    pub fn update_position(&mut self, position: GeoPosition) {
        self.last_position = Some(position);
        self.start_directions
            .spawn_request(DirectionsRequest::to_start(position, &self.record.origin));
    }

    /// Follow a geolocation source until the view closes
    pub fn follow(&mut self, source: &dyn GeolocationSource, max_age: Duration) {
        self.stop_following();

        let watch = PositionWatch::start(source, max_age);
        let mut updates = watch.subscribe();
        let session = Arc::clone(&self.start_directions);
        let origin = self.record.origin.clone();
        let (abort, registration) = AbortHandle::new_pair();

        let task = async move {
            loop {
                let update = updates.borrow_and_update().clone();
                if let PositionUpdate::Located { fix } = update {
                    debug!("Position update, refreshing time to start");
                    session.spawn_request(DirectionsRequest::to_start(fix.position, &origin));
                }
                if updates.changed().await.is_err() {
                    break;
                }
            }
        };
        tokio::spawn(Abortable::new(task, registration));

        self.position = Some(watch);
        self.follower = Some(abort);
    }

    fn stop_following(&mut self) {
        if let Some(abort) = self.follower.take() {
            abort.abort();
        }
        if let Some(watch) = self.position.take() {
            watch.cancel();
        }
    }

    /// Latest known user position
    #[must_use]
    pub fn current_position(&self) -> Option<GeoPosition> {
        self.position
            .as_ref()
            .and_then(|w| w.latest().position())
            .or(self.last_position)
    }

    /// Wait until the latest time-to-start request has an answer
    pub async fn wait_for_time_to_start(&self) -> Option<TimeToStart> {
        let mut rx = self.start_directions.subscribe();
        loop {
            let done = settled(&rx.borrow_and_update());
            if done || rx.changed().await.is_err() {
                return self.time_to_start();
            }
        }
    }

    #[must_use]
    pub fn time_to_start(&self) -> Option<TimeToStart> {
        let result = self.start_directions.latest_result()?;
        let leg = result.legs.first()?;
        Some(TimeToStart {
            duration_text: leg.duration_text.clone(),
            distance_text: leg.distance_text.clone(),
            duration_seconds: leg.duration_seconds,
            distance_meters: leg.distance_meters,
        })
    }

    /// Travel time for the selected mode, from the computed path when known
    #[must_use]
    pub fn estimated_time(&self) -> Option<TravelDuration> {
        let meters = match self.route_directions.latest_result() {
            Some(result) => result.total_distance_meters() as f64,
            None => self.record.distance_meters(),
        };
        travel_time::estimate_duration(meters, self.mode).ok()
    }

    #[must_use]
    pub fn participants(&self) -> u32 {
        self.participants
    }

    #[must_use]
    pub fn featured_month(&self) -> &'static str {
        self.featured_month
    }

    #[must_use]
    pub fn maps_url(&self) -> String {
        links::route_url(&self.record)
    }

    #[must_use]
    pub fn start_url(&self) -> Option<String> {
        self.current_position()
            .map(|position| links::start_url(&position, &self.record))
    }

    #[must_use]
    pub fn summary(&self) -> RouteViewSummary {
        let directions = self.directions();
        RouteViewSummary {
            key: self.record.key.clone(),
            name: self.record.name.clone(),
            city: self.record.city.clone(),
            mode: self.mode,
            estimated_time: self.estimated_time().map(|d| d.to_string()),
            itinerary: directions.result().map(|r| r.itinerary()).unwrap_or_default(),
            directions,
            time_to_start: self.time_to_start(),
            participants: self.participants,
            featured_month: self.featured_month.to_string(),
            maps_url: self.maps_url(),
        }
    }

    /// Release the position subscription and drop pending directions
    pub fn close(&mut self) {
        self.stop_following();
        self.route_directions.close();
        self.start_directions.close();
        debug!("Route view {} closed", self.record.key);
    }
}

impl Drop for RouteView {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RouteCatalog;
    use crate::directions::{DirectionsFailure, DirectionsResult, Leg};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns one leg per requested stop, 1 km each
    struct StubProvider {
        calls: AtomicUsize,
        fail_with: Option<&'static str>,
    }

    impl StubProvider {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_with: None,
            }
        }
    }

    #[async_trait]
    impl DirectionsProvider for StubProvider {
        async fn route(
            &self,
            request: &DirectionsRequest,
        ) -> Result<DirectionsResult, DirectionsFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(status) = self.fail_with {
                return Err(DirectionsFailure::new(status));
            }
            let legs = (0..=request.waypoints.len())
                .map(|i| Leg {
                    distance_meters: 1000,
                    duration_seconds: 720,
                    distance_text: "1,0 km".into(),
                    duration_text: "12 min".into(),
                    start_label: format!("stop {i}"),
                    end_label: format!("stop {}", i + 1),
                })
                .collect();
            Ok(DirectionsResult {
                legs,
                path: vec![],
                waypoint_order: vec![],
                summary: None,
            })
        }
    }

    /// One leg whose length is the request origin latitude in km
    struct LatitudeProvider;

    #[async_trait]
    impl DirectionsProvider for LatitudeProvider {
        async fn route(
            &self,
            request: &DirectionsRequest,
        ) -> Result<DirectionsResult, DirectionsFailure> {
            let meters = (request.origin.latitude * 1000.0) as u64;
            Ok(DirectionsResult {
                legs: vec![Leg {
                    distance_meters: meters,
                    duration_seconds: meters,
                    distance_text: format!("{meters} m"),
                    duration_text: String::new(),
                    start_label: "here".into(),
                    end_label: "start".into(),
                }],
                path: vec![],
                waypoint_order: vec![],
                summary: None,
            })
        }
    }

    fn monuments() -> RouteRecord {
        RouteCatalog::bundled()
            .unwrap()
            .get("monuments")
            .unwrap()
            .clone()
    }

    #[tokio::test]
    async fn test_open_requests_itinerary() {
        let view = RouteView::open(monuments(), Arc::new(StubProvider::ok()));
        let state = view.wait_for_directions().await;

        // two waypoints, three legs
        let result = state.result().unwrap();
        assert_eq!(result.legs.len(), 3);
        assert_eq!(view.summary().itinerary.len(), 3);
        assert!((100..=500).contains(&view.participants()));
        assert!(MONTHS.contains(&view.featured_month()));
    }

    #[tokio::test]
    async fn test_estimated_time_uses_directions_distance() {
        let mut view = RouteView::open(monuments(), Arc::new(StubProvider::ok()));
        view.wait_for_directions().await;

        // 3000 m walking = 2142 s
        assert_eq!(view.estimated_time().unwrap().to_string(), "35 min");
        view.set_mode(MovementMode::Running);
        assert_eq!(view.estimated_time().unwrap().to_string(), "17 min");
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_catalog_distance() {
        let provider = StubProvider {
            calls: AtomicUsize::new(0),
            fail_with: Some("ZERO_RESULTS"),
        };
        let view = RouteView::open(monuments(), Arc::new(provider));
        let state = view.wait_for_directions().await;
        assert!(matches!(state, DirectionsState::Failed { ref status, .. } if status == "ZERO_RESULTS"));

        // 5.2 km walking = 3714 s
        assert_eq!(view.estimated_time().unwrap().to_string(), "1 h 1 min");
    }

    #[tokio::test]
    async fn test_position_update_computes_time_to_start() {
        let mut view = RouteView::open(monuments(), Arc::new(StubProvider::ok()));
        assert!(view.time_to_start().is_none());
        view.update_position(GeoPosition::new(48.8566, 2.3522));

        let to_start = view.wait_for_time_to_start().await.unwrap();
        assert_eq!(to_start.duration_text, "12 min");
        assert!(view.start_url().unwrap().contains("origin=48.8566,2.3522"));
    }

    #[tokio::test]
    async fn test_time_to_start_follows_latest_position() {
        let mut view = RouteView::open(monuments(), Arc::new(LatitudeProvider));

        view.update_position(GeoPosition::new(1.0, 0.0));
        let first = view.wait_for_time_to_start().await.unwrap();
        assert_eq!(first.distance_meters, 1000);

        view.update_position(GeoPosition::new(2.0, 0.0));
        let second = view.wait_for_time_to_start().await.unwrap();
        assert_eq!(second.distance_meters, 2000);
    }

    #[tokio::test]
    async fn test_follow_refreshes_time_to_start() {
        let mut view = RouteView::open(monuments(), Arc::new(LatitudeProvider));
        let source = crate::geolocation::FixedGeolocation::new(GeoPosition::new(48.8566, 2.3522));
        view.follow(&source, Duration::from_secs(10));

        let to_start = view.wait_for_time_to_start().await.unwrap();
        assert_eq!(to_start.distance_meters, 48856);
        assert_eq!(view.current_position(), Some(GeoPosition::new(48.8566, 2.3522)));
        assert!(view.start_url().unwrap().contains("origin=48.8566,2.3522"));
    }

    #[tokio::test]
    async fn test_close_releases_everything() {
        let mut view = RouteView::open(monuments(), Arc::new(StubProvider::ok()));
        let source = crate::geolocation::FixedGeolocation::new(GeoPosition::new(48.85, 2.35));
        view.follow(&source, Duration::from_secs(10));
        view.close();

        assert_eq!(view.directions(), DirectionsState::Closed);
        assert!(view.position.is_none());
        assert!(view.follower.is_none());
    }
}
