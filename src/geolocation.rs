//! Geolocation
//!
//! Device location is consumed through the `GeolocationSource` seam: a
//! one-shot read or a continuous watch. A `PositionWatch` keeps the latest
//! accepted fix and stops when cancelled or dropped; `NearbyRoutesWatcher`
//! re-runs the proximity matcher on every accepted fix.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::{AbortHandle, Abortable};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::WayGoError;
use crate::catalog::RouteCatalog;
use crate::models::{GeoPosition, PositionFix};
use crate::proximity::{self, ProximityResult};

/// Why a position could not be obtained
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GeolocationError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("position unavailable: {0}")]
    PositionUnavailable(String),
    #[error("timed out waiting for a position")]
    Timeout,
    #[error("geolocation is not supported")]
    Unsupported,
}

impl From<GeolocationError> for WayGoError {
    fn from(err: GeolocationError) -> Self {
        match err {
            GeolocationError::PermissionDenied => WayGoError::PermissionDenied,
            other => WayGoError::geolocation(other.to_string()),
        }
    }
}

pub type FixResult = std::result::Result<PositionFix, GeolocationError>;

/// Device location sensor
#[async_trait]
pub trait GeolocationSource: Send + Sync {
    /// One-shot read
    async fn current_position(&self) -> FixResult;

    /// Unbounded sequence of updates, until the stream is dropped
    fn watch(&self) -> BoxStream<'static, FixResult>;
}

/// Source that always reports the same position
#[derive(Debug, Clone)]
pub struct FixedGeolocation {
    position: GeoPosition,
}

impl FixedGeolocation {
    #[must_use]
    pub fn new(position: GeoPosition) -> Self {
        Self { position }
    }
}

#[async_trait]
impl GeolocationSource for FixedGeolocation {
    async fn current_position(&self) -> FixResult {
        Ok(PositionFix::now(self.position))
    }

    fn watch(&self) -> BoxStream<'static, FixResult> {
        let position = self.position;
        stream::once(async move { Ok(PositionFix::now(position)) }).boxed()
    }
}

/// Source replaying a prepared list of events, one every `interval`
#[derive(Debug, Clone)]
pub struct ScriptedGeolocation {
    events: Vec<FixResult>,
    interval: Duration,
}

impl ScriptedGeolocation {
    #[must_use]
    pub fn new(events: Vec<FixResult>, interval: Duration) -> Self {
        Self { events, interval }
    }
}

#[async_trait]
impl GeolocationSource for ScriptedGeolocation {
    async fn current_position(&self) -> FixResult {
        self.events
            .first()
            .cloned()
            .unwrap_or(Err(GeolocationError::PositionUnavailable(
                "no scripted position".to_string(),
            )))
    }

    fn watch(&self) -> BoxStream<'static, FixResult> {
        let interval = self.interval;
        stream::iter(self.events.clone())
            .then(move |event| async move {
                tokio::time::sleep(interval).await;
                event
            })
            .boxed()
    }
}

/// Source for environments without a location sensor
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeolocation;

#[async_trait]
impl GeolocationSource for NoGeolocation {
    async fn current_position(&self) -> FixResult {
        Err(GeolocationError::Unsupported)
    }

    fn watch(&self) -> BoxStream<'static, FixResult> {
        stream::once(async { Err(GeolocationError::Unsupported) }).boxed()
    }
}

/// Latest knowledge of a watch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PositionUpdate {
    Waiting,
    Located { fix: PositionFix },
    Failed { error: GeolocationError },
}

impl PositionUpdate {
    #[must_use]
    pub fn position(&self) -> Option<GeoPosition> {
        match self {
            PositionUpdate::Located { fix } => Some(fix.position),
            _ => None,
        }
    }
}

/// Running position subscription; cancelled explicitly or on drop
pub struct PositionWatch {
    updates: watch::Receiver<PositionUpdate>,
    abort: AbortHandle,
}

impl PositionWatch {
    /// Subscribe to `source`, dropping fixes older than `max_age`
    pub fn start(source: &dyn GeolocationSource, max_age: Duration) -> Self {
        let (tx, updates) = watch::channel(PositionUpdate::Waiting);
        let (abort, registration) = AbortHandle::new_pair();
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let mut events = source.watch();

        let task = async move {
            while let Some(event) = events.next().await {
                match event {
                    Ok(fix) => {
                        if let Err(e) = fix.position.validate() {
                            warn!("Ignoring invalid position: {}", e);
                            continue;
                        }
                        if fix.is_stale(Utc::now(), max_age) {
                            debug!("Discarding stale fix captured at {}", fix.captured_at);
                            continue;
                        }
                        tx.send_replace(PositionUpdate::Located { fix });
                    }
                    Err(GeolocationError::PermissionDenied) => {
                        warn!("Geolocation permission denied, stopping watch");
                        tx.send_replace(PositionUpdate::Failed {
                            error: GeolocationError::PermissionDenied,
                        });
                        break;
                    }
                    Err(error) => {
                        warn!("Geolocation update failed: {}", error);
                        // keep the last good fix
                        if tx.borrow().position().is_none() {
                            tx.send_replace(PositionUpdate::Failed { error });
                        }
                    }
                }
            }
            debug!("Position watch ended");
        };
        tokio::spawn(Abortable::new(task, registration));

        Self { updates, abort }
    }

    #[must_use]
    pub fn latest(&self) -> PositionUpdate {
        self.updates.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PositionUpdate> {
        self.updates.clone()
    }

    /// Stop receiving updates
    pub fn cancel(&self) {
        self.abort.abort();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.abort.is_aborted()
    }
}

impl Drop for PositionWatch {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// Routes near the user, kept current as the position changes
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NearbyState {
    Locating,
    Found { result: ProximityResult },
    NoRoutes,
    PermissionDenied,
    Unavailable { reason: String },
}

/// Proximity matcher driven by a position watch
pub struct NearbyRoutesWatcher {
    position: PositionWatch,
    state: watch::Receiver<NearbyState>,
    abort: AbortHandle,
}

impl NearbyRoutesWatcher {
    pub fn start(
        source: &dyn GeolocationSource,
        catalog: Arc<RouteCatalog>,
        max_age: Duration,
    ) -> Self {
        let position = PositionWatch::start(source, max_age);
        let mut updates = position.subscribe();
        let (tx, state) = watch::channel(NearbyState::Locating);
        let (abort, registration) = AbortHandle::new_pair();

        let task = async move {
            loop {
                let update = updates.borrow_and_update().clone();
                let next = match update {
                    PositionUpdate::Waiting => None,
                    PositionUpdate::Located { fix } => {
                        Some(match proximity::nearby(&fix.position, catalog.as_ref()) {
                            Ok(result) => {
                                info!(
                                    "{} routes near you in {}",
                                    result.routes.len(),
                                    result.city
                                );
                                NearbyState::Found { result }
                            }
                            Err(_) => NearbyState::NoRoutes,
                        })
                    }
                    PositionUpdate::Failed {
                        error: GeolocationError::PermissionDenied,
                    } => Some(NearbyState::PermissionDenied),
                    PositionUpdate::Failed { error } => Some(NearbyState::Unavailable {
                        reason: error.to_string(),
                    }),
                };
                if let Some(next) = next {
                    tx.send_replace(next);
                }
                if updates.changed().await.is_err() {
                    break;
                }
            }
        };
        tokio::spawn(Abortable::new(task, registration));

        Self {
            position,
            state,
            abort,
        }
    }

    #[must_use]
    pub fn latest(&self) -> NearbyState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NearbyState> {
        self.state.clone()
    }

    /// Release the geolocation subscription and stop matching
    pub fn cancel(&self) {
        self.position.cancel();
        self.abort.abort();
    }
}

impl Drop for NearbyRoutesWatcher {
    fn drop(&mut self) {
        self.abort.abort();
    }
}

/// One-shot lookup: read the position once and match it against the catalog.
///
/// A fix older than `max_age` is refused, as in [`PositionWatch`].
pub async fn locate_nearby(
    source: &dyn GeolocationSource,
    catalog: &RouteCatalog,
    max_age: Duration,
) -> crate::Result<ProximityResult> {
    let fix = source.current_position().await?;
    fix.position.validate()?;
    let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
    if fix.is_stale(Utc::now(), max_age) {
        return Err(WayGoError::geolocation(format!(
            "position captured at {} is too old",
            fix.captured_at
        )));
    }
    proximity::nearby(&fix.position, catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_AGE: Duration = Duration::from_secs(10);

    async fn next_nearby(rx: &mut watch::Receiver<NearbyState>) -> NearbyState {
        loop {
            let state = rx.borrow_and_update().clone();
            if !matches!(state, NearbyState::Locating) {
                return state;
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_locate_nearby_paris() {
        let catalog = RouteCatalog::bundled().unwrap();
        let source = FixedGeolocation::new(GeoPosition::new(48.8566, 2.3522));
        let result = locate_nearby(&source, &catalog, MAX_AGE).await.unwrap();
        assert_eq!(result.city, "Paris");
        assert!(result.routes.iter().all(|r| r.city == "Paris"));
    }

    #[tokio::test]
    async fn test_locate_nearby_denied() {
        let catalog = RouteCatalog::bundled().unwrap();
        let source = ScriptedGeolocation::new(
            vec![Err(GeolocationError::PermissionDenied)],
            Duration::ZERO,
        );
        let err = locate_nearby(&source, &catalog, MAX_AGE).await.unwrap_err();
        assert!(matches!(err, WayGoError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_locate_nearby_rejects_stale_fix() {
        let catalog = RouteCatalog::bundled().unwrap();
        let stale = PositionFix {
            position: GeoPosition::new(48.8566, 2.3522),
            captured_at: Utc::now() - chrono::Duration::minutes(5),
        };
        let source = ScriptedGeolocation::new(vec![Ok(stale)], Duration::ZERO);
        let err = locate_nearby(&source, &catalog, MAX_AGE).await.unwrap_err();
        assert!(matches!(err, WayGoError::Geolocation { .. }));
    }

    #[tokio::test]
    async fn test_watch_keeps_last_fix_on_transient_error() {
        let fix = PositionFix::now(GeoPosition::new(48.8566, 2.3522));
        let source = ScriptedGeolocation::new(
            vec![Ok(fix), Err(GeolocationError::Timeout)],
            Duration::ZERO,
        );
        let watch = PositionWatch::start(&source, MAX_AGE);
        let mut rx = watch.subscribe();

        // the channel closes once both events are consumed
        while rx.changed().await.is_ok() {}
        assert_eq!(watch.latest(), PositionUpdate::Located { fix });
    }

    #[tokio::test]
    async fn test_watch_follows_moves() {
        let catalog = Arc::new(RouteCatalog::bundled().unwrap());
        let source = ScriptedGeolocation::new(
            vec![
                Ok(PositionFix::now(GeoPosition::new(48.8566, 2.3522))),
                Ok(PositionFix::now(GeoPosition::new(45.76, 4.84))),
            ],
            Duration::from_millis(5),
        );
        let watcher = NearbyRoutesWatcher::start(&source, catalog, MAX_AGE);
        let mut rx = watcher.subscribe();

        let lyon = loop {
            if let NearbyState::Found { result } = rx.borrow_and_update().clone() {
                if result.city == "Lyon" {
                    break result;
                }
            }
            rx.changed().await.unwrap();
        };
        assert!(lyon.routes.iter().all(|r| r.city == "Lyon"));
        watcher.cancel();
    }

    #[tokio::test]
    async fn test_stale_fix_is_discarded() {
        let stale = PositionFix {
            position: GeoPosition::new(45.76, 4.84),
            captured_at: Utc::now() - chrono::Duration::minutes(5),
        };
        let fresh = PositionFix::now(GeoPosition::new(48.8566, 2.3522));
        let source = ScriptedGeolocation::new(vec![Ok(stale), Ok(fresh)], Duration::ZERO);

        let watch = PositionWatch::start(&source, MAX_AGE);
        let mut rx = watch.subscribe();
        let located = loop {
            if let Some(position) = rx.borrow_and_update().position() {
                break position;
            }
            rx.changed().await.unwrap();
        };
        assert_eq!(located, fresh.position);
    }

    #[tokio::test]
    async fn test_permission_denied_is_surfaced() {
        let catalog = Arc::new(RouteCatalog::bundled().unwrap());
        let source = ScriptedGeolocation::new(
            vec![Err(GeolocationError::PermissionDenied)],
            Duration::ZERO,
        );
        let watcher = NearbyRoutesWatcher::start(&source, catalog, MAX_AGE);
        let mut rx = watcher.subscribe();
        assert!(matches!(
            next_nearby(&mut rx).await,
            NearbyState::PermissionDenied
        ));
    }

    #[tokio::test]
    async fn test_cancel_marks_watch() {
        let source = FixedGeolocation::new(GeoPosition::new(48.0, 2.0));
        let watch = PositionWatch::start(&source, MAX_AGE);
        assert!(!watch.is_cancelled());
        watch.cancel();
        assert!(watch.is_cancelled());
    }

    #[tokio::test]
    async fn test_unsupported_source() {
        let source = NoGeolocation;
        assert_eq!(
            source.current_position().await,
            Err(GeolocationError::Unsupported)
        );
    }
}
