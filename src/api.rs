use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::WayGoError;
use crate::catalog::RouteCatalog;
use crate::models::{Difficulty, GeoPosition, RouteRecord};
use crate::proximity::{self, ProximityResult};
use crate::travel_time::{self, MovementMode, TravelDuration};

#[derive(Clone)]
pub struct ApiState {
    pub catalog: Arc<RouteCatalog>,
}

/// Error body returned by every failing endpoint
#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl From<WayGoError> for ApiError {
    fn from(err: WayGoError) -> Self {
        let status = match &err {
            WayGoError::NoRoutes | WayGoError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            WayGoError::Validation { .. } => StatusCode::BAD_REQUEST,
            WayGoError::Provider { .. } => StatusCode::BAD_GATEWAY,
            WayGoError::PermissionDenied => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", err);
        }
        Self {
            error: err.user_message(),
            status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Deserialize)]
pub struct ListQuery {
    pub city: Option<String>,
    pub difficulty: Option<String>,
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize)]
pub struct EstimateQuery {
    pub meters: f64,
    pub mode: Option<String>,
}

#[derive(Deserialize)]
pub struct ModeQuery {
    pub mode: Option<String>,
}

#[derive(Serialize)]
pub struct EstimateResponse {
    pub mode: MovementMode,
    pub distance_meters: f64,
    pub duration: TravelDuration,
    pub text: String,
}

impl EstimateResponse {
    fn new(distance_meters: f64, mode: MovementMode, duration: TravelDuration) -> Self {
        Self {
            mode,
            distance_meters,
            duration,
            text: duration.to_string(),
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/parcours", get(list_routes))
        .route("/parcours/nearby", get(nearby_routes))
        .route("/parcours/{key}", get(get_route))
        .route("/parcours/{key}/estimate", get(estimate_route))
        .route("/estimate", get(estimate))
        .with_state(state)
}

fn parse_mode(mode: Option<&str>) -> Result<MovementMode, WayGoError> {
    mode.map_or(Ok(MovementMode::default()), str::parse)
}

async fn list_routes(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<RouteRecord>> {
    let difficulty = query
        .difficulty
        .as_deref()
        .map(str::parse::<Difficulty>)
        .transpose()?;

    let routes = state
        .catalog
        .iter()
        .filter(|r| query.city.as_deref().is_none_or(|city| r.city == city))
        .filter(|r| difficulty.is_none_or(|d| r.difficulty == d))
        .cloned()
        .collect();
    Ok(Json(routes))
}

async fn get_route(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> ApiResult<RouteRecord> {
    Ok(Json(state.catalog.require(&key)?.clone()))
}

async fn nearby_routes(
    State(state): State<ApiState>,
    Query(query): Query<NearbyQuery>,
) -> ApiResult<ProximityResult> {
    let position = GeoPosition::checked(query.lat, query.lng)?;
    Ok(Json(proximity::nearby(&position, state.catalog.as_ref())?))
}

async fn estimate(Query(query): Query<EstimateQuery>) -> ApiResult<EstimateResponse> {
    let mode = parse_mode(query.mode.as_deref())?;
    let duration = travel_time::estimate_duration(query.meters, mode)?;
    Ok(Json(EstimateResponse::new(query.meters, mode, duration)))
}

async fn estimate_route(
    State(state): State<ApiState>,
    Path(key): Path<String>,
    Query(query): Query<ModeQuery>,
) -> ApiResult<EstimateResponse> {
    let record = state.catalog.require(&key)?;
    let mode = parse_mode(query.mode.as_deref())?;
    let duration = travel_time::estimate_route(record, mode)?;
    Ok(Json(EstimateResponse::new(
        record.distance_meters(),
        mode,
        duration,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (WayGoError::NoRoutes, StatusCode::NOT_FOUND),
            (WayGoError::route_not_found("x"), StatusCode::NOT_FOUND),
            (WayGoError::validation("bad"), StatusCode::BAD_REQUEST),
            (WayGoError::provider("OVER_QUERY_LIMIT"), StatusCode::BAD_GATEWAY),
            (WayGoError::catalog("broken"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn test_parse_mode_defaults_to_walking() {
        assert_eq!(parse_mode(None).unwrap(), MovementMode::Walking);
        assert_eq!(parse_mode(Some("course")).unwrap(), MovementMode::Running);
        assert!(parse_mode(Some("swim")).is_err());
    }
}
