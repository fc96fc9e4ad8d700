use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{
    DirectionsFailure, DirectionsProvider, DirectionsRequest, DirectionsResult, Leg,
    STATUS_OK, STATUS_PARSE_ERROR, STATUS_TRANSPORT_ERROR, STATUS_ZERO_RESULTS, polyline,
};
use crate::config::DirectionsConfig;
use crate::{Result, WayGoError};

/// Google Directions API client
pub struct GoogleDirectionsClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    language: String,
}

/// Directions API response
#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    summary: Option<String>,
    #[serde(default)]
    legs: Vec<ApiLeg>,
    overview_polyline: Option<ApiPolyline>,
    #[serde(default)]
    waypoint_order: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct ApiLeg {
    distance: Option<TextValue>,
    duration: Option<TextValue>,
    #[serde(default)]
    start_address: String,
    #[serde(default)]
    end_address: String,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct ApiPolyline {
    points: String,
}

impl GoogleDirectionsClient {
    /// Create a new client. Fails when no API key is configured.
    pub fn new(config: &DirectionsConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| WayGoError::config("A directions API key is required"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(u64::from(config.timeout_seconds)))
            .user_agent(concat!("WayGo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WayGoError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(http)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
            language: config.language.clone(),
        })
    }

    fn request_url(&self, request: &DirectionsRequest) -> String {
        let mut url = format!(
            "{}?origin={}&destination={}&mode={}&language={}&key={}",
            self.base_url,
            request.origin.to_query(),
            request.destination.to_query(),
            request.travel_mode,
            urlencoding::encode(&self.language),
            urlencoding::encode(&self.api_key)
        );

        if !request.waypoints.is_empty() {
            let mut parts: Vec<String> = Vec::with_capacity(request.waypoints.len() + 1);
            if request.optimize_waypoints {
                parts.push("optimize:true".to_string());
            }
            for waypoint in &request.waypoints {
                let prefix = if waypoint.stopover { "" } else { "via:" };
                parts.push(format!("{prefix}{}", waypoint.position.to_query()));
            }
            url.push_str("&waypoints=");
            url.push_str(&urlencoding::encode(&parts.join("|")));
        }

        url
    }
}

/// Map a raw provider answer into crate types
fn into_result(response: ApiResponse) -> std::result::Result<DirectionsResult, DirectionsFailure> {
    if response.status != STATUS_OK {
        let failure = DirectionsFailure::new(response.status);
        return Err(match response.error_message {
            Some(message) => failure.with_message(message),
            None => failure,
        });
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| DirectionsFailure::new(STATUS_ZERO_RESULTS))?;

    let path = match &route.overview_polyline {
        Some(overview) => polyline::decode(&overview.points).map_err(|e| {
            DirectionsFailure::new(STATUS_PARSE_ERROR).with_message(e.to_string())
        })?,
        None => Vec::new(),
    };

    let legs = route
        .legs
        .into_iter()
        .map(|leg| {
            let (distance_meters, distance_text) = leg
                .distance
                .map(|d| (d.value, d.text))
                .unwrap_or_default();
            let (duration_seconds, duration_text) = leg
                .duration
                .map(|d| (d.value, d.text))
                .unwrap_or_default();
            Leg {
                distance_meters,
                duration_seconds,
                distance_text,
                duration_text,
                start_label: leg.start_address,
                end_label: leg.end_address,
            }
        })
        .collect();

    Ok(DirectionsResult {
        legs,
        path,
        waypoint_order: route.waypoint_order,
        summary: route.summary.filter(|s| !s.is_empty()),
    })
}

#[async_trait]
impl DirectionsProvider for GoogleDirectionsClient {
    #[instrument(skip_all, fields(mode = %request.travel_mode, waypoints = request.waypoints.len()))]
    async fn route(
        &self,
        request: &DirectionsRequest,
    ) -> std::result::Result<DirectionsResult, DirectionsFailure> {
        debug!("Calling the directions API");
        let url = self.request_url(request);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Directions request failed: {}", e);
            DirectionsFailure::new(STATUS_TRANSPORT_ERROR).with_message(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Directions API returned HTTP {}: {}", status, body);
            return Err(DirectionsFailure::new(format!("HTTP_{}", status.as_u16())).with_message(body));
        }

        let body: ApiResponse = response.json().await.map_err(|e| {
            DirectionsFailure::new(STATUS_PARSE_ERROR)
                .with_message(format!("Failed to parse directions response: {e}"))
        })?;

        let result = into_result(body);
        match &result {
            Ok(directions) => debug!(
                "Directions found: {} legs, {} m",
                directions.legs.len(),
                directions.total_distance_meters()
            ),
            Err(failure) => warn!("Directions request failed due to {}", failure.status),
        }
        result
    }
}
