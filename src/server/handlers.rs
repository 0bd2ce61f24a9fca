use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::location::{Coordinate, Elevation, LocationError, LocationFix};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

#[derive(Debug)]
pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

impl From<LocationError> for ApiError {
    fn from(e: LocationError) -> Self {
        api_error(status_for(&e), e.to_string())
    }
}

/// Upstream trouble is a gateway error; bad input is the caller's.
fn status_for(e: &LocationError) -> StatusCode {
    match e {
        LocationError::Configuration(_) => StatusCode::BAD_REQUEST,
        LocationError::TimedOut => StatusCode::GATEWAY_TIMEOUT,
        LocationError::Provider { .. }
        | LocationError::Transport(_)
        | LocationError::MalformedResponse(_) => StatusCode::BAD_GATEWAY,
        LocationError::InvalidUrl(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn not_found(what: impl Into<String>) -> ApiError {
    api_error(StatusCode::NOT_FOUND, what)
}

/// Run a blocking lookup off the async workers.
async fn blocking<T, F>(state: Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, LocationError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| {
            warn!("lookup failed: {}", e);
            ApiError::from(e)
        })
}

fn required_place(place: Option<String>) -> Result<String, ApiError> {
    place
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing 'place' parameter"))
}

// ─── GET /api/coordinate ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct PlaceQuery {
    pub place: Option<String>,
}

pub(super) async fn coordinate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlaceQuery>,
) -> Result<Json<Coordinate>, ApiError> {
    let start = Instant::now();
    let place = required_place(params.place)?;

    let q = place.clone();
    let found = blocking(state, move |s| s.resolver.resolve_coordinate(&q)).await?;

    info!(
        "GET /api/coordinate?place={} -> {} ({:.1}ms)",
        place,
        found.map(|c| c.to_string()).unwrap_or_else(|| "not found".into()),
        start.elapsed().as_secs_f64() * 1000.0,
    );

    found
        .map(Json)
        .ok_or_else(|| not_found(format!("Location not found: '{}'", place)))
}

// ─── GET /api/elevation ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct ElevationQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ElevationResponse {
    pub lat: f64,
    pub lng: f64,
    pub elevation: Elevation,
}

pub(super) async fn elevation(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ElevationQuery>,
) -> Result<Json<ElevationResponse>, ApiError> {
    let start = Instant::now();
    let (Some(lat), Some(lng)) = (params.lat, params.lng) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Provide 'lat' and 'lng' parameters"));
    };
    let coord = Coordinate::new(lat, lng);

    let found = blocking(state, move |s| s.resolver.resolve_elevation(coord)).await?;

    info!(
        "GET /api/elevation?lat={}&lng={} -> {} ({:.1}ms)",
        lat,
        lng,
        found.map(|e| e.to_string()).unwrap_or_else(|| "rejected".into()),
        start.elapsed().as_secs_f64() * 1000.0,
    );

    found
        .map(|elevation| Json(ElevationResponse { lat, lng, elevation }))
        .ok_or_else(|| not_found(format!("No elevation available for {}", coord)))
}

// ─── GET /api/fix ────────────────────────────────────────────────

pub(super) async fn fix(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlaceQuery>,
) -> Result<Json<LocationFix>, ApiError> {
    let start = Instant::now();
    let place = required_place(params.place)?;

    let q = place.clone();
    let found = blocking(state, move |s| s.resolver.resolve_full(&q)).await?;

    info!(
        "GET /api/fix?place={} -> {} ({:.1}ms)",
        place,
        if found.is_some() { "found" } else { "not found" },
        start.elapsed().as_secs_f64() * 1000.0,
    );

    found
        .map(Json)
        .ok_or_else(|| not_found(format!("Location not found: '{}'", place)))
}
