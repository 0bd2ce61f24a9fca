//! Google Geocoding and Elevation API: request URLs and response parsing.
//!
//! Everything here is pure; the network call lives in [`super::transport`].

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::types::{Coordinate, Elevation, LocationError, ProviderStatus, Service};

pub const GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";
pub const ELEVATION_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/elevation/json";

// ─── Request URLs ───────────────────────────────────────────────

/// Geocoding request for a free-text place.
///
/// Query values are form-urlencoded: spaces become `+`, reserved characters
/// and non-ASCII bytes are percent-encoded.
pub fn geocode_url(place: &str, api_key: &str) -> Result<Url, LocationError> {
    let mut url = Url::parse(GEOCODE_ENDPOINT)?;
    url.query_pairs_mut()
        .append_pair("address", place)
        .append_pair("key", api_key);
    Ok(url)
}

/// Elevation request for a single coordinate (`locations=lat,lng`).
///
/// Coordinate text is only digits, `.` and `-`, so `locations` goes out as
/// is with a literal comma. The key is form-urlencoded.
pub fn elevation_url(coord: Coordinate, api_key: &str) -> Result<Url, LocationError> {
    let mut url = Url::parse(ELEVATION_ENDPOINT)?;
    url.set_query(Some(&format!("locations={}", coord)));
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

/// Copy of `url` with the `key` value masked, for logs.
pub fn redacted(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "key" { "REDACTED".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    let mut masked = url.clone();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}

// ─── Responses ──────────────────────────────────────────────────

/// Fields shared by both APIs. Results stay untyped until the status says OK,
/// so odd entries in a non-OK response never fail the parse.
#[derive(Deserialize, Debug)]
struct Envelope {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Deserialize, Debug)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Deserialize, Debug)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize, Debug)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize, Debug)]
struct ElevationResult {
    elevation: f64,
}

fn parse_envelope(body: &str, service: Service) -> Result<Envelope, LocationError> {
    serde_json::from_str(body)
        .map_err(|e| LocationError::MalformedResponse(format!("{}: {}", service, e)))
}

/// Whether `body` carries a provider `status`, whatever the HTTP status was.
pub(crate) fn is_envelope(body: &str) -> bool {
    serde_json::from_str::<Envelope>(body).is_ok()
}

/// Deserialize the first entry of an OK response.
fn first_result<T: DeserializeOwned>(
    results: Vec<Value>,
    service: Service,
) -> Result<T, LocationError> {
    let first = results.into_iter().next().ok_or_else(|| {
        LocationError::MalformedResponse(format!("{}: status OK but no results", service))
    })?;
    serde_json::from_value(first)
        .map_err(|e| LocationError::MalformedResponse(format!("{}: {}", service, e)))
}

fn provider_error(service: Service, status: ProviderStatus, message: Option<String>) -> LocationError {
    LocationError::Provider {
        service,
        status: status.as_str().to_string(),
        message,
    }
}

/// Interpret a Geocoding API body.
///
/// `ZERO_RESULTS` is `Ok(None)`. With several matches the first one wins,
/// which is the provider's best match.
pub fn parse_geocode_response(body: &str) -> Result<Option<Coordinate>, LocationError> {
    let service = Service::Geocoding;
    let envelope = parse_envelope(body, service)?;

    match ProviderStatus::parse(&envelope.status) {
        ProviderStatus::Ok => {
            let result: GeocodeResult = first_result(envelope.results, service)?;
            let LatLng { lat, lng } = result.geometry.location;
            Ok(Some(Coordinate::new(lat, lng)))
        }
        ProviderStatus::ZeroResults => Ok(None),
        other => Err(provider_error(service, other, envelope.error_message)),
    }
}

/// Interpret an Elevation API body.
///
/// `INVALID_REQUEST` (e.g. coordinates out of range) is `Ok(None)`. One
/// result is expected per requested location; the first is used.
pub fn parse_elevation_response(body: &str) -> Result<Option<Elevation>, LocationError> {
    let service = Service::Elevation;
    let envelope = parse_envelope(body, service)?;

    match ProviderStatus::parse(&envelope.status) {
        ProviderStatus::Ok => {
            let result: ElevationResult = first_result(envelope.results, service)?;
            Ok(Some(Elevation(result.elevation)))
        }
        ProviderStatus::InvalidRequest => Ok(None),
        other => Err(provider_error(service, other, envelope.error_message)),
    }
}
