//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A point on the globe in decimal degrees.
///
/// No range checks are applied here; the providers are the authority on
/// what is a valid position. `0.0` is an ordinary value, not "unset".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Human-readable form, e.g. `59.3293°N, 18.0686°E`.
    pub fn pretty(&self) -> String {
        format_coords(self.lat, self.lng)
    }
}

/// `lat,lng` exactly as the elevation endpoint expects it.
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Format coordinates with hemisphere letters.
pub fn format_coords(lat: f64, lng: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lng >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", lat.abs(), ns, lng.abs(), ew)
}

/// Meters above sea level.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Elevation(pub f64);

impl Elevation {
    pub fn masl(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Elevation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} MASL", self.0)
    }
}

/// Coordinate plus elevation; only built when both lookups found something.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub elevation: Elevation,
}

impl LocationFix {
    pub fn display_line(&self) -> String {
        format!(
            "\u{1F4CD} {}\n  \u{26F0}\u{FE0F}  {}",
            self.coordinate.pretty(),
            self.elevation
        )
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Deadline for the whole request; falls back to the resolver default.
    pub timeout: Option<Duration>,
}

impl ResolveOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Which upstream API produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Service {
    Geocoding,
    Elevation,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Geocoding => write!(f, "Geocoding API"),
            Self::Elevation => write!(f, "Elevation API"),
        }
    }
}

/// The `status` field of a provider response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    OverDailyLimit,
    RequestDenied,
    InvalidRequest,
    UnknownError,
    DataNotAvailable,
    Other(String),
}

impl ProviderStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "OK" => Self::Ok,
            "ZERO_RESULTS" => Self::ZeroResults,
            "OVER_QUERY_LIMIT" => Self::OverQueryLimit,
            "OVER_DAILY_LIMIT" => Self::OverDailyLimit,
            "REQUEST_DENIED" => Self::RequestDenied,
            "INVALID_REQUEST" => Self::InvalidRequest,
            "UNKNOWN_ERROR" => Self::UnknownError,
            "DATA_NOT_AVAILABLE" => Self::DataNotAvailable,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::ZeroResults => "ZERO_RESULTS",
            Self::OverQueryLimit => "OVER_QUERY_LIMIT",
            Self::OverDailyLimit => "OVER_DAILY_LIMIT",
            Self::RequestDenied => "REQUEST_DENIED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::UnknownError => "UNKNOWN_ERROR",
            Self::DataNotAvailable => "DATA_NOT_AVAILABLE",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location resolution errors.
///
/// "Nothing found" is not an error; operations return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum LocationError {
    /// Missing API key, blank place, unreadable config file.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request URL could not be built.
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The provider answered with a non-OK status.
    #[error("{service} returned {status}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Provider {
        service: Service,
        status: String,
        message: Option<String>,
    },

    /// DNS, connect, TLS, reset, or a non-2xx HTTP status.
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    TimedOut,

    /// Body was not JSON, or an OK response lacked the expected fields.
    #[error("Invalid API response: {0}")]
    MalformedResponse(String),
}

impl LocationError {
    /// Whether repeating the same call later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::TimedOut => true,
            Self::Provider { status, .. } => matches!(
                ProviderStatus::parse(status),
                ProviderStatus::OverQueryLimit | ProviderStatus::UnknownError
            ),
            _ => false,
        }
    }

    /// The raw provider status, if this is a provider error.
    pub fn provider_status(&self) -> Option<&str> {
        match self {
            Self::Provider { status, .. } => Some(status),
            _ => None,
        }
    }
}
