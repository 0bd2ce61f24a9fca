//! Location subsystem for geofix.
//!
//! Turns place names into coordinates and coordinates into elevation using
//! the Google Geocoding and Elevation web services.

pub mod providers;
pub mod resolver;
pub mod transport;
pub mod types;

pub use resolver::LocationResolver;
pub use transport::{HttpTransport, Transport};
pub use types::{
    format_coords, Coordinate, Elevation, LocationError, LocationFix, ProviderStatus, ResolveOptions,
    Service,
};
