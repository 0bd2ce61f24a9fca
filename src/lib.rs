//! geofix: resolve place names to coordinates and elevation (MASL) using
//! the Google Geocoding and Elevation APIs.
//!
//! ```no_run
//! use geofix::location::LocationResolver;
//!
//! let resolver = LocationResolver::new("YOUR_API_KEY")?;
//! if let Some(fix) = resolver.resolve_full("Trondheim")? {
//!     println!("{} at {}", fix.coordinate, fix.elevation);
//! }
//! # Ok::<(), geofix::location::LocationError>(())
//! ```

pub mod config;
pub mod location;
pub mod server;
