//! Location resolver: place → coordinate → elevation.
//!
//! Every public call is one blocking round trip per provider touched, with
//! no shared mutable state. Share a resolver across threads with `Arc`.

use std::time::Duration;

use log::{debug, info};

use super::providers;
use super::transport::{HttpTransport, Transport};
use super::types::{Coordinate, Elevation, LocationError, LocationFix, ResolveOptions};

/// Resolves places and coordinates against the Google Maps web services.
pub struct LocationResolver {
    api_key: String,
    default_timeout: Option<Duration>,
    transport: Box<dyn Transport>,
}

impl LocationResolver {
    /// Resolver over HTTPS with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, LocationError> {
        Self::with_transport(api_key, HttpTransport::new())
    }

    /// Create a resolver with a specific transport (for testing).
    pub fn with_transport(
        api_key: impl Into<String>,
        transport: impl Transport + 'static,
    ) -> Result<Self, LocationError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LocationError::Configuration("API key is empty".into()));
        }
        Ok(Self {
            api_key,
            default_timeout: None,
            transport: Box::new(transport),
        })
    }

    /// Timeout applied when a call does not set its own.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Geocode a free-text place. `Ok(None)` when the provider has no match.
    pub fn resolve_coordinate(&self, place: &str) -> Result<Option<Coordinate>, LocationError> {
        self.resolve_coordinate_with_opts(place, &ResolveOptions::default())
    }

    pub fn resolve_coordinate_with_opts(
        &self,
        place: &str,
        opts: &ResolveOptions,
    ) -> Result<Option<Coordinate>, LocationError> {
        if place.trim().is_empty() {
            return Err(LocationError::Configuration("place is empty".into()));
        }

        let url = providers::geocode_url(place, &self.api_key)?;
        let body = self.fetch(&url, opts)?;
        let coord = providers::parse_geocode_response(&body)?;

        match coord {
            Some(c) => info!("Geocoded '{}' -> {}", place, c),
            None => info!("No geocoding results for '{}'", place),
        }
        Ok(coord)
    }

    /// Elevation at a coordinate. `Ok(None)` when the provider rejects the
    /// coordinate as invalid.
    pub fn resolve_elevation(&self, coord: Coordinate) -> Result<Option<Elevation>, LocationError> {
        self.resolve_elevation_with_opts(coord, &ResolveOptions::default())
    }

    pub fn resolve_elevation_with_opts(
        &self,
        coord: Coordinate,
        opts: &ResolveOptions,
    ) -> Result<Option<Elevation>, LocationError> {
        let url = providers::elevation_url(coord, &self.api_key)?;
        let body = self.fetch(&url, opts)?;
        let elevation = providers::parse_elevation_response(&body)?;

        match elevation {
            Some(e) => info!("Elevation at {} -> {}", coord, e),
            None => info!("Elevation request rejected for {}", coord),
        }
        Ok(elevation)
    }

    /// Coordinate and elevation of a place.
    ///
    /// The elevation request is only made once the place geocoded to
    /// something; a miss or an error stops there.
    pub fn resolve_full(&self, place: &str) -> Result<Option<LocationFix>, LocationError> {
        self.resolve_full_with_opts(place, &ResolveOptions::default())
    }

    pub fn resolve_full_with_opts(
        &self,
        place: &str,
        opts: &ResolveOptions,
    ) -> Result<Option<LocationFix>, LocationError> {
        let Some(coordinate) = self.resolve_coordinate_with_opts(place, opts)? else {
            return Ok(None);
        };
        let Some(elevation) = self.resolve_elevation_with_opts(coordinate, opts)? else {
            return Ok(None);
        };
        Ok(Some(LocationFix {
            coordinate,
            elevation,
        }))
    }

    /// Elevation of a named place (geocode, then elevation).
    pub fn resolve_place_elevation(&self, place: &str) -> Result<Option<Elevation>, LocationError> {
        self.resolve_place_elevation_with_opts(place, &ResolveOptions::default())
    }

    pub fn resolve_place_elevation_with_opts(
        &self,
        place: &str,
        opts: &ResolveOptions,
    ) -> Result<Option<Elevation>, LocationError> {
        Ok(self.resolve_full_with_opts(place, opts)?.map(|fix| fix.elevation))
    }

    fn fetch(&self, url: &url::Url, opts: &ResolveOptions) -> Result<String, LocationError> {
        let timeout = opts.timeout.or(self.default_timeout);
        debug!("GET {} (timeout {:?})", providers::redacted(url), timeout);
        self.transport.get(url, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use url::Url;

    const GEO_PARIS: &str = r#"{ "status": "OK", "results": [
        { "geometry": { "location": { "lat": 48.8566, "lng": 2.3522 } } },
        { "geometry": { "location": { "lat": 33.6609, "lng": -95.5555 } } }
    ] }"#;
    const GEO_NONE: &str = r#"{ "status": "ZERO_RESULTS", "results": [] }"#;
    const ELE_PARIS: &str = r#"{ "status": "OK", "results": [ { "elevation": 35.5 } ] }"#;
    const ELE_INVALID: &str = r#"{ "status": "INVALID_REQUEST", "results": [] }"#;
    const OVER_LIMIT: &str = r#"{ "status": "OVER_QUERY_LIMIT", "results": [] }"#;

    /// Canned bodies per endpoint, with a record of every request.
    #[derive(Clone, Default)]
    struct MockTransport {
        geocode: Option<String>,
        elevation: Option<String>,
        fail: Option<fn() -> LocationError>,
        requests: Arc<Mutex<Vec<(Url, Option<Duration>)>>>,
    }

    impl MockTransport {
        fn new(geocode: &str, elevation: &str) -> Self {
            Self {
                geocode: Some(geocode.into()),
                elevation: Some(elevation.into()),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn calls_to(&self, path_fragment: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|(u, _)| u.path().contains(path_fragment))
                .count()
        }
    }

    impl Transport for MockTransport {
        fn get(&self, url: &Url, timeout: Option<Duration>) -> Result<String, LocationError> {
            self.requests.lock().unwrap().push((url.clone(), timeout));
            if let Some(fail) = self.fail {
                return Err(fail());
            }
            let body = if url.path().contains("/geocode/") {
                &self.geocode
            } else {
                &self.elevation
            };
            body.clone()
                .ok_or_else(|| LocationError::Transport("no canned body".into()))
        }
    }

    fn resolver(mock: &MockTransport) -> LocationResolver {
        LocationResolver::with_transport("test-key", mock.clone()).unwrap()
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = LocationResolver::with_transport("  ", MockTransport::default());
        assert!(matches!(result, Err(LocationError::Configuration(_))));
    }

    #[test]
    fn test_blank_place_rejected_without_request() {
        let mock = MockTransport::new(GEO_PARIS, ELE_PARIS);
        let r = resolver(&mock);
        assert!(matches!(r.resolve_coordinate(""), Err(LocationError::Configuration(_))));
        assert!(matches!(r.resolve_full("   \t"), Err(LocationError::Configuration(_))));
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn test_resolve_coordinate_first_wins() {
        let mock = MockTransport::new(GEO_PARIS, ELE_PARIS);
        let coord = resolver(&mock).resolve_coordinate("Paris").unwrap().unwrap();
        assert_relative_eq!(coord.lat, 48.8566);
        assert_relative_eq!(coord.lng, 2.3522);
        assert_eq!(mock.calls(), 1);
    }

    #[test]
    fn test_request_carries_place_and_key() {
        let mock = MockTransport::new(GEO_PARIS, ELE_PARIS);
        resolver(&mock).resolve_coordinate("Rue de Rivoli & Louvre").unwrap();
        let requests = mock.requests.lock().unwrap();
        let q: HashMap<String, String> = requests[0].0.query_pairs().into_owned().collect();
        assert_eq!(q["address"], "Rue de Rivoli & Louvre");
        assert_eq!(q["key"], "test-key");
    }

    #[test]
    fn test_resolve_coordinate_zero_results() {
        let mock = MockTransport::new(GEO_NONE, ELE_PARIS);
        assert!(resolver(&mock).resolve_coordinate("Nowhere").unwrap().is_none());
    }

    #[test]
    fn test_resolve_elevation() {
        let mock = MockTransport::new(GEO_PARIS, ELE_PARIS);
        let elevation = resolver(&mock)
            .resolve_elevation(Coordinate::new(48.8566, 2.3522))
            .unwrap()
            .unwrap();
        assert_relative_eq!(elevation.masl(), 35.5);
        assert_eq!(mock.calls_to("/elevation/"), 1);
    }

    #[test]
    fn test_resolve_elevation_invalid_is_absent() {
        let mock = MockTransport::new(GEO_PARIS, ELE_INVALID);
        let result = resolver(&mock).resolve_elevation(Coordinate::new(123.0, 456.0));
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_over_query_limit_surfaces() {
        let mock = MockTransport::new(OVER_LIMIT, OVER_LIMIT);
        let r = resolver(&mock);
        let geo = r.resolve_coordinate("Paris").unwrap_err();
        assert_eq!(geo.provider_status(), Some("OVER_QUERY_LIMIT"));
        let ele = r.resolve_elevation(Coordinate::new(1.0, 2.0)).unwrap_err();
        assert_eq!(ele.provider_status(), Some("OVER_QUERY_LIMIT"));
    }

    #[test]
    fn test_truncated_body_is_malformed() {
        let mock = MockTransport::new(r#"{ "status": "OK", "res"#, r#"{ "status"#);
        let r = resolver(&mock);
        assert!(matches!(
            r.resolve_coordinate("Paris"),
            Err(LocationError::MalformedResponse(_))
        ));
        assert!(matches!(
            r.resolve_elevation(Coordinate::new(1.0, 2.0)),
            Err(LocationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_resolve_full() {
        let mock = MockTransport::new(GEO_PARIS, ELE_PARIS);
        let fix = resolver(&mock).resolve_full("Paris").unwrap().unwrap();
        assert_relative_eq!(fix.coordinate.lat, 48.8566);
        assert_relative_eq!(fix.elevation.masl(), 35.5);
        assert_eq!(mock.calls_to("/geocode/"), 1);
        assert_eq!(mock.calls_to("/elevation/"), 1);

        let requests = mock.requests.lock().unwrap();
        let q: HashMap<String, String> = requests[1].0.query_pairs().into_owned().collect();
        assert_eq!(q["locations"], "48.8566,2.3522");
    }

    #[test]
    fn test_resolve_full_not_found_skips_elevation() {
        let mock = MockTransport::new(GEO_NONE, ELE_PARIS);
        assert!(resolver(&mock).resolve_full("Atlantis").unwrap().is_none());
        assert_eq!(mock.calls_to("/geocode/"), 1);
        assert_eq!(mock.calls_to("/elevation/"), 0);
    }

    #[test]
    fn test_resolve_full_error_skips_elevation() {
        let mock = MockTransport::new(OVER_LIMIT, ELE_PARIS);
        let err = resolver(&mock).resolve_full("Paris").unwrap_err();
        assert_eq!(err.provider_status(), Some("OVER_QUERY_LIMIT"));
        assert_eq!(mock.calls_to("/elevation/"), 0);
    }

    #[test]
    fn test_resolve_full_elevation_absent() {
        let mock = MockTransport::new(GEO_PARIS, ELE_INVALID);
        assert!(resolver(&mock).resolve_full("Paris").unwrap().is_none());
        assert_eq!(mock.calls(), 2);
    }

    #[test]
    fn test_resolve_place_elevation() {
        let mock = MockTransport::new(GEO_PARIS, ELE_PARIS);
        let elevation = resolver(&mock).resolve_place_elevation("Paris").unwrap().unwrap();
        assert_relative_eq!(elevation.masl(), 35.5);
    }

    #[test]
    fn test_transport_errors_propagate() {
        let mock = MockTransport {
            fail: Some(|| LocationError::TimedOut),
            ..Default::default()
        };
        let r = resolver(&mock);
        assert!(matches!(r.resolve_coordinate("Paris"), Err(LocationError::TimedOut)));

        let mock = MockTransport {
            fail: Some(|| LocationError::Transport("connection reset".into())),
            ..Default::default()
        };
        let r = resolver(&mock);
        assert!(matches!(
            r.resolve_elevation(Coordinate::new(0.0, 0.0)),
            Err(LocationError::Transport(_))
        ));
    }

    #[test]
    fn test_timeout_precedence() {
        let mock = MockTransport::new(GEO_PARIS, ELE_PARIS);
        let r = resolver(&mock).with_default_timeout(Some(Duration::from_secs(10)));

        r.resolve_coordinate("Paris").unwrap();
        r.resolve_coordinate_with_opts("Paris", &ResolveOptions::with_timeout(Duration::from_millis(250)))
            .unwrap();

        let requests = mock.requests.lock().unwrap();
        assert_eq!(requests[0].1, Some(Duration::from_secs(10)));
        assert_eq!(requests[1].1, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_no_timeout_by_default() {
        let mock = MockTransport::new(GEO_PARIS, ELE_PARIS);
        let r = resolver(&mock);
        assert_eq!(r.default_timeout(), None);
        r.resolve_full("Paris").unwrap();
        assert!(mock.requests.lock().unwrap().iter().all(|(_, t)| t.is_none()));
    }

    /// Answers each geocode request with coordinates derived from the address.
    struct EchoTransport {
        calls: AtomicUsize,
    }

    impl Transport for EchoTransport {
        fn get(&self, url: &Url, _timeout: Option<Duration>) -> Result<String, LocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let address = url
                .query_pairs()
                .find(|(k, _)| k == "address")
                .map(|(_, v)| v.into_owned())
                .unwrap_or_default();
            let n: f64 = address.trim_start_matches("place-").parse().unwrap_or(-1.0);
            std::thread::yield_now();
            Ok(format!(
                r#"{{ "status": "OK", "results": [ {{ "geometry": {{ "location": {{ "lat": {}, "lng": {} }} }} }} ] }}"#,
                n,
                -n
            ))
        }
    }

    #[test]
    fn test_concurrent_calls_do_not_cross() {
        let r = Arc::new(
            LocationResolver::with_transport(
                "k",
                EchoTransport {
                    calls: AtomicUsize::new(0),
                },
            )
            .unwrap(),
        );

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..32)
                .map(|i| {
                    let r = Arc::clone(&r);
                    s.spawn(move || {
                        let coord = r.resolve_coordinate(&format!("place-{}", i)).unwrap().unwrap();
                        (i, coord)
                    })
                })
                .collect();

            for h in handles {
                let (i, coord) = h.join().unwrap();
                assert_relative_eq!(coord.lat, i as f64);
                assert_relative_eq!(coord.lng, -(i as f64));
            }
        });
    }
}
