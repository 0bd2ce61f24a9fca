//! Network seam: one blocking GET that returns the response body.

use std::io;
use std::time::Duration;

use log::debug;
use url::Url;

use super::providers;
use super::types::LocationError;

const USER_AGENT: &str = concat!("geofix/", env!("CARGO_PKG_VERSION"));

/// Performs a single GET and hands back the body text.
///
/// Implementations must be shareable across threads; the resolver never
/// holds a lock around a call.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url, timeout: Option<Duration>) -> Result<String, LocationError>;
}

/// `ureq`-backed transport used outside of tests.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(USER_AGENT).build(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url, timeout: Option<Duration>) -> Result<String, LocationError> {
        let mut request = self.agent.request_url("GET", url);
        if let Some(t) = timeout {
            request = request.timeout(t);
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => return error_status_body(code, response),
            Err(ureq::Error::Transport(t)) => return Err(map_transport_error(t)),
        };
        debug!("{} answered HTTP {}", url.path(), response.status());
        read_body(response)
    }
}

fn read_body(response: ureq::Response) -> Result<String, LocationError> {
    response.into_string().map_err(|e| {
        if is_timeout(&e) {
            LocationError::TimedOut
        } else {
            LocationError::Transport(e.to_string())
        }
    })
}

/// A non-2xx reply that still carries a provider `status` is handed to the
/// parsers like any other body.
fn error_status_body(code: u16, response: ureq::Response) -> Result<String, LocationError> {
    let status_line = format!("HTTP {} {}", code, response.status_text());
    match read_body(response) {
        Ok(body) if providers::is_envelope(&body) => {
            debug!("{} with provider body", status_line);
            Ok(body)
        }
        Ok(_) => Err(LocationError::Transport(status_line)),
        Err(e) => Err(e),
    }
}

fn map_transport_error(t: ureq::Transport) -> LocationError {
    let timed_out = std::error::Error::source(&t)
        .and_then(|s| s.downcast_ref::<io::Error>())
        .is_some_and(is_timeout);
    if timed_out {
        LocationError::TimedOut
    } else {
        LocationError::Transport(t.to_string())
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}
