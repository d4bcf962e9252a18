//! Endpoint discovery with a well-known fallback.
//!
//! The client asks a discovery backend (mDNS in a real deployment) where the
//! controller listens. Discovery never fails the client: when nothing answers
//! in time, or the backend itself errors, the well-known default endpoint is
//! used and the caller tells the user so.

use crate::error::DiscoveryError;
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Host and port of the remote controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// Control port.
    pub port: u16,
}

impl Endpoint {
    /// Creates an endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A service discovery backend.
pub trait ServiceDiscovery: Send + Sync {
    /// Looks up `service_type` for at most `timeout`.
    ///
    /// Returns `Ok(None)` if no responder answered.
    fn query(&self, service_type: &str, timeout: Duration)
        -> Result<Option<Endpoint>, DiscoveryError>;
}

/// Outcome of endpoint resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A responder answered.
    Found(Endpoint),
    /// Nothing answered, or discovery failed; the default endpoint is used.
    Fallback(Endpoint),
}

impl Resolution {
    /// The resolved endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        match self {
            Resolution::Found(endpoint) | Resolution::Fallback(endpoint) => endpoint,
        }
    }

    /// Consumes the resolution, returning the endpoint.
    pub fn into_endpoint(self) -> Endpoint {
        match self {
            Resolution::Found(endpoint) | Resolution::Fallback(endpoint) => endpoint,
        }
    }

    /// Returns true if the default endpoint is used.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback(_))
    }

    /// User-facing notice describing the result.
    pub fn notice(&self) -> String {
        match self {
            Resolution::Found(endpoint) => {
                format!("... found on port {}, ip: {}", endpoint.port, endpoint.host)
            }
            Resolution::Fallback(endpoint) => {
                format!("... not found, use default port {}", endpoint.port)
            }
        }
    }
}

/// Resolves the controller endpoint, falling back to `fallback`.
pub fn resolve<D>(
    discovery: &D,
    service_type: &str,
    timeout: Duration,
    fallback: &Endpoint,
) -> Resolution
where
    D: ServiceDiscovery + ?Sized,
{
    debug!(service_type, ?timeout, "querying service discovery");
    match discovery.query(service_type, timeout) {
        Ok(Some(endpoint)) => {
            info!(%endpoint, "controller discovered");
            Resolution::Found(endpoint)
        }
        Ok(None) => {
            info!(%fallback, "no controller answered discovery, using default endpoint");
            Resolution::Fallback(fallback.clone())
        }
        Err(e) => {
            warn!(error = %e, %fallback, "service discovery failed, using default endpoint");
            Resolution::Fallback(fallback.clone())
        }
    }
}

/// A backend that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiscovery;

impl ServiceDiscovery for NoDiscovery {
    fn query(&self, _service_type: &str, _timeout: Duration) -> Result<Option<Endpoint>, DiscoveryError> {
        Ok(None)
    }
}

/// A backend with a fixed answer. Records the queries it receives.
#[derive(Debug)]
pub struct StaticDiscovery {
    answer: Result<Option<Endpoint>, DiscoveryError>,
    queries: Mutex<Vec<(String, Duration)>>,
}

impl StaticDiscovery {
    /// Always answers with `endpoint`.
    pub fn found(endpoint: Endpoint) -> Self {
        Self::with_answer(Ok(Some(endpoint)))
    }

    /// Never finds a responder.
    pub fn not_found() -> Self {
        Self::with_answer(Ok(None))
    }

    /// Always fails.
    pub fn failing(error: DiscoveryError) -> Self {
        Self::with_answer(Err(error))
    }

    fn with_answer(answer: Result<Option<Endpoint>, DiscoveryError>) -> Self {
        Self {
            answer,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Queries received so far, as `(service_type, timeout)`.
    pub fn queries(&self) -> Vec<(String, Duration)> {
        self.queries.lock().clone()
    }
}

impl ServiceDiscovery for StaticDiscovery {
    fn query(&self, service_type: &str, timeout: Duration) -> Result<Option<Endpoint>, DiscoveryError> {
        self.queries.lock().push((service_type.to_string(), timeout));
        self.answer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> Endpoint {
        Endpoint::new("pixelcontroller.local", 9876)
    }

    #[test]
    fn found_endpoint() {
        let discovery = StaticDiscovery::found(Endpoint::new("192.168.1.20", 9000));
        let resolution = resolve(&discovery, "_pix._udp", Duration::from_millis(50), &fallback());

        assert!(!resolution.is_fallback());
        assert_eq!(resolution.endpoint(), &Endpoint::new("192.168.1.20", 9000));
        assert_eq!(resolution.notice(), "... found on port 9000, ip: 192.168.1.20");
        assert_eq!(
            discovery.queries(),
            vec![("_pix._udp".to_string(), Duration::from_millis(50))]
        );
    }

    #[test]
    fn no_responder_falls_back() {
        let resolution = resolve(&NoDiscovery, "_pix._udp", Duration::ZERO, &fallback());
        assert!(resolution.is_fallback());
        assert_eq!(resolution.into_endpoint(), fallback());
    }

    #[test]
    fn discovery_error_falls_back() {
        let discovery = StaticDiscovery::failing(DiscoveryError::Unavailable("no multicast".into()));
        let resolution = resolve(&discovery, "_pix._udp", Duration::ZERO, &fallback());

        assert_eq!(resolution, Resolution::Fallback(fallback()));
        assert_eq!(resolution.notice(), "... not found, use default port 9876");
    }

    #[test]
    fn resolve_through_trait_object() {
        let discovery: Box<dyn ServiceDiscovery> = Box::new(StaticDiscovery::not_found());
        let resolution = resolve(discovery.as_ref(), "_pix._udp", Duration::ZERO, &fallback());
        assert!(resolution.is_fallback());
    }
}
