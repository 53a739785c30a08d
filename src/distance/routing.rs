//! Road-network routing providers.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::RoutingError;

/// A bare coordinate pair, degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// A backend that measures driving distance between two points.
///
/// Returns the route length in metres. Implementations need not enforce a
/// deadline themselves; the distance resolver wraps every call in one and
/// drops the future when it expires.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    async fn route(&self, origin: LatLon, destination: LatLon) -> Result<f64, RoutingError>;
}

// ─── OSRM provider ──────────────────────────────────────────────

pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

#[derive(Deserialize, Debug)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize, Debug)]
struct OsrmRoute {
    distance: f64,
}

/// OSRM `route/v1/driving` client.
#[derive(Clone)]
pub struct OsrmRouter {
    agent: ureq::Agent,
    base_url: String,
}

impl OsrmRouter {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// OSRM wants `lon,lat` order.
    fn route_url(&self, origin: LatLon, destination: LatLon) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=false",
            self.base_url, origin.lon, origin.lat, destination.lon, destination.lat,
        )
    }

    fn route_blocking(&self, origin: LatLon, destination: LatLon) -> Result<f64, RoutingError> {
        let url = self.route_url(origin, destination);
        debug!(%url, "osrm route");

        // OSRM answers NoRoute with a 400 and a JSON body, so read the body on
        // status errors too.
        let body = match self.agent.get(&url).call() {
            Ok(resp) => resp.into_string(),
            Err(ureq::Error::Status(_, resp)) => resp.into_string(),
            Err(e) => return Err(RoutingError::Unavailable(e.to_string())),
        }
        .map_err(|e| RoutingError::Unavailable(e.to_string()))?;

        parse_route_body(&body)
    }
}

#[async_trait]
impl RoutingProvider for OsrmRouter {
    async fn route(&self, origin: LatLon, destination: LatLon) -> Result<f64, RoutingError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.route_blocking(origin, destination))
            .await
            .map_err(|e| RoutingError::Unavailable(format!("routing task failed: {}", e)))?
    }
}

/// Decode an OSRM route response into metres of the first route.
pub fn parse_route_body(body: &str) -> Result<f64, RoutingError> {
    let resp: OsrmResponse = serde_json::from_str(body)
        .map_err(|e| RoutingError::Unavailable(format!("invalid routing response: {}", e)))?;

    match resp.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => return Err(RoutingError::NoRoute),
        other => {
            return Err(RoutingError::Unavailable(format!(
                "{}: {}",
                other,
                resp.message.unwrap_or_default()
            )))
        }
    }

    let meters = resp
        .routes
        .first()
        .map(|r| r.distance)
        .ok_or(RoutingError::NoRoute)?;

    if !meters.is_finite() || meters < 0.0 {
        return Err(RoutingError::Unavailable(format!("invalid route length {}", meters)));
    }
    Ok(meters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_url_is_lon_lat() {
        let r = OsrmRouter::new("http://localhost:5000/", "test", Duration::from_secs(1));
        let url = r.route_url(
            LatLon { lat: 43.65, lon: -79.38 },
            LatLon { lat: 49.28, lon: -123.12 },
        );
        assert_eq!(
            url,
            "http://localhost:5000/route/v1/driving/-79.38,43.65;-123.12,49.28?overview=false"
        );
    }

    #[test]
    fn test_parse_ok_route() {
        let body = r#"{"code":"Ok","routes":[{"distance":3362123.4,"duration":120000.0}],"waypoints":[]}"#;
        let m = parse_route_body(body).unwrap();
        assert!((m - 3362123.4).abs() < 1e-6);
    }

    #[test]
    fn test_parse_no_route() {
        let body = r#"{"code":"NoRoute","message":"Impossible route between points"}"#;
        assert!(matches!(parse_route_body(body), Err(RoutingError::NoRoute)));
    }

    #[test]
    fn test_parse_ok_without_routes_is_no_route() {
        assert!(matches!(
            parse_route_body(r#"{"code":"Ok","routes":[]}"#),
            Err(RoutingError::NoRoute)
        ));
    }

    #[test]
    fn test_parse_error_code_is_unavailable() {
        let body = r#"{"code":"TooBig","message":"Too many coordinates"}"#;
        assert!(matches!(parse_route_body(body), Err(RoutingError::Unavailable(_))));
        assert!(matches!(parse_route_body("Bad Gateway"), Err(RoutingError::Unavailable(_))));
    }
}
