//! Distance resolver: driving route first, great circle as the fallback.
//!
//! The routing call is the only step in a quote with a hard deadline. When it
//! times out, errors, or finds no route, the resolver computes the spherical
//! distance locally and tags the result `great_circle`. Callers see a
//! successful result either way.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::geodesy::{great_circle_km, KM_TO_MILES};
use super::routing::{LatLon, RoutingProvider};
use crate::error::{QuoteError, RoutingError};
use crate::location::ResolvedPoint;

pub const DEFAULT_ROUTING_TIMEOUT: Duration = Duration::from_secs(5);

/// How a distance was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMethod {
    Driving,
    GreatCircle,
}

impl fmt::Display for DistanceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driving => write!(f, "driving"),
            Self::GreatCircle => write!(f, "great_circle"),
        }
    }
}

/// A lane distance. Miles are always derived from kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistanceResult {
    kilometers: f64,
    miles: f64,
    method: DistanceMethod,
}

impl DistanceResult {
    pub fn from_km(kilometers: f64, method: DistanceMethod) -> Self {
        let kilometers = kilometers.max(0.0);
        Self {
            kilometers,
            miles: kilometers * KM_TO_MILES,
            method,
        }
    }

    pub fn kilometers(&self) -> f64 {
        self.kilometers
    }

    pub fn miles(&self) -> f64 {
        self.miles
    }

    pub fn method(&self) -> DistanceMethod {
        self.method
    }
}

/// Computes lane distance from two resolved points. Never geocodes.
#[derive(Clone)]
pub struct DistanceResolver {
    router: Option<Arc<dyn RoutingProvider>>,
    timeout: Duration,
}

impl DistanceResolver {
    pub fn new(router: Arc<dyn RoutingProvider>, timeout: Duration) -> Self {
        Self {
            router: Some(router),
            timeout,
        }
    }

    /// A resolver with no routing provider: always great circle.
    pub fn great_circle_only() -> Self {
        Self {
            router: None,
            timeout: DEFAULT_ROUTING_TIMEOUT,
        }
    }

    pub async fn resolve(
        &self,
        origin: &ResolvedPoint,
        destination: &ResolvedPoint,
    ) -> Result<DistanceResult, QuoteError> {
        let same_point =
            origin.latitude == destination.latitude && origin.longitude == destination.longitude;

        if !same_point {
            match self.driving_meters(origin, destination).await {
                Ok(meters) => {
                    debug!(meters, "driving route");
                    return Ok(DistanceResult::from_km(meters / 1000.0, DistanceMethod::Driving));
                }
                Err(e) => warn!(error = %e, "driving distance unavailable; using great circle"),
            }
        }

        great_circle(origin, destination)
    }

    async fn driving_meters(
        &self,
        origin: &ResolvedPoint,
        destination: &ResolvedPoint,
    ) -> Result<f64, RoutingError> {
        let router = self
            .router
            .as_ref()
            .ok_or_else(|| RoutingError::Unavailable("no routing provider configured".into()))?;

        let call = router.route(lat_lon(origin), lat_lon(destination));
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RoutingError::Timeout(self.timeout)),
        }
    }
}

fn lat_lon(p: &ResolvedPoint) -> LatLon {
    LatLon {
        lat: p.latitude,
        lon: p.longitude,
    }
}

fn great_circle(
    origin: &ResolvedPoint,
    destination: &ResolvedPoint,
) -> Result<DistanceResult, QuoteError> {
    let km = great_circle_km(
        origin.latitude,
        origin.longitude,
        destination.latitude,
        destination.longitude,
    );
    if !km.is_finite() {
        return Err(QuoteError::Computation(format!(
            "great-circle distance undefined for ({}, {}) -> ({}, {})",
            origin.latitude, origin.longitude, destination.latitude, destination.longitude
        )));
    }
    Ok(DistanceResult::from_km(km, DistanceMethod::GreatCircle))
}
