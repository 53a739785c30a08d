//! Lane distance: road routing with a local great-circle fallback.

pub mod geodesy;
pub mod resolver;
pub mod routing;

pub use resolver::{DistanceMethod, DistanceResolver, DistanceResult};
pub use routing::{LatLon, OsrmRouter, RoutingProvider};
