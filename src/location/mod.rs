//! Location subsystem: descriptor validation, geocoding, and region checks.

pub mod cache;
pub mod providers;
pub mod resolver;
pub mod types;

pub use cache::CachedGeocoder;
pub use providers::{Geocoder, NominatimGeocoder};
pub use resolver::LocationResolver;
pub use types::{Accuracy, Country, GeoMatch, LocationDescriptor, ResolvedPoint};
