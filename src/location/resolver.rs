//! Location resolver: descriptor to coordinates.
//!
//! Flow:  postal + city + state + country → (on miss/failure) city + state + country → error
//!
//! Every accepted point must fall inside the North American bounding box.

use std::sync::Arc;
use tracing::{debug, warn};

use super::providers::{self, Geocoder};
use super::types::{
    in_north_america, Accuracy, Country, GeoMatch, LocationDescriptor, ResolvedPoint,
};
use crate::error::QuoteError;

/// Resolves lane endpoints through a geocoding provider.
#[derive(Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Resolve one descriptor. At most two provider calls.
    pub async fn resolve(&self, desc: &LocationDescriptor) -> Result<ResolvedPoint, QuoteError> {
        let country = validate(desc)?;

        if let Some(postal) = desc.postal() {
            let postal = providers::normalize_postal_code(country, postal);
            if !providers::postal_code_matches(country, &postal) {
                debug!(%postal, %country, "postal code does not match country format");
            }
            let query = build_query(desc, country, Some(&postal));
            match self.geocoder.resolve(&query, country).await {
                Ok(Some(m)) => return accept(m, Accuracy::PostalCode),
                Ok(None) => warn!(%query, "no match with postal code; retrying without it"),
                Err(e) => warn!(
                %query,
                error = %e,
                "geocoding with postal code failed; retrying without it"
            ),
            }
        }

        let query = build_query(desc, country, None);
        let accuracy = if desc.state().is_some() {
            Accuracy::CityState
        } else {
            Accuracy::CityOnly
        };

        match self.geocoder.resolve(&query, country).await {
            Ok(Some(m)) => accept(m, accuracy),
            Ok(None) => Err(QuoteError::Geocoding { side: None, query }),
            Err(e) => {
                warn!(%query, error = %e, "geocoding provider failed");
                Err(QuoteError::Geocoding { side: None, query })
            }
        }
    }
}

fn validate(desc: &LocationDescriptor) -> Result<Country, QuoteError> {
    if desc.city.trim().is_empty() {
        return Err(QuoteError::InvalidInput("city is required".into()));
    }
    desc.country
        .ok_or_else(|| QuoteError::InvalidInput("country is required".into()))
}

/// Search string in priority order: postal code, city, state/province, country name.
pub fn build_query(desc: &LocationDescriptor, country: Country, postal: Option<&str>) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(4);
    if let Some(p) = postal {
        parts.push(p);
    }
    parts.push(desc.city.trim());
    if let Some(s) = desc.state() {
        parts.push(s);
    }
    parts.push(country.full_name());
    parts.join(", ")
}

fn accept(m: GeoMatch, accuracy: Accuracy) -> Result<ResolvedPoint, QuoteError> {
    if !in_north_america(m.latitude, m.longitude) {
        warn!(
            lat = m.latitude,
            lon = m.longitude,
            display_name = %m.display_name,
            "geocode outside North America rejected"
        );
        return Err(QuoteError::OutOfRegion {
            side: None,
            latitude: m.latitude,
            longitude: m.longitude,
        });
    }
    Ok(ResolvedPoint {
        latitude: m.latitude,
        longitude: m.longitude,
        accuracy,
        display_name: m.display_name,
    })
}
