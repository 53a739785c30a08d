//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QuoteError;

/// Supported North American countries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Country {
    US,
    CA,
    MX,
}

impl Country {
    pub fn code(&self) -> &'static str {
        match self {
            Self::US => "US",
            Self::CA => "CA",
            Self::MX => "MX",
        }
    }

    /// Full English name used in geocoding queries.
    pub fn full_name(&self) -> &'static str {
        match self {
            Self::US => "United States",
            Self::CA => "Canada",
            Self::MX => "Mexico",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Country {
    type Err = QuoteError;

    /// Accepts the ISO code or the full English name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "us" | "usa" | "united states" => Ok(Self::US),
            "ca" | "canada" => Ok(Self::CA),
            "mx" | "mexico" | "méxico" => Ok(Self::MX),
            other => Err(QuoteError::InvalidInput(format!(
                "unsupported country '{}': expected US, CA or MX",
                other
            ))),
        }
    }
}

/// Free-form location input for one end of a lane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDescriptor {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub state_province: Option<String>,
    #[serde(default)]
    pub country: Option<Country>,
}

impl LocationDescriptor {
    pub fn new(city: impl Into<String>, country: Country) -> Self {
        Self {
            city: city.into(),
            postal_code: None,
            state_province: None,
            country: Some(country),
        }
    }

    pub fn with_postal_code(mut self, code: impl Into<String>) -> Self {
        self.postal_code = Some(code.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state_province = Some(state.into());
        self
    }

    /// Postal code, if present and not blank.
    pub fn postal(&self) -> Option<&str> {
        non_blank(self.postal_code.as_deref())
    }

    /// State or province, if present and not blank.
    pub fn state(&self) -> Option<&str> {
        non_blank(self.state_province.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// How much of the descriptor backed the successful geocode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    PostalCode,
    CityState,
    CityOnly,
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostalCode => write!(f, "postal_code"),
            Self::CityState => write!(f, "city_state"),
            Self::CityOnly => write!(f, "city_only"),
        }
    }
}

/// Latitude range accepted as North America (degrees).
pub const NA_LAT_RANGE: (f64, f64) = (7.0, 83.0);
/// Longitude range accepted as North America (degrees).
pub const NA_LON_RANGE: (f64, f64) = (-180.0, -50.0);

pub fn in_north_america(lat: f64, lon: f64) -> bool {
    (NA_LAT_RANGE.0..=NA_LAT_RANGE.1).contains(&lat)
        && (NA_LON_RANGE.0..=NA_LON_RANGE.1).contains(&lon)
}

/// A geocoded point inside the supported region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Accuracy,
    /// Provider's label for the match. Diagnostic only.
    pub display_name: String,
}

/// Raw single best match from a geocoding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoMatch {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}
