//! Error taxonomy for the quote engine.
//!
//! Client-facing failures live in [`QuoteError`]. Provider adapters report
//! [`ProviderError`] and the routing path reports [`RoutingError`]; neither
//! of those ever reaches a caller unconverted.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which end of the lane a location error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSide {
    Origin,
    Destination,
}

impl fmt::Display for LocationSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Origin => write!(f, "origin"),
            Self::Destination => write!(f, "destination"),
        }
    }
}

fn side_prefix(side: &Option<LocationSide>) -> String {
    match side {
        Some(s) => format!("{} ", s),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{}location not found: '{query}'", side_prefix(.side))]
    Geocoding {
        side: Option<LocationSide>,
        query: String,
    },

    #[error(
        "{}location outside supported region ({latitude:.4}, {longitude:.4})",
        side_prefix(.side)
    )]
    OutOfRegion {
        side: Option<LocationSide>,
        latitude: f64,
        longitude: f64,
    },

    #[error("quote computation failed: {0}")]
    Computation(String),
}

impl QuoteError {
    /// Attach the lane side to a location error. Other variants pass through.
    pub fn with_side(self, side: LocationSide) -> Self {
        match self {
            Self::Geocoding { query, .. } => Self::Geocoding {
                side: Some(side),
                query,
            },
            Self::OutOfRegion {
                latitude,
                longitude,
                ..
            } => Self::OutOfRegion {
                side: Some(side),
                latitude,
                longitude,
            },
            other => other,
        }
    }

    /// True for problems with the caller's input rather than the engine.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Computation(_))
    }

    /// Stable machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Geocoding { .. } => "geocoding",
            Self::OutOfRegion { .. } => "out_of_region",
            Self::Computation(_) => "computation",
        }
    }
}

/// Failure talking to an external provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

/// Why a driving route could not be used.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing provider unavailable: {0}")]
    Unavailable(String),
    #[error("no driving route between points")]
    NoRoute,
    #[error("routing provider timed out after {0:?}")]
    Timeout(std::time::Duration),
}
