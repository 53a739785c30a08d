//! Great-circle distance on a spherical Earth (haversine).

use std::f64::consts::PI;

const DEG: f64 = PI / 180.0;

/// Mean Earth radius in kilometres (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Kilometres to statute miles.
pub const KM_TO_MILES: f64 = 0.621371;

/// Haversine distance between two lat/lon pairs, in kilometres.
pub fn great_circle_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1 * DEG;
    let phi2 = lat2 * DEG;
    let d_phi = (lat2 - lat1) * DEG;
    let d_lambda = (lon2 - lon1) * DEG;

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push `a` a hair outside [0, 1] for antipodal/identical points
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

pub fn km_to_miles(km: f64) -> f64 {
    km * KM_TO_MILES
}
