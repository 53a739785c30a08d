//! Runtime configuration.
//!
//! Defaults are usable out of the box against the public OpenStreetMap
//! services. Everything can be overridden from the environment (or a `.env`
//! file); pricing variables keep their historical unprefixed names.

use std::str::FromStr;
use std::time::Duration;

use crate::distance::routing::DEFAULT_OSRM_URL;
use crate::error::QuoteError;
use crate::location::providers::DEFAULT_NOMINATIM_URL;
use crate::pricing::{EquipmentType, PricingConfig};

pub const DEFAULT_USER_AGENT: &str = concat!("freight-quote/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub nominatim_url: String,
    pub osrm_url: String,
    pub user_agent: String,
    pub geocode_timeout: Duration,
    pub routing_timeout: Duration,
    /// Zero disables the geocode cache.
    pub geocode_cache_ttl: Duration,
    pub host: String,
    pub port: u16,
    pub pricing: PricingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nominatim_url: DEFAULT_NOMINATIM_URL.into(),
            osrm_url: DEFAULT_OSRM_URL.into(),
            user_agent: DEFAULT_USER_AGENT.into(),
            geocode_timeout: Duration::from_secs(10),
            routing_timeout: Duration::from_secs(5),
            geocode_cache_ttl: Duration::ZERO,
            host: "127.0.0.1".into(),
            port: 8080,
            pricing: PricingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, QuoteError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, QuoteError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("FREIGHTQ_NOMINATIM_URL") {
            cfg.nominatim_url = v;
        }
        if let Some(v) = get("FREIGHTQ_OSRM_URL") {
            cfg.osrm_url = v;
        }
        if let Some(v) = get("FREIGHTQ_USER_AGENT") {
            cfg.user_agent = v;
        }
        if let Some(v) = get("FREIGHTQ_GEOCODE_TIMEOUT_SECS") {
            cfg.geocode_timeout = Duration::from_secs(parse("FREIGHTQ_GEOCODE_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("FREIGHTQ_ROUTING_TIMEOUT_SECS") {
            cfg.routing_timeout = Duration::from_secs(parse("FREIGHTQ_ROUTING_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = get("FREIGHTQ_GEOCODE_CACHE_TTL_SECS") {
            cfg.geocode_cache_ttl =
                Duration::from_secs(parse("FREIGHTQ_GEOCODE_CACHE_TTL_SECS", &v)?);
        }
        if let Some(v) = get("FREIGHTQ_HOST") {
            cfg.host = v;
        }
        if let Some(v) = get("FREIGHTQ_PORT") {
            cfg.port = parse("FREIGHTQ_PORT", &v)?;
        }

        let p = &mut cfg.pricing;
        if let Some(v) = get("BASE_RATE_PER_MILE") {
            p.base_rate_per_mile = parse("BASE_RATE_PER_MILE", &v)?;
        }
        if let Some(v) = get("MINIMUM_QUOTE") {
            p.minimum_quote = parse("MINIMUM_QUOTE", &v)?;
        }
        if let Some(v) = get("WEIGHT_THRESHOLD_LB") {
            p.weight_threshold_lb = parse("WEIGHT_THRESHOLD_LB", &v)?;
        }
        if let Some(v) = get("WEIGHT_SURCHARGE_PER_100LB") {
            p.weight_surcharge_per_hundred_lb = parse("WEIGHT_SURCHARGE_PER_100LB", &v)?;
        }
        for e in EquipmentType::ALL {
            let key = format!("MULTIPLIER_{}", e.as_str().to_uppercase());
            if let Some(v) = get(&key) {
                p.equipment_multipliers.insert(e, parse(&key, &v)?);
            }
        }

        cfg.pricing.validate()?;
        Ok(cfg)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, QuoteError> {
    value
        .parse()
        .map_err(|_| QuoteError::InvalidInput(format!("{}: cannot parse '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let cfg = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.pricing.base_rate_per_mile, 2.0);
        assert_eq!(cfg.routing_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_pricing_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("BASE_RATE_PER_MILE", "2.75"),
            ("MINIMUM_QUOTE", "150"),
            ("MULTIPLIER_REEFER", "1.35"),
            ("MULTIPLIER_STRAIGHT_TRUCK", " 0.9 "),
        ]))
        .unwrap();
        assert_eq!(cfg.pricing.base_rate_per_mile, 2.75);
        assert_eq!(cfg.pricing.minimum_quote, 150.0);
        assert_eq!(cfg.pricing.equipment_multipliers[&EquipmentType::Reefer], 1.35);
        assert_eq!(cfg.pricing.equipment_multipliers[&EquipmentType::StraightTruck], 0.9);
        assert_eq!(cfg.pricing.equipment_multipliers[&EquipmentType::Flatbed], 1.15);
    }

    #[test]
    fn test_provider_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("FREIGHTQ_OSRM_URL", "http://osrm.internal:5000"),
            ("FREIGHTQ_ROUTING_TIMEOUT_SECS", "2"),
            ("FREIGHTQ_GEOCODE_CACHE_TTL_SECS", "3600"),
            ("FREIGHTQ_PORT", "9090"),
        ]))
        .unwrap();
        assert_eq!(cfg.osrm_url, "http://osrm.internal:5000");
        assert_eq!(cfg.routing_timeout, Duration::from_secs(2));
        assert_eq!(cfg.geocode_cache_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.port, 9090);
    }

    #[test]
    fn test_unparseable_value_names_variable() {
        let err = AppConfig::from_lookup(lookup(&[("MINIMUM_QUOTE", "lots")])).unwrap_err();
        assert!(err.to_string().contains("MINIMUM_QUOTE"));
    }

    #[test]
    fn test_invalid_pricing_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("MULTIPLIER_HOTSHOT", "0")])).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidInput(_)));
    }

    #[test]
    fn test_blank_values_ignored() {
        let cfg = AppConfig::from_lookup(lookup(&[("FREIGHTQ_HOST", "  ")])).unwrap();
        assert_eq!(cfg.host, "127.0.0.1");
    }
}
