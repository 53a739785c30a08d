//! Pricing engine: distance, equipment class and weight to a currency amount.
//!
//! Order of operations is fixed:
//!
//! 1. `miles × base rate`
//! 2. × equipment multiplier
//! 3. + weight surcharge (per started 100 lb over the threshold)
//! 4. max(amount, minimum quote)
//! 5. round to cents
//!
//! The floor comes last so discounted equipment classes cannot undercut it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::QuoteError;

/// Trailer / truck class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentType {
    DryVan,
    Reefer,
    Flatbed,
    StepDeck,
    Hotshot,
    StraightTruck,
}

impl EquipmentType {
    pub const ALL: [EquipmentType; 6] = [
        Self::DryVan,
        Self::Reefer,
        Self::Flatbed,
        Self::StepDeck,
        Self::Hotshot,
        Self::StraightTruck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DryVan => "dry_van",
            Self::Reefer => "reefer",
            Self::Flatbed => "flatbed",
            Self::StepDeck => "step_deck",
            Self::Hotshot => "hotshot",
            Self::StraightTruck => "straight_truck",
        }
    }

    pub fn default_multiplier(&self) -> f64 {
        match self {
            Self::DryVan => 1.00,
            Self::Reefer => 1.20,
            Self::Flatbed => 1.15,
            Self::StepDeck => 1.20,
            Self::Hotshot => 0.85,
            Self::StraightTruck => 0.95,
        }
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentType {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == key)
            .ok_or_else(|| QuoteError::InvalidInput(format!("unknown equipment type '{}'", s)))
    }
}

/// Rate table for the pricing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricingConfig {
    pub base_rate_per_mile: f64,
    pub minimum_quote: f64,
    pub weight_threshold_lb: f64,
    pub weight_surcharge_per_hundred_lb: f64,
    pub equipment_multipliers: BTreeMap<EquipmentType, f64>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            base_rate_per_mile: 2.00,
            minimum_quote: 100.00,
            weight_threshold_lb: 10_000.0,
            weight_surcharge_per_hundred_lb: 0.10,
            equipment_multipliers: EquipmentType::ALL
                .into_iter()
                .map(|e| (e, e.default_multiplier()))
                .collect(),
        }
    }
}

impl PricingConfig {
    pub fn validate(&self) -> Result<(), QuoteError> {
        let scalars = [
            ("baseRatePerMile", self.base_rate_per_mile),
            ("minimumQuote", self.minimum_quote),
            ("weightThresholdLb", self.weight_threshold_lb),
            ("weightSurchargePerHundredLb", self.weight_surcharge_per_hundred_lb),
        ];
        for (name, v) in scalars {
            if !v.is_finite() || v < 0.0 {
                return Err(QuoteError::InvalidInput(format!(
                    "{} must be a non-negative number, got {}",
                    name, v
                )));
            }
        }
        for e in EquipmentType::ALL {
            match self.equipment_multipliers.get(&e) {
                Some(m) if m.is_finite() && *m > 0.0 => {}
                Some(m) => {
                    return Err(QuoteError::InvalidInput(format!(
                        "multiplier for {} must be positive, got {}",
                        e, m
                    )))
                }
                None => {
                    return Err(QuoteError::InvalidInput(format!("missing multiplier for {}", e)))
                }
            }
        }
        Ok(())
    }
}

/// Shipment attributes that drive the price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingInputs {
    pub distance_miles: f64,
    pub equipment_type: EquipmentType,
    /// Pounds.
    pub total_weight: Option<f64>,
}

/// Every intermediate value of one pricing run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base_amount: f64,
    pub multiplier: f64,
    pub weight_surcharge: f64,
    pub floor_applied: bool,
    pub amount: f64,
}

/// Pure, deterministic pricing.
#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Result<Self, QuoteError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn multiplier(&self, equipment: EquipmentType) -> f64 {
        self.config
            .equipment_multipliers
            .get(&equipment)
            .copied()
            .unwrap_or_else(|| equipment.default_multiplier())
    }

    /// Weight surcharge alone. Zero at or below the threshold.
    pub fn weight_surcharge(&self, total_weight: Option<f64>) -> f64 {
        match total_weight {
            Some(w) if w > self.config.weight_threshold_lb => {
                let excess = w - self.config.weight_threshold_lb;
                let increments = (excess / 100.0).ceil();
                increments * self.config.weight_surcharge_per_hundred_lb
            }
            _ => 0.0,
        }
    }

    pub fn breakdown(&self, inputs: &PricingInputs) -> Result<PriceBreakdown, QuoteError> {
        if !inputs.distance_miles.is_finite() || inputs.distance_miles < 0.0 {
            return Err(QuoteError::InvalidInput(format!(
                "distance must be a non-negative number, got {}",
                inputs.distance_miles
            )));
        }
        if let Some(w) = inputs.total_weight {
            if !w.is_finite() || w < 0.0 {
                return Err(QuoteError::InvalidInput(format!(
                    "totalWeight must be a non-negative number, got {}",
                    w
                )));
            }
        }

        let base_amount = inputs.distance_miles * self.config.base_rate_per_mile;
        let multiplier = self.multiplier(inputs.equipment_type);
        let weight_surcharge = self.weight_surcharge(inputs.total_weight);
        let running = base_amount * multiplier + weight_surcharge;

        let floor_applied = running < self.config.minimum_quote;
        let amount = round_cents(running.max(self.config.minimum_quote));

        Ok(PriceBreakdown {
            base_amount,
            multiplier,
            weight_surcharge,
            floor_applied,
            amount,
        })
    }

    pub fn price(&self, inputs: &PricingInputs) -> Result<f64, QuoteError> {
        Ok(self.breakdown(inputs)?.amount)
    }
}

/// Half away from zero, to two decimals.
pub fn round_cents(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
