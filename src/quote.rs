//! Quote pipeline.
//!
//! origin ─┐
//!         ├─ (concurrent) resolve ─→ distance ─→ price ─→ QuoteResult
//! dest   ─┘
//!
//! Stateless per call: an engine can serve any number of concurrent quotes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::AppConfig;
use crate::distance::{DistanceMethod, DistanceResolver, DistanceResult, OsrmRouter};
use crate::error::{LocationSide, QuoteError};
use crate::location::{
    Accuracy, CachedGeocoder, Geocoder, LocationDescriptor, LocationResolver, NominatimGeocoder,
    ResolvedPoint,
};
use crate::pricing::{EquipmentType, PriceBreakdown, PricingEngine, PricingInputs};

/// A request to price one lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub origin: LocationDescriptor,
    pub destination: LocationDescriptor,
    pub equipment_type: EquipmentType,
    /// Pounds.
    #[serde(default)]
    pub total_weight: Option<f64>,
}

impl QuoteRequest {
    fn validate(&self) -> Result<(), QuoteError> {
        if let Some(w) = self.total_weight {
            if !w.is_finite() || w < 0.0 {
                return Err(QuoteError::InvalidInput(format!(
                    "totalWeight must be a non-negative number, got {}",
                    w
                )));
            }
        }
        Ok(())
    }
}

/// Everything the engine computed for one lane.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    pub origin: ResolvedPoint,
    pub destination: ResolvedPoint,
    pub distance: DistanceResult,
    pub equipment_type: EquipmentType,
    pub total_weight: Option<f64>,
    pub pricing: PriceBreakdown,
    pub amount: f64,
    pub computed_at: DateTime<Utc>,
}

/// Flat payload handed to whatever persists quotes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub origin: LocationDescriptor,
    pub destination: LocationDescriptor,
    pub origin_accuracy: Accuracy,
    pub destination_accuracy: Accuracy,
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub destination_lat: f64,
    pub destination_lon: f64,
    pub distance_km: f64,
    pub distance_miles: f64,
    pub distance_method: DistanceMethod,
    pub equipment_type: EquipmentType,
    pub total_weight: Option<f64>,
    pub amount: f64,
    pub computed_at: DateTime<Utc>,
}

impl QuoteRecord {
    pub fn from_parts(request: &QuoteRequest, result: &QuoteResult) -> Self {
        Self {
            origin: request.origin.clone(),
            destination: request.destination.clone(),
            origin_accuracy: result.origin.accuracy,
            destination_accuracy: result.destination.accuracy,
            origin_lat: result.origin.latitude,
            origin_lon: result.origin.longitude,
            destination_lat: result.destination.latitude,
            destination_lon: result.destination.longitude,
            distance_km: result.distance.kilometers(),
            distance_miles: result.distance.miles(),
            distance_method: result.distance.method(),
            equipment_type: result.equipment_type,
            total_weight: result.total_weight,
            amount: result.amount,
            computed_at: result.computed_at,
        }
    }
}

/// Wires the three stages together.
#[derive(Clone)]
pub struct QuoteEngine {
    locations: LocationResolver,
    distances: DistanceResolver,
    pricing: Arc<PricingEngine>,
}

impl QuoteEngine {
    pub fn new(
        locations: LocationResolver,
        distances: DistanceResolver,
        pricing: PricingEngine,
    ) -> Self {
        Self {
            locations,
            distances,
            pricing: Arc::new(pricing),
        }
    }

    /// Production wiring: Nominatim (optionally cached) and OSRM.
    /// With `offline_routing` the engine never calls OSRM.
    pub fn from_config(config: &AppConfig, offline_routing: bool) -> Result<Self, QuoteError> {
        let nominatim = NominatimGeocoder::new(
            &config.nominatim_url,
            &config.user_agent,
            config.geocode_timeout,
        );
        let geocoder: Arc<dyn Geocoder> = if config.geocode_cache_ttl.is_zero() {
            Arc::new(nominatim)
        } else {
            Arc::new(CachedGeocoder::new(nominatim, config.geocode_cache_ttl))
        };

        let distances = if offline_routing {
            DistanceResolver::great_circle_only()
        } else {
            let router =
                OsrmRouter::new(&config.osrm_url, &config.user_agent, config.routing_timeout);
            DistanceResolver::new(Arc::new(router), config.routing_timeout)
        };

        Ok(Self::new(
            LocationResolver::new(geocoder),
            distances,
            PricingEngine::new(config.pricing.clone())?,
        ))
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    /// Price one lane.
    ///
    /// Both endpoints are geocoded concurrently; the first failure cancels the
    /// other lookup. Dropping the returned future drops any in-flight
    /// provider future; a blocking HTTP request already handed to the
    /// blocking pool runs to its own agent timeout.
    pub async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResult, QuoteError> {
        let start = Instant::now();
        request.validate()?;

        let (origin, destination) = tokio::try_join!(
            self.resolve_side(&request.origin, LocationSide::Origin),
            self.resolve_side(&request.destination, LocationSide::Destination),
        )?;

        let distance = self.distances.resolve(&origin, &destination).await?;

        let pricing = self.pricing.breakdown(&PricingInputs {
            distance_miles: distance.miles(),
            equipment_type: request.equipment_type,
            total_weight: request.total_weight,
        })?;

        info!(
            origin = %origin.display_name,
            destination = %destination.display_name,
            miles = distance.miles(),
            method = %distance.method(),
            equipment = %request.equipment_type,
            amount = pricing.amount,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "quote computed"
        );

        Ok(QuoteResult {
            origin,
            destination,
            distance,
            equipment_type: request.equipment_type,
            total_weight: request.total_weight,
            amount: pricing.amount,
            pricing,
            computed_at: Utc::now(),
        })
    }

    async fn resolve_side(
        &self,
        desc: &LocationDescriptor,
        side: LocationSide,
    ) -> Result<ResolvedPoint, QuoteError> {
        self.locations
            .resolve(desc)
            .await
            .map_err(|e| e.with_side(side))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::location::{Country, GeoMatch};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedGeocoder;

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn resolve(
            &self,
            query: &str,
            _country: Country,
        ) -> Result<Option<GeoMatch>, ProviderError> {
            let hit = |lat: f64, lon: f64| -> Result<Option<GeoMatch>, ProviderError> {
                Ok(Some(GeoMatch {
                    latitude: lat,
                    longitude: lon,
                    display_name: query.to_string(),
                }))
            };
            if query.contains("Chicago") {
                hit(41.8781, -87.6298)
            } else if query.contains("Detroit") {
                hit(42.3314, -83.0458)
            } else {
                Ok(None)
            }
        }
    }

    fn engine() -> QuoteEngine {
        QuoteEngine::new(
            LocationResolver::new(Arc::new(FixedGeocoder)),
            DistanceResolver::great_circle_only(),
            PricingEngine::default(),
        )
    }

    fn request(dest_city: &str, weight: Option<f64>) -> QuoteRequest {
        QuoteRequest {
            origin: LocationDescriptor::new("Chicago", Country::US).with_state("IL"),
            destination: LocationDescriptor::new(dest_city, Country::US).with_state("MI"),
            equipment_type: EquipmentType::DryVan,
            total_weight: weight,
        }
    }

    #[tokio::test]
    async fn test_quote_pipeline() {
        let result = engine().quote(&request("Detroit", None)).await.unwrap();
        assert_eq!(result.distance.method(), DistanceMethod::GreatCircle);
        assert_eq!(result.origin.accuracy, Accuracy::CityState);
        let expected = crate::pricing::round_cents(result.distance.miles() * 2.0).max(100.0);
        assert!((result.amount - expected).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_destination_failure_names_side() {
        let err = engine().quote(&request("Atlantis", None)).await.unwrap_err();
        match err {
            QuoteError::Geocoding { side, .. } => assert_eq!(side, Some(LocationSide::Destination)),
            other => panic!("expected Geocoding, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_negative_weight_rejected_before_geocoding() {
        let err = engine().quote(&request("Detroit", Some(-1.0))).await.unwrap_err();
        assert!(matches!(err, QuoteError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_record_carries_descriptors_and_accuracy() {
        let req = request("Detroit", Some(9000.0));
        let result = engine().quote(&req).await.unwrap();
        let record = QuoteRecord::from_parts(&req, &result);
        assert_eq!(record.origin.city, "Chicago");
        assert_eq!(record.destination_accuracy, Accuracy::CityState);
        assert_eq!(record.distance_miles, result.distance.miles());
        assert_eq!(record.amount, result.amount);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["distanceMethod"], "great_circle");
        assert_eq!(json["equipmentType"], "dry_van");
        assert_eq!(json["origin"]["stateProvince"], "IL");
    }

    /// Never answers; counts lookups started and lookups dropped.
    #[derive(Default)]
    struct StalledGeocoder {
        started: AtomicUsize,
        dropped: Arc<AtomicUsize>,
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Geocoder for StalledGeocoder {
        async fn resolve(
            &self,
            _query: &str,
            _country: Country,
        ) -> Result<Option<GeoMatch>, ProviderError> {
            let _guard = DropCounter(self.dropped.clone());
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_dropping_quote_cancels_lookups() {
        let geocoder = Arc::new(StalledGeocoder::default());
        let engine = QuoteEngine::new(
            LocationResolver::new(geocoder.clone()),
            DistanceResolver::great_circle_only(),
            PricingEngine::default(),
        );

        let started = std::time::Instant::now();
        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            engine.quote(&request("Detroit", None)),
        )
        .await;

        assert!(outcome.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
        // both sides were in flight and both were dropped with the quote
        assert_eq!(geocoder.started.load(Ordering::SeqCst), 2);
        assert_eq!(geocoder.dropped.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_request_wire_format() {
        let json = r#"{
            "origin": {"city":"Toronto","postalCode":"M5H 2N2","stateProvince":"ON","country":"CA"},
            "destination": {"city":"Vancouver","country":"CA"},
            "equipmentType": "reefer",
            "totalWeight": 12000
        }"#;
        let req: QuoteRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.equipment_type, EquipmentType::Reefer);
        assert_eq!(req.total_weight, Some(12000.0));
        assert_eq!(req.destination.postal(), None);

        let bad = json.replace("reefer", "hovercraft");
        assert!(serde_json::from_str::<QuoteRequest>(&bad).is_err());
    }
}
