//! In-memory geocode cache.
//!
//! Wraps any [`Geocoder`] and remembers answers (including "not found") for a
//! fixed TTL. Keys are the lowercased query plus the country code. Provider
//! errors are never cached, so a flaky provider is retried on the next call.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use super::providers::Geocoder;
use super::types::{Country, GeoMatch};
use crate::error::ProviderError;

#[derive(Clone)]
struct CacheEntry {
    result: Option<GeoMatch>,
    timestamp: i64,
}

/// A caching decorator around a geocoder.
pub struct CachedGeocoder<G> {
    inner: G,
    ttl_ms: i64,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G, ttl: Duration) -> Self {
        Self {
            inner,
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(&self, key: &str) -> Option<Option<GeoMatch>> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;
        let now = chrono::Utc::now().timestamp_millis();
        if now - entry.timestamp > self.ttl_ms {
            return None; // expired
        }
        Some(entry.result.clone())
    }

    fn store(&self, key: String, result: Option<GeoMatch>) {
        if let Ok(mut entries) = self.entries.lock() {
            let now = chrono::Utc::now().timestamp_millis();
            entries.retain(|_, e| now - e.timestamp <= self.ttl_ms);
            entries.insert(key, CacheEntry { result, timestamp: now });
        }
    }

    /// Number of live and expired entries (for testing).
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn resolve(
        &self,
        query: &str,
        country: Country,
    ) -> Result<Option<GeoMatch>, ProviderError> {
        let key = format!("{}|{}", country.code(), query.trim().to_lowercase());
        if let Some(hit) = self.lookup(&key) {
            debug!(query, %country, "geocode cache hit");
            return Ok(hit);
        }
        let result = self.inner.resolve(query, country).await?;
        self.store(key, result.clone());
        Ok(result)
    }
}
