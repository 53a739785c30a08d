//! Geocoding providers and the pure lookup helpers around them.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::types::{Country, GeoMatch};
use crate::error::ProviderError;

/// A geocoding backend returning its single best match for a plain-text query.
///
/// `country` restricts the search where the backend supports a filter.
/// `Ok(None)` means the provider answered but found nothing.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve(&self, query: &str, country: Country)
        -> Result<Option<GeoMatch>, ProviderError>;
}

// ─── Postal-code helpers ──────────────────────────────────────

/// Check a postal code against its country's format.
///
/// US: `12345` or `12345-6789`. CA: `A1A 1A1` (space optional).
/// MX: five digits.
pub fn postal_code_matches(country: Country, code: &str) -> bool {
    let code = code.trim();
    match country {
        Country::US => {
            let b = code.as_bytes();
            match b.len() {
                5 => all_digits(b),
                10 => all_digits(&b[..5]) && b[5] == b'-' && all_digits(&b[6..]),
                _ => false,
            }
        }
        Country::CA => {
            let compact: Vec<char> = code
                .chars()
                .filter(|c| *c != ' ')
                .map(|c| c.to_ascii_uppercase())
                .collect();
            // at most one separating space, in the middle
            let spaces = code.chars().filter(|c| *c == ' ').count();
            if compact.len() != 6 || spaces > 1 {
                return false;
            }
            if spaces == 1 && code.chars().nth(3) != Some(' ') {
                return false;
            }
            canadian_letter(compact[0], true)
                && compact[1].is_ascii_digit()
                && canadian_letter(compact[2], false)
                && compact[3].is_ascii_digit()
                && canadian_letter(compact[4], false)
                && compact[5].is_ascii_digit()
        }
        Country::MX => code.len() == 5 && all_digits(code.as_bytes()),
    }
}

fn all_digits(b: &[u8]) -> bool {
    b.iter().all(u8::is_ascii_digit)
}

fn canadian_letter(c: char, leading: bool) -> bool {
    if !c.is_ascii_uppercase() || "DFIOQU".contains(c) {
        return false;
    }
    !(leading && (c == 'W' || c == 'Z'))
}

/// Trim and uppercase; Canadian codes get the canonical middle space.
pub fn normalize_postal_code(country: Country, code: &str) -> String {
    let upper = code.trim().to_uppercase();
    if country == Country::CA {
        let compact: String = upper.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.len() == 6 && compact.is_ascii() {
            return format!("{} {}", &compact[..3], &compact[3..]);
        }
        return compact;
    }
    upper
}

// ─── Nominatim provider ─────────────────────────────────────────

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Deserialize, Debug, Clone)]
struct NominatimResult {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

/// OpenStreetMap Nominatim search client.
#[derive(Clone)]
pub struct NominatimGeocoder {
    agent: ureq::Agent,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, query: &str, country: Country) -> String {
        format!(
            "{}/search?q={}&format=json&limit=1&addressdetails=0&countrycodes={}",
            self.base_url,
            urlencod(query),
            country.code().to_ascii_lowercase(),
        )
    }

    fn search_blocking(
        &self,
        query: &str,
        country: Country,
    ) -> Result<Option<GeoMatch>, ProviderError> {
        let url = self.search_url(query, country);
        debug!(%url, "nominatim search");

        let body = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| ProviderError::Network(e.to_string()))?
            .into_string()
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        parse_search_body(&body)
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn resolve(
        &self,
        query: &str,
        country: Country,
    ) -> Result<Option<GeoMatch>, ProviderError> {
        let this = self.clone();
        let query = query.to_string();
        tokio::task::spawn_blocking(move || this.search_blocking(&query, country))
            .await
            .map_err(|e| ProviderError::Network(format!("geocoder task failed: {}", e)))?
    }
}

/// Decode a Nominatim `/search` JSON body into its first match.
pub fn parse_search_body(body: &str) -> Result<Option<GeoMatch>, ProviderError> {
    let results: Vec<NominatimResult> =
        serde_json::from_str(body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let Some(top) = results.into_iter().next() else {
        return Ok(None);
    };

    let latitude: f64 = top
        .lat
        .trim()
        .parse()
        .map_err(|_| ProviderError::InvalidResponse(format!("bad latitude '{}'", top.lat)))?;
    let longitude: f64 = top
        .lon
        .trim()
        .parse()
        .map_err(|_| ProviderError::InvalidResponse(format!("bad longitude '{}'", top.lon)))?;

    Ok(Some(GeoMatch {
        latitude,
        longitude,
        display_name: top.display_name,
    }))
}

// ─── URL encoding (minimal, no extra dep) ───────────────────────

pub(crate) fn urlencod(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push_str("%20"),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_postal_codes() {
        assert!(postal_code_matches(Country::US, "90210"));
        assert!(postal_code_matches(Country::US, "90210-1234"));
        assert!(!postal_code_matches(Country::US, "9021"));
        assert!(!postal_code_matches(Country::US, "90210 1234"));
        assert!(!postal_code_matches(Country::US, "ABCDE"));
    }

    #[test]
    fn test_ca_postal_codes() {
        assert!(postal_code_matches(Country::CA, "M5H 2N2"));
        assert!(postal_code_matches(Country::CA, "v6b1a1"));
        assert!(!postal_code_matches(Country::CA, "M5H  2N2"));
        assert!(!postal_code_matches(Country::CA, "D5H 2N2"));
        assert!(!postal_code_matches(Country::CA, "W5H 2N2"));
        assert!(!postal_code_matches(Country::CA, "M5H2N"));
    }

    #[test]
    fn test_mx_postal_codes() {
        assert!(postal_code_matches(Country::MX, "06600"));
        assert!(!postal_code_matches(Country::MX, "0660"));
        assert!(!postal_code_matches(Country::MX, "06600-1"));
    }

    #[test]
    fn test_normalize_postal_code() {
        assert_eq!(normalize_postal_code(Country::CA, " m5h2n2 "), "M5H 2N2");
        assert_eq!(normalize_postal_code(Country::CA, "V6B 1A1"), "V6B 1A1");
        assert_eq!(normalize_postal_code(Country::US, " 10001 "), "10001");
    }

    #[test]
    fn test_parse_search_body_first_match() {
        let body = r#"[
            {"lat":"43.6487","lon":"-79.3817","display_name":"Toronto, Ontario, Canada"},
            {"lat":"40.4","lon":"-80.6","display_name":"Toronto, Ohio, United States"}
        ]"#;
        let m = parse_search_body(body).unwrap().unwrap();
        assert!((m.latitude - 43.6487).abs() < 1e-9);
        assert!((m.longitude + 79.3817).abs() < 1e-9);
        assert_eq!(m.display_name, "Toronto, Ontario, Canada");
    }

    #[test]
    fn test_parse_search_body_empty_is_not_found() {
        assert!(parse_search_body("[]").unwrap().is_none());
    }

    #[test]
    fn test_parse_search_body_rejects_garbage() {
        assert!(matches!(
            parse_search_body("<html>rate limited</html>"),
            Err(ProviderError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_search_body(r#"[{"lat":"north","lon":"-79.0"}]"#),
            Err(ProviderError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_urlencod() {
        assert_eq!(urlencod("M5H 2N2, Toronto"), "M5H%202N2%2C%20Toronto");
        assert_eq!(urlencod("Québec"), "Qu%C3%A9bec");
    }

    #[test]
    fn test_search_url_shape() {
        let g = NominatimGeocoder::new(
            "http://localhost:8088/",
            "test-agent",
            Duration::from_secs(1),
        );
        assert_eq!(
            g.search_url("Toronto, Canada", Country::CA),
            "http://localhost:8088/search?q=Toronto%2C%20Canada\
             &format=json&limit=1&addressdetails=0&countrycodes=ca"
        );
    }

    #[test]
    fn test_search_url_filters_by_country() {
        let g = NominatimGeocoder::new("http://x", "test-agent", Duration::from_secs(1));
        let url = g.search_url("London, ON, Canada", Country::CA);
        assert!(url.ends_with("&countrycodes=ca"), "{}", url);
        let url = g.search_url("Monterrey, Mexico", Country::MX);
        assert!(url.ends_with("&countrycodes=mx"), "{}", url);
    }
}
