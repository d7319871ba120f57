//! Geocoding payloads: Open-Meteo place search and Nominatim reverse lookup.

use serde::Deserialize;

use crate::error::WeatherError;
use crate::types::{Coordinates, PlaceCandidate};

pub const MAX_SEARCH_CANDIDATES: usize = 5;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    admin1: Option<String>,
}

/// Parse an Open-Meteo geocoding search body. A missing `results` array is
/// an empty hit list, not an error.
pub fn parse_search(body: &str) -> Result<Vec<PlaceCandidate>, WeatherError> {
    let parsed: SearchResponse = serde_json::from_str(body)?;
    Ok(parsed
        .results
        .into_iter()
        .take(MAX_SEARCH_CANDIDATES)
        .map(|r| PlaceCandidate {
            name: r.name,
            country: r.country,
            admin1: r.admin1,
            latitude: r.latitude,
            longitude: r.longitude,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    suburb: Option<String>,
    municipality: Option<String>,
    state_district: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
}

/// Parse a Nominatim reverse body into `"place, state"` (or `"place, country"`).
/// `None` when the response names nothing, e.g. open water.
pub fn parse_reverse(body: &str) -> Result<Option<String>, WeatherError> {
    let parsed: NominatimResponse = serde_json::from_str(body)?;
    Ok(parsed.address.and_then(place_label))
}

fn place_label(addr: NominatimAddress) -> Option<String> {
    let state = addr.state.clone();
    let country = addr.country.clone();

    // city > town > village > suburb > municipality for the primary name
    let place = addr
        .city
        .or(addr.town)
        .or(addr.village)
        .or(addr.suburb)
        .or(addr.municipality)
        .or(addr.state_district)
        .or(addr.county)
        .or(addr.state)
        .or(addr.country)
        .filter(|p| !p.is_empty())?;

    let suffix = state
        .filter(|s| !s.is_empty() && *s != place)
        .or_else(|| country.filter(|c| !c.is_empty() && *c != place));

    Some(match suffix {
        Some(s) => format!("{}, {}", place, s),
        None => place,
    })
}

/// Label for a point with no known name.
pub fn fallback_label(coords: Coordinates) -> String {
    coords.label()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_parse_search_caps_candidates() {
        let results: Vec<_> = (0..8)
            .map(|i| {
                serde_json::json!({
                    "name": format!("Place {}", i),
                    "latitude": 23.0,
                    "longitude": 90.0,
                    "country": "Bangladesh",
                    "admin1": "Dhaka Division"
                })
            })
            .collect();
        let body = serde_json::json!({ "results": results }).to_string();
        let hits = parse_search(&body).unwrap();
        assert_eq!(hits.len(), MAX_SEARCH_CANDIDATES);
        assert_eq!(hits[0].label(), "Place 0, Bangladesh");
        assert_eq!(hits[0].admin1.as_deref(), Some("Dhaka Division"));
    }

    #[test]
    fn test_parse_search_without_results() {
        assert!(parse_search(r#"{"generationtime_ms":0.3}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_search_malformed() {
        let err = parse_search(r#"{"results":[{"name":"x"}]}"#).unwrap_err();
        assert!(matches!(err, WeatherError::Parse(_)));
    }

    #[test]
    fn test_reverse_prefers_city_with_state() {
        let body = r#"{"address":{"city":"Sylhet","state":"Sylhet Division","country":"Bangladesh"}}"#;
        assert_eq!(
            parse_reverse(body).unwrap().as_deref(),
            Some("Sylhet, Sylhet Division")
        );
    }

    #[test]
    fn test_reverse_falls_through_to_country_suffix() {
        let body = r#"{"address":{"village":"Inani","country":"Bangladesh"}}"#;
        assert_eq!(parse_reverse(body).unwrap().as_deref(), Some("Inani, Bangladesh"));
    }

    #[test]
    fn test_reverse_without_address() {
        assert_eq!(parse_reverse(r#"{"error":"Unable to geocode"}"#).unwrap(), None);
    }

    #[test]
    fn test_fallback_label() {
        let coords = Coordinates::new(22.35694, 91.78319).unwrap();
        assert_eq!(fallback_label(coords), "22.36, 91.78");
    }
}
