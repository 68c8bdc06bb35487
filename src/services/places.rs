// src/services/places.rs

//! Google Places text search and details, through a proxy base URL.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{PlacesConfig, RecordSource, UniversityRecord};
use crate::utils::{endpoint_url, http::send_json};

const SERVICE: &str = "places";
const DETAIL_FIELDS: &str = "place_id,name,formatted_address,website,address_components,types";

/// A text search hit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceSummary {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

/// Details of one place.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaceDetails {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
}

impl PlaceDetails {
    fn component(&self, kind: &str) -> Option<&str> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.as_str())
    }

    /// New populated record. City and country fall back to the search target
    /// when the address lacks them.
    pub fn to_record(&self, city: &str, country: &str) -> UniversityRecord {
        let city = self
            .component("locality")
            .or_else(|| self.component("postal_town"))
            .unwrap_or(city);
        let mut record =
            UniversityRecord::new(&self.name, city, country, RecordSource::Populated);
        record.website = self.website.clone();
        record.address = self.formatted_address.clone();
        record.place_id = Some(self.place_id.clone());
        record
    }
}

/// Source of place data for population runs.
#[async_trait]
pub trait PlaceSource: Send + Sync {
    async fn text_search(&self, query: &str) -> Result<Vec<PlaceSummary>>;
    async fn details(&self, place_id: &str) -> Result<PlaceDetails>;
}

/// HTTP client for the Places proxy.
pub struct PlacesClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
}

impl PlacesClient {
    pub fn new(client: Client, config: &PlacesConfig, api_key: Option<SecretString>) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
        }
    }

    async fn call(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let mut query: Vec<(&str, &str)> = params.to_vec();
        if let Some(key) = &self.api_key {
            query.push(("key", key.expose_secret()));
        }
        let url = endpoint_url(&self.base_url, path, &query)?;
        let body: Value = send_json(SERVICE, self.client.get(url)).await?;
        check_status(&body)?;
        Ok(body)
    }
}

#[async_trait]
impl PlaceSource for PlacesClient {
    async fn text_search(&self, query: &str) -> Result<Vec<PlaceSummary>> {
        let body = self
            .call("textsearch/json", &[("query", query), ("type", "university")])
            .await?;
        parse_search(body)
    }

    async fn details(&self, place_id: &str) -> Result<PlaceDetails> {
        let body = self
            .call(
                "details/json",
                &[("place_id", place_id), ("fields", DETAIL_FIELDS)],
            )
            .await?;
        parse_details(body)
    }
}

/// Reject answers whose `status` is neither `OK` nor `ZERO_RESULTS`.
fn check_status(body: &Value) -> Result<()> {
    match body.get("status").and_then(Value::as_str) {
        None | Some("OK") | Some("ZERO_RESULTS") => Ok(()),
        Some(status) => {
            let message = body
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or("no message");
            Err(AppError::upstream(SERVICE, format!("{status}: {message}")))
        }
    }
}

pub fn parse_search(body: Value) -> Result<Vec<PlaceSummary>> {
    #[derive(Deserialize)]
    struct SearchResponse {
        #[serde(default)]
        results: Vec<PlaceSummary>,
    }
    let response: SearchResponse = serde_json::from_value(body)?;
    Ok(response.results)
}

pub fn parse_details(body: Value) -> Result<PlaceDetails> {
    #[derive(Deserialize)]
    struct DetailsResponse {
        result: Option<PlaceDetails>,
    }
    let response: DetailsResponse = serde_json::from_value(body)?;
    response
        .result
        .ok_or_else(|| AppError::upstream(SERVICE, "details without result"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_search_results() {
        let body = json!({
            "status": "OK",
            "results": [
                { "place_id": "p1", "name": "University of Toronto", "formatted_address": "27 King's College Cir" },
                { "place_id": "p2", "name": "York University" }
            ]
        });
        check_status(&body).unwrap();
        let results = parse_search(body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].formatted_address, None);
    }

    #[test]
    fn zero_results_is_not_an_error() {
        let body = json!({ "status": "ZERO_RESULTS", "results": [] });
        check_status(&body).unwrap();
        assert!(parse_search(body).unwrap().is_empty());
    }

    #[test]
    fn denied_status_is_upstream_error() {
        let body = json!({ "status": "REQUEST_DENIED", "error_message": "bad key" });
        let err = check_status(&body).unwrap_err();
        assert!(err.to_string().contains("REQUEST_DENIED: bad key"));
    }

    #[test]
    fn details_become_populated_record() {
        let body = json!({
            "status": "OK",
            "result": {
                "place_id": "p1",
                "name": "University of Toronto",
                "formatted_address": "27 King's College Cir, Toronto, ON, Canada",
                "website": "https://utoronto.ca",
                "address_components": [
                    { "long_name": "Toronto", "short_name": "Toronto", "types": ["locality", "political"] },
                    { "long_name": "Canada", "short_name": "CA", "types": ["country", "political"] }
                ]
            }
        });
        let details = parse_details(body).unwrap();
        let record = details.to_record("Fallback City", "Canada");

        assert_eq!(record.city, "Toronto");
        assert_eq!(record.source, RecordSource::Populated);
        assert_eq!(record.place_id.as_deref(), Some("p1"));
        assert!(!record.is_verified);
    }

    #[test]
    fn missing_locality_uses_target_city() {
        let details = PlaceDetails {
            place_id: "p9".into(),
            name: "Some College".into(),
            formatted_address: None,
            website: None,
            address_components: vec![],
        };
        assert_eq!(details.to_record("Halifax", "Canada").city, "Halifax");
    }
}
