use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::domain::{ShelterRecord, id_fragment, shelter_object_id};
use crate::error::HazardError;
use crate::http_util::{build_client, failure_parts};

pub const FEMA_TIMEOUT: Duration = Duration::from_secs(15);
pub const SHELTER_LIST_FIELD: &str = "ShelterLocations";

pub trait ShelterClient: Send + Sync {
    fn fetch_json(&self, url: &str) -> Result<Value, HazardError>;
}

#[derive(Clone)]
pub struct FemaHttpClient {
    client: Client,
}

impl FemaHttpClient {
    pub fn new() -> Result<Self, HazardError> {
        let client = build_client(FEMA_TIMEOUT, HazardError::FemaHttp)?;
        Ok(Self { client })
    }
}

impl ShelterClient for FemaHttpClient {
    fn fetch_json(&self, url: &str) -> Result<Value, HazardError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HazardError::FemaHttp(err.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = failure_parts(response, "FEMA request failed");
            return Err(HazardError::FemaStatus { status, message });
        }
        response
            .json()
            .map_err(|err| HazardError::FemaHttp(err.to_string()))
    }
}

/// Single source: any failure yields no shelters at all.
pub fn fetch_shelters(client: &dyn ShelterClient, url: &str) -> Vec<ShelterRecord> {
    match client.fetch_json(url) {
        Ok(body) => {
            let records = parse_shelters(&body);
            tracing::info!(count = records.len(), "fetched shelters");
            records
        }
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "failed to fetch shelters");
            Vec::new()
        }
    }
}

pub fn parse_shelters(body: &Value) -> Vec<ShelterRecord> {
    body.get(SHELTER_LIST_FIELD)
        .and_then(|value| value.as_array())
        .map(|entries| entries.iter().filter_map(shelter_from_entry).collect())
        .unwrap_or_default()
}

fn shelter_from_entry(entry: &Value) -> Option<ShelterRecord> {
    let latitude = coerce_f64(entry.get("Latitude")?)?;
    let longitude = coerce_f64(entry.get("Longitude")?)?;
    let field = |key: &str| entry.get(key).cloned().unwrap_or(Value::Null);
    let name = field("ShelterName");

    Some(ShelterRecord {
        object_id: shelter_object_id(&id_fragment(&name)),
        name,
        address: field("Address"),
        city: field("City"),
        state: field("State"),
        zip: field("ZIP"),
        latitude,
        longitude,
        capacity: field("MaxCapacity"),
    })
}

/// Accepts JSON numbers and numeric strings; null and anything else is rejected.
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}
