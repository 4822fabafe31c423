use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::AirnowSettings;
use crate::domain::{AqiRecord, aqi_object_id, id_fragment};
use crate::error::HazardError;
use crate::http_util::{build_client, failure_parts};

pub const AIRNOW_TIMEOUT: Duration = Duration::from_secs(15);

pub trait AqiClient: Send + Sync {
    fn fetch_observations(&self, url: &str) -> Result<Value, HazardError>;
}

#[derive(Clone)]
pub struct AirnowHttpClient {
    client: Client,
}

impl AirnowHttpClient {
    pub fn new() -> Result<Self, HazardError> {
        let client = build_client(AIRNOW_TIMEOUT, HazardError::AirnowHttp)?;
        Ok(Self { client })
    }
}

impl AqiClient for AirnowHttpClient {
    fn fetch_observations(&self, url: &str) -> Result<Value, HazardError> {
        // The query string carries the API key; keep it out of error text.
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HazardError::AirnowHttp(err.without_url().to_string()))?;
        if !response.status().is_success() {
            let (status, message) = failure_parts(response, "AirNow request failed");
            return Err(HazardError::AirnowStatus { status, message });
        }
        response
            .json()
            .map_err(|err| HazardError::AirnowHttp(err.without_url().to_string()))
    }
}

/// Historical observations for the configured ZIP code on `date`.
pub fn aqi_query_url(settings: &AirnowSettings, api_key: &str, date: NaiveDate) -> String {
    format!(
        "{base}?format=application/json&zipCode={zip}&date={day}T00-0000&distance={distance}&API_KEY={api_key}",
        base = settings.base_url,
        zip = settings.zip_code,
        day = date.format("%Y-%m-%d"),
        distance = settings.distance_miles,
    )
}

/// Returns nothing, without touching the network, when no API key is set.
pub fn fetch_aqi(
    client: &dyn AqiClient,
    settings: &AirnowSettings,
    date: NaiveDate,
) -> Vec<AqiRecord> {
    let Some(api_key) = settings.api_key.as_deref() else {
        tracing::warn!("AIRNOW_API_KEY not set; skipping AQI");
        return Vec::new();
    };

    let url = aqi_query_url(settings, api_key, date);
    match client.fetch_observations(&url) {
        Ok(body) => match parse_observations(&body) {
            Ok(records) => {
                tracing::info!(count = records.len(), "fetched AQI observations");
                records
            }
            Err(err) => {
                tracing::warn!(error = %err, "AirNow returned no observation list");
                Vec::new()
            }
        },
        Err(err) => {
            tracing::warn!(error = %err, "failed to fetch AQI observations");
            Vec::new()
        }
    }
}

/// Maps the observation array as-is; values are not validated.
///
/// AirNow answers some failures with a 200 and an object body, so anything
/// other than an array is an error rather than an empty day.
pub fn parse_observations(body: &Value) -> Result<Vec<AqiRecord>, HazardError> {
    let Some(entries) = body.as_array() else {
        return Err(HazardError::AirnowResponse(truncate_body(body)));
    };
    let records = entries
        .iter()
        .map(|entry| {
            let field = |key: &str| entry.get(key).cloned().unwrap_or(Value::Null);
            let reporting_area = field("ReportingArea");
            AqiRecord {
                object_id: aqi_object_id(
                    &id_fragment(&field("DateObserved")),
                    &id_fragment(&reporting_area),
                ),
                reporting_area,
                aqi_value: field("AQI"),
                parameter_name: field("ParameterName"),
                latitude: field("Latitude"),
                longitude: field("Longitude"),
            }
        })
        .collect();
    Ok(records)
}

fn truncate_body(body: &Value) -> String {
    let text = body.to_string();
    match text.char_indices().nth(200) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}
