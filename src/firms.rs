use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::domain::FireRecord;
use crate::error::HazardError;
use crate::http_util::{build_client, failure_parts};

pub const FIRMS_TIMEOUT: Duration = Duration::from_secs(20);

pub trait FireFeedClient: Send + Sync {
    fn fetch_csv(&self, url: &str) -> Result<String, HazardError>;
}

#[derive(Clone)]
pub struct FirmsHttpClient {
    client: Client,
}

impl FirmsHttpClient {
    pub fn new() -> Result<Self, HazardError> {
        let client = build_client(FIRMS_TIMEOUT, HazardError::FirmsHttp)?;
        Ok(Self { client })
    }
}

impl FireFeedClient for FirmsHttpClient {
    fn fetch_csv(&self, url: &str) -> Result<String, HazardError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HazardError::FirmsHttp(err.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = failure_parts(response, "FIRMS request failed");
            return Err(HazardError::FirmsStatus { status, message });
        }
        response
            .text()
            .map_err(|err| HazardError::FirmsHttp(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct FirmsRow {
    #[serde(default)]
    latitude: Option<String>,
    #[serde(default)]
    longitude: Option<String>,
    #[serde(default)]
    acq_date: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
}

/// Pulls every configured feed in order. A failing feed is logged and
/// skipped; records from the other feeds are still returned.
pub fn fetch_fires(client: &dyn FireFeedClient, feeds: &[String]) -> Vec<FireRecord> {
    let mut records = Vec::new();
    for url in feeds {
        let parsed = client.fetch_csv(url).and_then(|text| parse_fire_csv(&text));
        match parsed {
            Ok(mut batch) => {
                tracing::info!(url = %url, count = batch.len(), "fetched fire feed");
                records.append(&mut batch);
            }
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "skipping fire feed");
            }
        }
    }
    records
}

/// Parses one FIRMS CSV document. Rows without finite numeric coordinates
/// are dropped; only an unreadable header fails the whole feed.
pub fn parse_fire_csv(text: &str) -> Result<Vec<FireRecord>, HazardError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    reader
        .headers()
        .map_err(|err| HazardError::FirmsCsv(err.to_string()))?;

    let records = reader
        .deserialize::<FirmsRow>()
        .filter_map(Result::ok)
        .filter_map(fire_from_row)
        .collect();
    Ok(records)
}

fn fire_from_row(row: FirmsRow) -> Option<FireRecord> {
    let latitude = parse_coordinate(row.latitude.as_deref())?;
    let longitude = parse_coordinate(row.longitude.as_deref())?;
    Some(FireRecord::new(
        row.acq_date.unwrap_or_default(),
        latitude,
        longitude,
        row.confidence.unwrap_or_default(),
    ))
}

fn parse_coordinate(value: Option<&str>) -> Option<f64> {
    value?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
