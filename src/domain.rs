use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Target collection in the search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Fires,
    Shelters,
    Aqi,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Fires, Collection::Shelters, Collection::Aqi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Fires => "fires",
            Collection::Shelters => "shelters",
            Collection::Aqi => "aqi",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anything that can be upserted into the index by identity.
pub trait Record: Serialize {
    fn object_id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireRecord {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub date: String,
    pub latitude: f64,
    pub longitude: f64,
    pub confidence: String,
}

impl FireRecord {
    pub fn new(date: String, latitude: f64, longitude: f64, confidence: String) -> Self {
        Self {
            object_id: fire_object_id(&date, latitude, longitude),
            date,
            latitude,
            longitude,
            confidence,
        }
    }
}

impl Record for FireRecord {
    fn object_id(&self) -> &str {
        &self.object_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelterRecord {
    #[serde(rename = "objectID")]
    pub object_id: String,
    pub name: Value,
    pub address: Value,
    pub city: Value,
    pub state: Value,
    pub zip: Value,
    pub latitude: f64,
    pub longitude: f64,
    pub capacity: Value,
}

impl Record for ShelterRecord {
    fn object_id(&self) -> &str {
        &self.object_id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiRecord {
    #[serde(rename = "objectID")]
    pub object_id: String,
    #[serde(rename = "ReportingArea")]
    pub reporting_area: Value,
    #[serde(rename = "AQI")]
    pub aqi_value: Value,
    #[serde(rename = "ParameterName")]
    pub parameter_name: Value,
    pub latitude: Value,
    pub longitude: Value,
}

impl Record for AqiRecord {
    fn object_id(&self) -> &str {
        &self.object_id
    }
}

/// Rounds coordinates to four decimals so near-identical detections from
/// different feeds share an id.
pub fn fire_object_id(date: &str, latitude: f64, longitude: f64) -> String {
    format!("fire:{date}:{latitude:.4}:{longitude:.4}")
}

/// Built from the name alone; two shelters with the same name collide.
pub fn shelter_object_id(name: &str) -> String {
    format!("shelter:fema:{}", name.replace(' ', "_"))
}

pub fn aqi_object_id(date_observed: &str, reporting_area: &str) -> String {
    format!("aqi:{date_observed}:{reporting_area}")
}

/// Renders a passthrough JSON value the way it appears inside an id.
pub fn id_fragment(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
