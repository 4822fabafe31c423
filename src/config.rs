use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::HazardError;

pub const DEFAULT_CONFIG_FILE: &str = "hazard-indexer.json";

pub const ENV_APP_ID: &str = "ALGOLIA_APP_ID";
pub const ENV_ADMIN_KEY: &str = "ALGOLIA_ADMIN_KEY";
pub const ENV_WEBHOOK_URL: &str = "N8N_FIRE_WEBHOOK_URL";
pub const ENV_WEBHOOK_TOKEN: &str = "N8N_FIRE_WEBHOOK_TOKEN";
pub const ENV_AIRNOW_KEY: &str = "AIRNOW_API_KEY";

/// Optional on-disk overrides. Credentials never live here.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub fire_feeds: Option<Vec<String>>,
    #[serde(default)]
    pub shelter_url: Option<String>,
    #[serde(default)]
    pub airnow_base_url: Option<String>,
    #[serde(default)]
    pub aqi_zip_code: Option<String>,
    #[serde(default)]
    pub aqi_distance_miles: Option<u32>,
    #[serde(default)]
    pub index_host: Option<String>,
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub max_poll_attempts: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct IndexCredentials {
    pub app_id: String,
    pub admin_key: String,
}

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub app_id: Option<String>,
    pub admin_key: Option<String>,
    /// Explicit host; falls back to the application's DSN host.
    pub host: Option<String>,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl IndexSettings {
    pub fn credentials(&self) -> Result<IndexCredentials, HazardError> {
        let app_id = self
            .app_id
            .clone()
            .ok_or(HazardError::MissingCredential(ENV_APP_ID))?;
        let admin_key = self
            .admin_key
            .clone()
            .ok_or(HazardError::MissingCredential(ENV_ADMIN_KEY))?;
        Ok(IndexCredentials { app_id, admin_key })
    }

    pub fn resolved_host(&self) -> Result<String, HazardError> {
        if let Some(host) = &self.host {
            return Ok(host.trim_end_matches('/').to_string());
        }
        let app_id = self
            .app_id
            .as_deref()
            .ok_or(HazardError::MissingCredential(ENV_APP_ID))?;
        Ok(format!("https://{app_id}-dsn.algolia.net"))
    }
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub url: String,
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AirnowSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub zip_code: String,
    pub distance_miles: u32,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub fire_feeds: Vec<String>,
    pub shelter_url: String,
    pub airnow: AirnowSettings,
    pub index: IndexSettings,
    pub webhook: Option<WebhookSettings>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the optional config file and the process environment once.
    pub fn resolve(path: Option<&str>) -> Result<Settings, HazardError> {
        let file = Self::read_file(path)?;
        Self::resolve_config(file, |key| std::env::var(key).ok())
    }

    pub fn read_file(path: Option<&str>) -> Result<FileConfig, HazardError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(FileConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| HazardError::ConfigRead(config_path.clone().into_std_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| HazardError::ConfigParse(err.to_string()))
    }

    pub fn resolve_config<F>(file: FileConfig, env: F) -> Result<Settings, HazardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let poll_interval_ms = file.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        if poll_interval_ms == 0 {
            return Err(HazardError::InvalidConfig(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        let max_poll_attempts = file.max_poll_attempts.unwrap_or(DEFAULT_MAX_POLL_ATTEMPTS);
        if max_poll_attempts == 0 {
            return Err(HazardError::InvalidConfig(
                "max_poll_attempts must be at least 1".to_string(),
            ));
        }

        let webhook = lookup(ENV_WEBHOOK_URL).map(|url| WebhookSettings {
            url,
            token: lookup(ENV_WEBHOOK_TOKEN),
        });

        Ok(Settings {
            fire_feeds: file.fire_feeds.unwrap_or_else(default_fire_feeds),
            shelter_url: file
                .shelter_url
                .unwrap_or_else(|| DEFAULT_SHELTER_URL.to_string()),
            airnow: AirnowSettings {
                api_key: lookup(ENV_AIRNOW_KEY),
                base_url: file
                    .airnow_base_url
                    .unwrap_or_else(|| DEFAULT_AIRNOW_URL.to_string()),
                zip_code: file
                    .aqi_zip_code
                    .unwrap_or_else(|| DEFAULT_AQI_ZIP.to_string()),
                distance_miles: file.aqi_distance_miles.unwrap_or(DEFAULT_AQI_DISTANCE),
            },
            index: IndexSettings {
                app_id: lookup(ENV_APP_ID),
                admin_key: lookup(ENV_ADMIN_KEY),
                host: file.index_host,
                poll_interval: Duration::from_millis(poll_interval_ms),
                max_poll_attempts,
            },
            webhook,
        })
    }
}

pub const DEFAULT_SHELTER_URL: &str = "https://www.fema.gov/api/open/v1/ShelterLocations";
pub const DEFAULT_AIRNOW_URL: &str = "https://www.airnowapi.org/aq/observation/zipCode/historical";
pub const DEFAULT_AQI_ZIP: &str = "90210";
pub const DEFAULT_AQI_DISTANCE: u32 = 25;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 300;

pub fn default_fire_feeds() -> Vec<String> {
    vec![
        "https://firms.modaps.eosdis.nasa.gov/data/active_fire/modis-c6.1/csv/MODIS_C6_1_Global_7d.csv"
            .to_string(),
        "https://firms.modaps.eosdis.nasa.gov/data/active_fire/viirs-c2/csv/VIIRS_I_Global_7d.csv"
            .to_string(),
    ]
}
