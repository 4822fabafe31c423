use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Serialize;

use crate::config::WebhookSettings;
use crate::domain::FireRecord;
use crate::error::HazardError;
use crate::http_util::{build_client, failure_parts};

pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
pub struct FirePayload<'a> {
    pub records: &'a [FireRecord],
}

pub trait WebhookClient: Send + Sync {
    fn post(
        &self,
        url: &str,
        token: Option<&str>,
        payload: &FirePayload<'_>,
    ) -> Result<(), HazardError>;
}

#[derive(Clone)]
pub struct WebhookHttpClient {
    client: Client,
}

impl WebhookHttpClient {
    pub fn new() -> Result<Self, HazardError> {
        let client = build_client(WEBHOOK_TIMEOUT, HazardError::WebhookHttp)?;
        Ok(Self { client })
    }
}

impl WebhookClient for WebhookHttpClient {
    fn post(
        &self,
        url: &str,
        token: Option<&str>,
        payload: &FirePayload<'_>,
    ) -> Result<(), HazardError> {
        let mut request = self.client.post(url).json(payload);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = request
            .send()
            .map_err(|err| HazardError::WebhookHttp(err.to_string()))?;
        if !response.status().is_success() {
            let (status, message) = failure_parts(response, "webhook request failed");
            return Err(HazardError::WebhookStatus { status, message });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "error")]
pub enum NotifyOutcome {
    Skipped,
    Delivered,
    Failed(String),
}

/// Sends the whole fire batch in one call. Failures are logged and reported
/// back as an outcome, never as an error.
pub fn notify_fires(
    client: &dyn WebhookClient,
    webhook: Option<&WebhookSettings>,
    fires: &[FireRecord],
) -> NotifyOutcome {
    let Some(webhook) = webhook else {
        return NotifyOutcome::Skipped;
    };
    if fires.is_empty() {
        return NotifyOutcome::Skipped;
    }

    let payload = FirePayload { records: fires };
    match client.post(&webhook.url, webhook.token.as_deref(), &payload) {
        Ok(()) => {
            tracing::info!(count = fires.len(), "sent fire batch to webhook");
            NotifyOutcome::Delivered
        }
        Err(err) => {
            tracing::warn!(error = %err, "webhook batch error");
            NotifyOutcome::Failed(err.to_string())
        }
    }
}
