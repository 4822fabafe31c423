use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::IndexSettings;
use crate::domain::{Collection, Record};
use crate::error::HazardError;
use crate::http_util::{failure_parts, user_agent};

pub const INDEX_TIMEOUT: Duration = Duration::from_secs(30);
pub const TASK_PUBLISHED: &str = "published";

/// Records are replaced by `objectID` or created when absent.
pub const UPSERT_ACTION: &str = "updateObject";

const API_KEY_HEADER: &str = "x-algolia-api-key";
const APPLICATION_ID_HEADER: &str = "x-algolia-application-id";

pub trait IndexClient: Send + Sync {
    /// Submits one batch and returns the remote task id.
    fn submit_batch(&self, index: &str, body: &Value) -> Result<u64, HazardError>;
    fn task_status(&self, index: &str, task_id: u64) -> Result<String, HazardError>;
}

#[derive(Serialize)]
struct BatchRequest<'a, T> {
    requests: Vec<BatchOperation<'a, T>>,
}

#[derive(Serialize)]
struct BatchOperation<'a, T> {
    action: &'static str,
    body: &'a T,
}

#[derive(Deserialize)]
struct BatchResponse {
    #[serde(rename = "taskID")]
    task_id: u64,
}

#[derive(Deserialize)]
struct TaskResponse {
    status: String,
}

#[derive(Clone)]
pub struct AlgoliaHttpClient {
    client: Client,
    host: String,
}

impl AlgoliaHttpClient {
    pub fn new(settings: &IndexSettings) -> Result<Self, HazardError> {
        let credentials = settings.credentials()?;
        let host = settings.resolved_host()?;

        let header = |value: &str| {
            HeaderValue::from_str(value).map_err(|err| HazardError::IndexHttp(err.to_string()))
        };
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header(&user_agent())?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static(API_KEY_HEADER),
            header(&credentials.admin_key)?,
        );
        headers.insert(
            HeaderName::from_static(APPLICATION_ID_HEADER),
            header(&credentials.app_id)?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(INDEX_TIMEOUT)
            .build()
            .map_err(|err| HazardError::IndexHttp(err.to_string()))?;
        Ok(Self { client, host })
    }

    fn batch_url(&self, index: &str) -> String {
        format!("{}/1/indexes/{}/batch", self.host, index)
    }

    fn task_url(&self, index: &str, task_id: u64) -> String {
        format!("{}/1/indexes/{}/task/{}", self.host, index, task_id)
    }

    fn handle_status(response: Response) -> Result<Response, HazardError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let (status, message) = failure_parts(response, "search index request failed");
        Err(HazardError::IndexStatus { status, message })
    }
}

impl IndexClient for AlgoliaHttpClient {
    fn submit_batch(&self, index: &str, body: &Value) -> Result<u64, HazardError> {
        let response = self
            .client
            .post(self.batch_url(index))
            .json(body)
            .send()
            .map_err(|err| HazardError::IndexHttp(err.to_string()))?;
        let parsed: BatchResponse = Self::handle_status(response)?
            .json()
            .map_err(|err| HazardError::IndexResponse(err.to_string()))?;
        Ok(parsed.task_id)
    }

    fn task_status(&self, index: &str, task_id: u64) -> Result<String, HazardError> {
        let response = self
            .client
            .get(self.task_url(index, task_id))
            .send()
            .map_err(|err| HazardError::IndexHttp(err.to_string()))?;
        let parsed: TaskResponse = Self::handle_status(response)?
            .json()
            .map_err(|err| HazardError::IndexResponse(err.to_string()))?;
        Ok(parsed.status)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexOutcome {
    pub collection: Collection,
    pub records: usize,
    pub task_id: Option<u64>,
    pub polls: u32,
}

/// Writes whole batches and waits until the index reports them published.
#[derive(Clone)]
pub struct IndexWriter<C: IndexClient> {
    client: C,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl<C: IndexClient> IndexWriter<C> {
    pub fn new(client: C, poll_interval: Duration, max_poll_attempts: u32) -> Self {
        Self {
            client,
            poll_interval,
            max_poll_attempts,
        }
    }

    pub fn from_settings(client: C, settings: &IndexSettings) -> Self {
        Self::new(client, settings.poll_interval, settings.max_poll_attempts)
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn write<T: Record>(
        &self,
        collection: Collection,
        records: &[T],
    ) -> Result<IndexOutcome, HazardError> {
        if records.is_empty() {
            tracing::info!(index = %collection, "no records to index");
            return Ok(IndexOutcome {
                collection,
                records: 0,
                task_id: None,
                polls: 0,
            });
        }

        let body = batch_body(records)?;
        tracing::debug!(
            index = %collection,
            first = records[0].object_id(),
            last = records[records.len() - 1].object_id(),
            "submitting batch"
        );
        let task_id = self.client.submit_batch(collection.as_str(), &body)?;
        let polls = self.wait_task(collection, task_id)?;
        tracing::info!(
            index = %collection,
            count = records.len(),
            task_id,
            "indexed records"
        );
        Ok(IndexOutcome {
            collection,
            records: records.len(),
            task_id: Some(task_id),
            polls,
        })
    }

    fn wait_task(&self, collection: Collection, task_id: u64) -> Result<u32, HazardError> {
        for attempt in 1..=self.max_poll_attempts {
            let status = self.client.task_status(collection.as_str(), task_id)?;
            tracing::debug!(index = %collection, task_id, attempt, status = %status, "polled task");
            if status == TASK_PUBLISHED {
                return Ok(attempt);
            }
            if attempt < self.max_poll_attempts {
                thread::sleep(self.poll_interval);
            }
        }
        Err(HazardError::IndexTaskUnconfirmed {
            index: collection.to_string(),
            task_id,
            attempts: self.max_poll_attempts,
        })
    }
}

/// One `updateObject` operation per record, in input order.
pub fn batch_body<T: Record>(records: &[T]) -> Result<Value, HazardError> {
    let request = BatchRequest {
        requests: records
            .iter()
            .map(|body| BatchOperation {
                action: UPSERT_ACTION,
                body,
            })
            .collect(),
    };
    serde_json::to_value(&request).map_err(|err| HazardError::IndexResponse(err.to_string()))
}
