mod support;

use std::sync::Mutex;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::Value;

use hazard_indexer::config::{ConfigLoader, FileConfig};
use hazard_indexer::domain::{Collection, FireRecord};
use hazard_indexer::error::HazardError;
use hazard_indexer::index::{
    AlgoliaHttpClient, IndexClient, IndexWriter, UPSERT_ACTION, batch_body,
};

use support::LoopbackServer;

#[derive(Default)]
struct MockIndex {
    reject_submit: bool,
    reject_poll: bool,
    /// Polls answered "notPublished" before the task publishes.
    pending_polls: usize,
    submitted: Mutex<Vec<(String, Value)>>,
    polls: Mutex<usize>,
}

impl IndexClient for MockIndex {
    fn submit_batch(&self, index: &str, body: &Value) -> Result<u64, HazardError> {
        self.submitted
            .lock()
            .unwrap()
            .push((index.to_string(), body.clone()));
        if self.reject_submit {
            return Err(HazardError::IndexStatus {
                status: 403,
                message: "Invalid Application-ID or API key".to_string(),
            });
        }
        Ok(42)
    }

    fn task_status(&self, _index: &str, task_id: u64) -> Result<String, HazardError> {
        assert_eq!(task_id, 42);
        let mut polls = self.polls.lock().unwrap();
        *polls += 1;
        if self.reject_poll {
            return Err(HazardError::IndexStatus {
                status: 500,
                message: "internal".to_string(),
            });
        }
        if *polls <= self.pending_polls {
            Ok("notPublished".to_string())
        } else {
            Ok("published".to_string())
        }
    }
}

fn writer(client: MockIndex, max_polls: u32) -> IndexWriter<MockIndex> {
    IndexWriter::new(client, Duration::from_millis(1), max_polls)
}

fn fires(count: usize) -> Vec<FireRecord> {
    (0..count)
        .map(|i| {
            let offset = i as f64;
            FireRecord::new("2024-01-01".to_string(), offset, -offset, "h".to_string())
        })
        .collect()
}

#[test]
fn empty_batch_makes_no_calls() {
    let writer = writer(MockIndex::default(), 5);
    let outcome = writer.write::<FireRecord>(Collection::Fires, &[]).unwrap();

    assert_eq!(outcome.records, 0);
    assert_eq!(outcome.task_id, None);
    assert!(writer.client().submitted.lock().unwrap().is_empty());
    assert_eq!(*writer.client().polls.lock().unwrap(), 0);
}

#[test]
fn one_submit_with_all_records_then_polls_until_published() {
    let client = MockIndex {
        pending_polls: 2,
        ..Default::default()
    };
    let writer = writer(client, 10);
    let records = fires(3);

    let outcome = writer.write(Collection::Fires, &records).unwrap();

    assert_eq!(outcome.records, 3);
    assert_eq!(outcome.task_id, Some(42));
    assert_eq!(outcome.polls, 3);

    let submitted = writer.client().submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].0, "fires");
    let requests = submitted[0].1["requests"].as_array().unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2]["body"]["objectID"], records[2].object_id.as_str());
}

#[test]
fn submit_failure_skips_polling() {
    let client = MockIndex {
        reject_submit: true,
        ..Default::default()
    };
    let writer = writer(client, 10);

    let err = writer.write(Collection::Shelters, &fires(1)).unwrap_err();

    assert_matches!(err, HazardError::IndexStatus { status: 403, .. });
    assert_eq!(*writer.client().polls.lock().unwrap(), 0);
}

#[test]
fn poll_failure_is_fatal() {
    let client = MockIndex {
        reject_poll: true,
        ..Default::default()
    };
    let writer = writer(client, 10);

    let err = writer.write(Collection::Aqi, &fires(2)).unwrap_err();

    assert_matches!(err, HazardError::IndexStatus { status: 500, .. });
    assert_eq!(*writer.client().polls.lock().unwrap(), 1);
}

#[test]
fn unpublished_task_stops_after_max_polls() {
    let client = MockIndex {
        pending_polls: usize::MAX,
        ..Default::default()
    };
    let writer = writer(client, 4);

    let err = writer.write(Collection::Fires, &fires(1)).unwrap_err();

    assert!(err.is_index_failure());
    assert_matches!(
        err,
        HazardError::IndexTaskUnconfirmed {
            task_id: 42,
            attempts: 4,
            ..
        }
    );
    assert_eq!(*writer.client().polls.lock().unwrap(), 4);
}

#[test]
fn batch_uses_upsert_action() {
    let body = batch_body(&fires(2)).unwrap();
    for request in body["requests"].as_array().unwrap() {
        assert_eq!(request["action"], UPSERT_ACTION);
        assert!(request["body"]["objectID"].as_str().unwrap().starts_with("fire:"));
    }
}

fn algolia_client(host: &str) -> AlgoliaHttpClient {
    let file = FileConfig {
        index_host: Some(host.to_string()),
        ..Default::default()
    };
    let settings = ConfigLoader::resolve_config(file, |key: &str| match key {
        "ALGOLIA_APP_ID" => Some("APP".to_string()),
        "ALGOLIA_ADMIN_KEY" => Some("KEY".to_string()),
        _ => None,
    })
    .unwrap();
    AlgoliaHttpClient::new(&settings.index).unwrap()
}

#[test]
fn algolia_client_posts_batch_then_polls_task() {
    let server = LoopbackServer::start(vec![
        (200, r#"{"taskID":9,"objectIDs":["a","b"]}"#),
        (200, r#"{"status":"notPublished","pendingTask":true}"#),
        (200, r#"{"status":"published","pendingTask":false}"#),
    ]);
    let writer = IndexWriter::new(
        algolia_client(&server.base_url),
        Duration::from_millis(1),
        5,
    );
    let records = fires(2);

    let outcome = writer.write(Collection::Fires, &records).unwrap();
    assert_eq!(outcome.task_id, Some(9));
    assert_eq!(outcome.polls, 2);

    let requests = server.requests();
    assert_eq!(requests.len(), 3);

    let submit = &requests[0];
    assert_eq!(submit.method, "POST");
    assert_eq!(submit.path, "/1/indexes/fires/batch");
    assert_eq!(submit.header("x-algolia-api-key"), Some("KEY"));
    assert_eq!(submit.header("x-algolia-application-id"), Some("APP"));
    let body: Value = serde_json::from_str(&submit.body).unwrap();
    assert_eq!(body, batch_body(&records).unwrap());
    assert_eq!(body["requests"][0]["action"], UPSERT_ACTION);

    for poll in &requests[1..] {
        assert_eq!(poll.method, "GET");
        assert_eq!(poll.path, "/1/indexes/fires/task/9");
        assert_eq!(poll.header("x-algolia-api-key"), Some("KEY"));
    }
}

#[test]
fn algolia_rejected_submit_is_fatal_without_polling() {
    let server = LoopbackServer::start(vec![(
        403,
        r#"{"message":"Invalid Application-ID or API key","status":403}"#,
    )]);
    let writer = IndexWriter::new(
        algolia_client(&server.base_url),
        Duration::from_millis(1),
        5,
    );

    let err = writer.write(Collection::Shelters, &fires(1)).unwrap_err();

    assert_matches!(
        err,
        HazardError::IndexStatus { status: 403, ref message } if message.contains("Invalid Application-ID")
    );
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/1/indexes/shelters/batch");
}
