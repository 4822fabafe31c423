use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::airnow::{AqiClient, fetch_aqi};
use crate::config::Settings;
use crate::domain::{Collection, Record};
use crate::error::HazardError;
use crate::fema::{ShelterClient, fetch_shelters};
use crate::firms::{FireFeedClient, fetch_fires};
use crate::index::{IndexClient, IndexOutcome, IndexWriter};
use crate::notify::{NotifyOutcome, WebhookClient, notify_fires};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Keep going after a stage fails to index; failures land in the report.
    pub isolate_stages: bool,
    /// Restrict the run to these collections. Empty means all of them.
    pub only: Vec<Collection>,
    /// Observation date for the AQI query. Defaults to today, local time.
    pub date: Option<NaiveDate>,
}

impl RunOptions {
    fn includes(&self, collection: Collection) -> bool {
        self.only.is_empty() || self.only.contains(&collection)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub collection: Collection,
    pub fetched: usize,
    pub index: Option<IndexOutcome>,
    pub notify: Option<NotifyOutcome>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub stages: Vec<StageReport>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.stages.iter().all(|stage| stage.error.is_none())
    }

    pub fn failed_stages(&self) -> Vec<Collection> {
        self.stages
            .iter()
            .filter(|stage| stage.error.is_some())
            .map(|stage| stage.collection)
            .collect()
    }

    /// 0 when every stage indexed, 3 when an isolated stage failed.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 3 }
    }
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

fn phase(message: String) -> ProgressEvent {
    ProgressEvent {
        message,
        elapsed: None,
    }
}

pub struct App<F, S, A, I, W>
where
    F: FireFeedClient,
    S: ShelterClient,
    A: AqiClient,
    I: IndexClient,
    W: WebhookClient,
{
    settings: Settings,
    fires: F,
    shelters: S,
    aqi: A,
    writer: IndexWriter<I>,
    webhook: W,
}

impl<F, S, A, I, W> App<F, S, A, I, W>
where
    F: FireFeedClient,
    S: ShelterClient,
    A: AqiClient,
    I: IndexClient,
    W: WebhookClient,
{
    pub fn new(settings: Settings, fires: F, shelters: S, aqi: A, index: I, webhook: W) -> Self {
        let writer = IndexWriter::from_settings(index, &settings.index);
        Self {
            settings,
            fires,
            shelters,
            aqi,
            writer,
            webhook,
        }
    }

    /// Runs fires, shelters and AQI in that order, one stage at a time.
    ///
    /// Without `isolate_stages` the first index failure aborts the run and
    /// later stages never start.
    pub fn run(
        &self,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, HazardError> {
        let date = options.date.unwrap_or_else(|| Local::now().date_naive());
        let mut report = RunReport::default();

        for collection in Collection::ALL {
            if !options.includes(collection) {
                continue;
            }
            let started = Instant::now();
            let (stage, error) = self.run_stage(collection, date, sink);
            sink.event(ProgressEvent {
                message: format!("phase=Done; {collection}"),
                elapsed: Some(started.elapsed()),
            });
            report.stages.push(stage);

            if let Some(err) = error {
                if !options.isolate_stages {
                    return Err(err);
                }
                tracing::error!(index = %collection, error = %err, "stage failed; continuing");
            }
        }

        Ok(report)
    }

    fn run_stage(
        &self,
        collection: Collection,
        date: NaiveDate,
        sink: &dyn ProgressSink,
    ) -> (StageReport, Option<HazardError>) {
        sink.event(phase(format!("phase=Fetch; {collection}")));
        match collection {
            Collection::Fires => {
                let fires = fetch_fires(&self.fires, &self.settings.fire_feeds);
                let (mut stage, error) = self.index_stage(collection, &fires, sink);
                if error.is_none() {
                    sink.event(phase(format!("phase=Notify; {} fires", fires.len())));
                    stage.notify = Some(notify_fires(
                        &self.webhook,
                        self.settings.webhook.as_ref(),
                        &fires,
                    ));
                }
                (stage, error)
            }
            Collection::Shelters => {
                let shelters = fetch_shelters(&self.shelters, &self.settings.shelter_url);
                self.index_stage(collection, &shelters, sink)
            }
            Collection::Aqi => {
                let observations = fetch_aqi(&self.aqi, &self.settings.airnow, date);
                self.index_stage(collection, &observations, sink)
            }
        }
    }

    fn index_stage<T: Record>(
        &self,
        collection: Collection,
        records: &[T],
        sink: &dyn ProgressSink,
    ) -> (StageReport, Option<HazardError>) {
        sink.event(phase(format!(
            "phase=Index; {} records into {collection}",
            records.len()
        )));
        let mut stage = StageReport {
            collection,
            fetched: records.len(),
            index: None,
            notify: None,
            error: None,
        };
        match self.writer.write(collection, records) {
            Ok(outcome) => {
                stage.index = Some(outcome);
                (stage, None)
            }
            Err(err) => {
                stage.error = Some(err.to_string());
                (stage, Some(err))
            }
        }
    }
}
