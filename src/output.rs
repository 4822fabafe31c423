use std::fmt::Write as _;
use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunReport};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Human,
    Json,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_records<T: Serialize>(records: &[T]) -> io::Result<()> {
        Self::print_json(&records)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards orchestrator phases to the tracing subscriber.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message)
            }
            None => tracing::info!("{}", event.message),
        }
    }
}

/// Human run summary, one line per stage. ANSI colour only when `colored`.
pub fn render_summary(report: &RunReport, colored: bool) -> String {
    let paint = |code: &'static str| if colored { code } else { "" };
    let green = paint("\x1b[32m");
    let yellow = paint("\x1b[33m");
    let cyan = paint("\x1b[36m");
    let red = paint("\x1b[31m");
    let reset = paint("\x1b[0m");

    let mut out = String::new();
    let _ = writeln!(out, "{cyan}hazard-ix summary{reset}");
    for stage in &report.stages {
        let _ = match (&stage.index, &stage.error) {
            (_, Some(error)) => writeln!(
                out,
                "{red}✗ {}: fetched {}, index failed: {error}{reset}",
                stage.collection, stage.fetched
            ),
            (Some(outcome), None) if outcome.records > 0 => writeln!(
                out,
                "{green}✓ {}: indexed {} (task {}){reset}",
                stage.collection,
                outcome.records,
                outcome
                    .task_id
                    .map(|id| id.to_string())
                    .unwrap_or_default()
            ),
            _ => writeln!(out, "{yellow}• {}: nothing to index{reset}", stage.collection),
        };
        if let Some(notify) = &stage.notify {
            let _ = writeln!(out, "{cyan}   webhook: {notify:?}{reset}");
        }
    }
    out
}
