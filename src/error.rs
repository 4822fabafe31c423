use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HazardError {
    #[error("missing required environment variable {0}")]
    #[diagnostic(help("export ALGOLIA_APP_ID and ALGOLIA_ADMIN_KEY before running"))]
    MissingCredential(&'static str),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("FIRMS request failed: {0}")]
    FirmsHttp(String),

    #[error("FIRMS returned status {status}: {message}")]
    FirmsStatus { status: u16, message: String },

    #[error("FIRMS feed is not valid CSV: {0}")]
    FirmsCsv(String),

    #[error("FEMA request failed: {0}")]
    FemaHttp(String),

    #[error("FEMA returned status {status}: {message}")]
    FemaStatus { status: u16, message: String },

    #[error("AirNow request failed: {0}")]
    AirnowHttp(String),

    #[error("AirNow returned status {status}: {message}")]
    AirnowStatus { status: u16, message: String },

    #[error("unexpected AirNow response: {0}")]
    AirnowResponse(String),

    #[error("search index request failed: {0}")]
    IndexHttp(String),

    #[error("search index returned status {status}: {message}")]
    IndexStatus { status: u16, message: String },

    #[error("unexpected search index response: {0}")]
    IndexResponse(String),

    #[error("task {task_id} on index '{index}' not published after {attempts} polls")]
    IndexTaskUnconfirmed {
        index: String,
        task_id: u64,
        attempts: u32,
    },

    #[error("webhook request failed: {0}")]
    WebhookHttp(String),

    #[error("webhook returned status {status}: {message}")]
    WebhookStatus { status: u16, message: String },
}

impl HazardError {
    /// True for failures raised by the index writer, which abort a run.
    pub fn is_index_failure(&self) -> bool {
        matches!(
            self,
            HazardError::IndexHttp(_)
                | HazardError::IndexStatus { .. }
                | HazardError::IndexResponse(_)
                | HazardError::IndexTaskUnconfirmed { .. }
        )
    }

    /// Process exit status for a run that ended with this error: 2 for
    /// configuration problems, 3 for index failures, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        match self {
            HazardError::MissingCredential(_)
            | HazardError::ConfigRead(_)
            | HazardError::ConfigParse(_)
            | HazardError::InvalidConfig(_) => 2,
            error if error.is_index_failure() => 3,
            _ => 1,
        }
    }
}
