//! # vacancy-harvest
//!
//! Harvests job vacancies from a paginated list whose details only show up in a
//! per-row overlay. Each row is opened, the overlay is confirmed to show that
//! row's vacancy, its text is parsed into a [`Record`], and the overlay is closed
//! again. Rows that fail are counted and skipped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vacancy_harvest::{Config, Harvester};
//!
//! # #[tokio::main]
//! # async fn main() -> vacancy_harvest::Result<()> {
//! let config = Config::load("configs/selecty.yaml")?;
//! let mut harvester = Harvester::launch(&config.browser).await?;
//! let report = harvester.run(&config).await;
//! harvester.close().await?;
//! println!("{}", serde_json::to_string_pretty(&report?)?);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod driver;
pub mod modal;
pub mod pipeline;
pub mod report;
pub mod row;
mod runner;
pub mod wait;

pub use aggregate::{Aggregator, RunResult};
pub use config::{
    BrowserConfig, Config, ExtractionConfig, LoginConfig, MetaProbe, OnFailure, Params,
    RetryConfig, Selectors, TargetConfig, Timing,
};
pub use driver::{Driver, EokaDriver};
pub use modal::{titles_match, ModalManager, Stage};
pub use pipeline::{CancelToken, Pipeline, RowOutcome};
pub use report::{ErrorReport, RunReport};
pub use row::{Row, RowMetaReader};
pub use runner::{session, Harvester};
pub use vacancy_parser::{parse_record, Record, PLACEHOLDER};
pub use wait::{wait_until, Poll, PollPolicy};

/// Result type for vacancy-harvest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or running a harvest.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("driver error: {0}")]
    Driver(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("could not open the detail overlay of row {row}: {reason}")]
    ModalOpen { row: usize, reason: String },

    #[error("overlay never showed '{expected}' after {attempts} reads")]
    ContentSyncTimeout { expected: String, attempts: u32 },

    #[error("no vacancy was extracted ({failed} rows failed)")]
    ExtractionExhausted { failed: usize },

    #[error("harvest cancelled before any vacancy was extracted")]
    Cancelled,
}

impl Error {
    /// Error category reported as `errorType`.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Auth(_) => "AUTH_ERROR",
            Error::Navigation(_) => "NAVIGATION_ERROR",
            Error::Config(_) | Error::Yaml(_) => "ENVIRONMENT_ERROR",
            Error::ModalOpen { .. }
            | Error::ContentSyncTimeout { .. }
            | Error::ExtractionExhausted { .. } => "EXTRACTION_ERROR",
            Error::Cancelled => "CANCELLED",
            Error::Io(_) | Error::Json(_) | Error::Browser(_) | Error::Driver(_) => {
                "UNKNOWN_ERROR"
            }
        }
    }

    /// Process exit code.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            "AUTH_ERROR" => 1,
            "NAVIGATION_ERROR" => 2,
            "ENVIRONMENT_ERROR" => 3,
            "EXTRACTION_ERROR" => 4,
            "CANCELLED" => 130,
            _ => 5,
        }
    }

    /// What to check when this error ends a run.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Error::Auth(_) => Some("check the credentials and the login form selectors"),
            Error::Navigation(_) => Some("check target.url and the table selectors"),
            Error::Config(_) | Error::Yaml(_) => {
                Some("check the config file and the required parameters")
            }
            Error::ExtractionExhausted { .. } => {
                Some("the page structure may have changed; check the row and overlay selectors")
            }
            _ => None,
        }
    }
}
