//! JSON payloads printed by the binary.

use crate::aggregate::RunResult;
use crate::Error;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use vacancy_parser::{render, Record};

/// A record together with its human-readable summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vacancy {
    #[serde(flatten)]
    pub record: Record,
    pub formatted_text: String,
}

impl From<Record> for Vacancy {
    fn from(record: Record) -> Self {
        let formatted_text = render(&record);
        Self {
            record,
            formatted_text,
        }
    }
}

/// Successful harvest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub success: bool,
    pub timestamp: String,
    pub execution_time: String,
    pub total_vacancies: usize,
    pub extracted_vacancies: usize,
    pub failed_vacancies: usize,
    pub pages_visited: u32,
    pub success_rate: String,
    pub status_distribution: BTreeMap<String, usize>,
    pub vacancies: Vec<Vacancy>,
}

impl RunReport {
    pub fn new(result: RunResult, elapsed: Duration) -> Self {
        let success_rate = result.success_rate_label();
        let status_distribution = result.status_distribution();
        Self {
            success: result.succeeded > 0,
            timestamp: now(),
            execution_time: format!("{:.2}s", elapsed.as_secs_f64()),
            total_vacancies: result.total_expected,
            extracted_vacancies: result.succeeded,
            failed_vacancies: result.failed,
            pages_visited: result.current_page,
            success_rate,
            status_distribution,
            vacancies: result.records.into_iter().map(Vacancy::from).collect(),
        }
    }
}

/// Harvest that ended in an error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub success: bool,
    pub timestamp: String,
    pub error: String,
    pub error_type: String,
    pub details: Option<String>,
    pub vacancies: Vec<Vacancy>,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        Self {
            success: false,
            timestamp: now(),
            error: err.to_string(),
            error_type: err.kind().to_string(),
            details: err.hint().map(String::from),
            vacancies: Vec::new(),
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
