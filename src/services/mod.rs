//! Use cases on top of the repositories.
//!
//! Services own request validation, client date parsing and the shaping of
//! records into the JSON and CSV views served over HTTP.

pub mod error;
pub mod export;
pub mod measurements;
pub mod studies;
pub mod subjects;
pub mod task_logs;

use chrono::NaiveDateTime;
use serde::Serialize;

pub use error::{ServiceError, ServiceResult};

/// Timestamp format sent by the tracking page, e.g. `01/15/2024, 03:30:00 PM`.
pub const CLIENT_DATE_FORMAT: &str = "%m/%d/%Y, %I:%M:%S %p";

pub const SUBJECT_NOT_FOUND: &str = "Subject not found";
pub const NO_SUBJECTS: &str = "No registered subjects";

pub fn parse_client_date(value: &str, field: &str) -> ServiceResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), CLIENT_DATE_FORMAT).map_err(|err| {
        ServiceError::Validation(format!("invalid {field} '{value}': {err}"))
    })
}

/// Body returned by the ingestion endpoints.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success",
            message: None,
        }
    }

    pub fn success_with(message: &'static str) -> Self {
        Self {
            status: "success",
            message: Some(message),
        }
    }
}
