//! CSV exports.
//!
//! Files are built entirely in memory. Rows end with `\n`, fields are quoted
//! only when they contain a separator, quote or newline, and missing values
//! are written as empty fields.

use csv::{Terminator, Writer, WriterBuilder};

use super::{
    measurements::PointRecord, subjects::require_subject, task_logs::TaskLogRecord,
    ServiceError, ServiceResult, NO_SUBJECTS,
};
use crate::db::Database;

pub const POINTS_HEADER: [&str; 5] = ["date", "x_mouse", "y_mouse", "x_gaze", "y_gaze"];
pub const TASKLOGS_HEADER: [&str; 3] = ["start_time", "end_time", "response"];
pub const ALL_POINTS_HEADER: [&str; 3] = ["id", "x", "y"];

fn csv_writer() -> Writer<Vec<u8>> {
    WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(writer: Writer<Vec<u8>>) -> ServiceResult<Vec<u8>> {
    writer.into_inner().map_err(|err| {
        ServiceError::Internal(anyhow::anyhow!("failed to flush CSV: {}", err.error()))
    })
}

/// Floats keep a fractional part (`3.0`, not `3`) so columns read as decimals.
fn format_float(value: f64) -> String {
    format!("{value:?}")
}

fn format_optional_float(value: Option<f64>) -> String {
    value.map(format_float).unwrap_or_default()
}

fn point_row(record: &PointRecord) -> [String; 5] {
    [
        record.date.clone(),
        format_optional_float(record.x_mouse),
        format_optional_float(record.y_mouse),
        format_optional_float(record.x_gaze),
        format_optional_float(record.y_gaze),
    ]
}

fn task_log_row(record: &TaskLogRecord) -> [String; 3] {
    [
        record.start_time.clone(),
        record.end_time.clone().unwrap_or_default(),
        record.response.clone().unwrap_or_default(),
    ]
}

pub async fn export_points_csv(db: &Database, subject_id: i64) -> ServiceResult<Vec<u8>> {
    let subject = require_subject(db, subject_id).await?;
    let measurements = db.get_measurements_by_subject(subject.id).await?;

    let mut writer = csv_writer();
    writer.write_record(POINTS_HEADER)?;
    for measurement in &measurements {
        writer.write_record(point_row(&PointRecord::from(measurement)))?;
    }
    finish(writer)
}

pub async fn export_tasklogs_csv(db: &Database, subject_id: i64) -> ServiceResult<Vec<u8>> {
    let subject = require_subject(db, subject_id).await?;
    let logs = db.get_task_logs_by_subject(subject.id).await?;

    let mut writer = csv_writer();
    writer.write_record(TASKLOGS_HEADER)?;
    for log in &logs {
        writer.write_record(task_log_row(&TaskLogRecord::from(log)))?;
    }
    finish(writer)
}

/// Every stored point across all subjects, one row per point.
///
/// Gaze and mouse points of the same measurement land on separate rows that
/// share only the subject id; rows do not map back to measurements.
pub async fn export_all_points_csv(db: &Database) -> ServiceResult<Vec<u8>> {
    if db.count_subjects().await? == 0 {
        return Err(ServiceError::NotFound(NO_SUBJECTS.to_string()));
    }
    let points = db.get_points_for_all_subjects().await?;

    let mut writer = csv_writer();
    writer.write_record(ALL_POINTS_HEADER)?;
    for point in &points {
        writer.write_record([
            point.subject_id.to_string(),
            format_float(point.x),
            format_float(point.y),
        ])?;
    }
    finish(writer)
}
