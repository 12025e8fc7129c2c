use anyhow::{Context, Result};
use log::error;
use rusqlite::{params, Row, Transaction};

use crate::db::{
    connection::Database,
    helpers::{format_timestamp, parse_optional_timestamp, parse_timestamp},
    models::{NewTaskLog, TaskLog},
};

fn row_to_task_log(row: &Row) -> Result<TaskLog> {
    let start_time: String = row.get("start_time")?;
    let end_time: Option<String> = row.get("end_time")?;

    Ok(TaskLog {
        id: row.get("id")?,
        subject_id: row.get("subject_id")?,
        start_time: parse_timestamp(&start_time, "start_time")?,
        end_time: parse_optional_timestamp(end_time, "end_time")?,
        response: row.get("response")?,
        task_description: row.get("task_description")?,
        task_type: row.get("task_type")?,
        task_version: row.get("task_version")?,
    })
}

fn insert_all(tx: &Transaction<'_>, subject_id: i64, logs: &[NewTaskLog]) -> Result<()> {
    for log in logs {
        tx.execute(
            "INSERT INTO task_log (
                start_time,
                end_time,
                response,
                subject_id,
                task_description,
                task_type,
                task_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                format_timestamp(&log.start_time),
                log.end_time.as_ref().map(format_timestamp),
                log.response,
                subject_id,
                log.task_description,
                log.task_type,
                log.task_version,
            ],
        )
        .with_context(|| "failed to insert task log")?;
    }
    Ok(())
}

impl Database {
    /// Store a batch of task logs for one subject in a single transaction.
    pub async fn insert_task_logs(&self, subject_id: i64, logs: Vec<NewTaskLog>) -> Result<usize> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open task log transaction")?;

            match insert_all(&tx, subject_id, &logs) {
                Ok(()) => {
                    tx.commit().context("failed to commit task logs")?;
                    Ok(logs.len())
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback() {
                        error!("Failed to roll back task log batch: {rollback_err}");
                    }
                    Err(err)
                }
            }
        })
        .await
    }

    pub async fn get_task_logs_by_subject(&self, subject_id: i64) -> Result<Vec<TaskLog>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, subject_id, start_time, end_time, response,
                        task_description, task_type, task_version
                 FROM task_log
                 WHERE subject_id = ?1
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query(params![subject_id])?;
            let mut logs = Vec::new();
            while let Some(row) = rows.next()? {
                logs.push(row_to_task_log(row)?);
            }

            Ok(logs)
        })
        .await
    }

    pub async fn count_task_logs_by_subject(&self, subject_id: i64) -> Result<i64> {
        self.execute(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM task_log WHERE subject_id = ?1",
                params![subject_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }
}
