use serde::{Deserialize, Serialize};

use super::{
    parse_client_date, subjects::require_subject, ServiceError, ServiceResult, StatusResponse,
};
use crate::{
    db::{helpers::format_timestamp, Database, NewTaskLog, TaskLog},
    log_info,
};

const ENABLE_LOGS: bool = true;

pub const TASKLOGS_SAVED: &str = "TaskLogs saved successfully.";

/// Body of `POST /api/save-tasklogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveTaskLogsRequest {
    pub subject_id: i64,
    #[serde(rename = "taskLogs")]
    pub task_logs: Vec<TaskLogEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLogEntry {
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub task_description: Option<String>,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub task_version: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskLogRecord {
    pub start_time: String,
    pub end_time: Option<String>,
    pub response: Option<String>,
}

impl From<&TaskLog> for TaskLogRecord {
    fn from(log: &TaskLog) -> Self {
        Self {
            start_time: format_timestamp(&log.start_time),
            end_time: log.end_time.as_ref().map(format_timestamp),
            response: log.response.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserTaskLogs {
    pub subject_id: i64,
    pub task_logs: Vec<TaskLogRecord>,
}

fn to_new_task_log(index: usize, entry: TaskLogEntry) -> ServiceResult<NewTaskLog> {
    let start_time = parse_client_date(&entry.start_time, "startTime")?;
    // The client sends an empty string for tasks that were never finished.
    let end_time = match entry.end_time.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_client_date(raw, "endTime")?),
        _ => None,
    };

    if let Some(end) = end_time {
        if end < start_time {
            return Err(ServiceError::Validation(format!(
                "task log {index} ends before it starts"
            )));
        }
    }

    Ok(NewTaskLog {
        start_time,
        end_time,
        response: entry.response,
        task_description: entry.task_description,
        task_type: entry.task_type,
        task_version: entry.task_version,
    })
}

/// Store every task log of the request, or none of them.
pub async fn save_tasklogs(
    db: &Database,
    request: SaveTaskLogsRequest,
) -> ServiceResult<StatusResponse> {
    let subject_id = request.subject_id;
    let logs = request
        .task_logs
        .into_iter()
        .enumerate()
        .map(|(index, entry)| to_new_task_log(index, entry))
        .collect::<ServiceResult<Vec<_>>>()?;

    let saved = db.insert_task_logs(subject_id, logs).await?;
    log_info!("Saved {saved} task logs for subject {subject_id}");

    Ok(StatusResponse::success_with(TASKLOGS_SAVED))
}

pub async fn get_user_tasklogs(db: &Database, subject_id: i64) -> ServiceResult<UserTaskLogs> {
    let subject = require_subject(db, subject_id).await?;
    let logs = db.get_task_logs_by_subject(subject.id).await?;

    Ok(UserTaskLogs {
        subject_id,
        task_logs: logs.iter().map(TaskLogRecord::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::NewSubject, services::subjects::register_subject};

    async fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let subject = register_subject(
            &db,
            NewSubject {
                name: "Alan".into(),
                surname: "Turing".into(),
                age: 41,
                study_id: None,
            },
        )
        .await
        .unwrap();
        (db, subject.id)
    }

    fn entry(start: &str, end: Option<&str>, response: &str) -> TaskLogEntry {
        TaskLogEntry {
            start_time: start.into(),
            end_time: end.map(str::to_owned),
            response: Some(response.into()),
            ..TaskLogEntry::default()
        }
    }

    #[tokio::test]
    async fn missing_and_empty_end_times_are_null() {
        let (db, subject_id) = setup().await;

        let status = save_tasklogs(
            &db,
            SaveTaskLogsRequest {
                subject_id,
                task_logs: vec![
                    entry("03/02/2024, 10:00:00 AM", None, "true"),
                    entry("03/02/2024, 10:01:00 AM", Some(""), "12"),
                    entry("03/02/2024, 10:02:00 AM", Some("03/02/2024, 10:03:30 AM"), "done"),
                ],
            },
        )
        .await
        .unwrap();
        assert_eq!(status.message, Some(TASKLOGS_SAVED));

        let logs = get_user_tasklogs(&db, subject_id).await.unwrap();
        assert_eq!(logs.task_logs.len(), 3);
        assert_eq!(logs.task_logs[0].end_time, None);
        assert_eq!(logs.task_logs[1].end_time, None);
        assert_eq!(
            logs.task_logs[2],
            TaskLogRecord {
                start_time: "2024-03-02 10:02:00".into(),
                end_time: Some("2024-03-02 10:03:30".into()),
                response: Some("done".into()),
            }
        );
    }

    #[tokio::test]
    async fn end_before_start_rejects_the_batch() {
        let (db, subject_id) = setup().await;

        let err = save_tasklogs(
            &db,
            SaveTaskLogsRequest {
                subject_id,
                task_logs: vec![
                    entry("03/02/2024, 10:00:00 AM", None, "ok"),
                    entry("03/02/2024, 10:05:00 AM", Some("03/02/2024, 10:04:00 AM"), "bad"),
                ],
            },
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(db.count_task_logs_by_subject(subject_id).await.unwrap(), 0);
    }

    #[test]
    fn payload_uses_camel_case_keys() {
        let request: SaveTaskLogsRequest = serde_json::from_value(serde_json::json!({
            "subject_id": 7,
            "taskLogs": [
                {"startTime": "03/02/2024, 10:00:00 AM", "endTime": null, "response": "yes"},
                {"startTime": "03/02/2024, 10:00:00 AM", "taskType": "bool", "taskVersion": 3}
            ]
        }))
        .unwrap();

        assert_eq!(request.subject_id, 7);
        assert_eq!(request.task_logs[0].end_time, None);
        assert_eq!(request.task_logs[1].response, None);
        assert_eq!(request.task_logs[1].task_type.as_deref(), Some("bool"));
        assert_eq!(request.task_logs[1].task_version, Some(3));
    }

    #[tokio::test]
    async fn unknown_subject_tasklogs_are_not_found() {
        let (db, _) = setup().await;
        let err = get_user_tasklogs(&db, 12345).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
