//! Task log data models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskLog {
    pub id: i64,
    pub subject_id: i64,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub response: Option<String>,
    // Snapshot of the task definition, kept even if tasks.json changes later.
    pub task_description: Option<String>,
    pub task_type: Option<String>,
    pub task_version: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewTaskLog {
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub response: Option<String>,
    pub task_description: Option<String>,
    pub task_type: Option<String>,
    pub task_version: Option<i64>,
}
