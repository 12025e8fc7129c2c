//! Subject data models.

use serde::{Deserialize, Serialize};

/// A participant whose gaze and mouse activity is being recorded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub age: i64,
    pub study_id: Option<i64>,
}

/// Input data for registering a subject
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubject {
    pub name: String,
    pub surname: String,
    pub age: i64,
    #[serde(default)]
    pub study_id: Option<i64>,
}
