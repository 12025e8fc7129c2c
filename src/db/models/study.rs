//! Study data models.
//!
//! A study groups subjects recorded against the same prototype, which is
//! either a live URL or a static image on disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Study {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub prototype_url: Option<String>,
    pub prototype_image_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input data for creating a study
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prototype_url: Option<String>,
    #[serde(default)]
    pub prototype_image_path: Option<String>,
}

/// Partial update; only `Some` fields overwrite the stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prototype_url: Option<String>,
    #[serde(default)]
    pub prototype_image_path: Option<String>,
}

impl StudyUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.prototype_url.is_none()
            && self.prototype_image_path.is_none()
    }
}
