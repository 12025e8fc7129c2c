use serde::{Deserialize, Serialize};

use super::{ServiceError, ServiceResult};
use crate::{
    db::{Database, NewSubject, Subject},
    log_info,
};

const ENABLE_LOGS: bool = true;

const MAX_NAME_LEN: usize = 50;

/// Public view of a subject as listed by `/api/get-subjects`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubjectInfo {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub age: i64,
}

impl From<Subject> for SubjectInfo {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name,
            surname: subject.surname,
            age: subject.age,
        }
    }
}

fn validate_name(value: &str, field: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ServiceError::Validation(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub async fn register_subject(db: &Database, input: NewSubject) -> ServiceResult<Subject> {
    let name = validate_name(&input.name, "name")?;
    let surname = validate_name(&input.surname, "surname")?;
    if input.age < 0 {
        return Err(ServiceError::Validation("age must not be negative".into()));
    }

    let subject = db
        .create_subject(NewSubject {
            name,
            surname,
            age: input.age,
            study_id: input.study_id,
        })
        .await?;

    log_info!("Registered subject {}", subject.id);
    Ok(subject)
}

pub async fn get_all_subjects(db: &Database) -> ServiceResult<Vec<SubjectInfo>> {
    let subjects = db.get_all_subjects().await?;
    Ok(subjects.into_iter().map(SubjectInfo::from).collect())
}

/// Look a subject up, mapping absence to `NotFound`.
pub async fn require_subject(db: &Database, subject_id: i64) -> ServiceResult<Subject> {
    db.get_subject_by_id(subject_id)
        .await?
        .ok_or_else(ServiceError::subject_not_found)
}
