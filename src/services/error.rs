use thiserror::Error;

use crate::db::helpers::is_constraint_violation;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error(transparent)]
    Internal(anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn subject_not_found() -> Self {
        ServiceError::NotFound(super::SUBJECT_NOT_FOUND.to_string())
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        if is_constraint_violation(&err) {
            ServiceError::Constraint(format!("{err:#}"))
        } else {
            ServiceError::Internal(err)
        }
    }
}

impl From<csv::Error> for ServiceError {
    fn from(err: csv::Error) -> Self {
        ServiceError::Internal(anyhow::Error::new(err).context("failed to write CSV"))
    }
}
