use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{log_error, services::ServiceError};

const ENABLE_LOGS: bool = true;

pub type ApiResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::Constraint(_) => StatusCode::CONFLICT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ServiceError::Internal(err) => {
                log_error!("Request failed: {err:#}");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, body).into_response()
    }
}
