use axum::{
    extract::{Query, State},
    Json,
};

use super::{error::ApiResult, SubjectQuery};
use crate::{
    services::{
        task_logs::{self, SaveTaskLogsRequest, UserTaskLogs},
        StatusResponse,
    },
    AppState,
};

pub async fn save_tasklogs(
    State(state): State<AppState>,
    Json(request): Json<SaveTaskLogsRequest>,
) -> ApiResult<Json<StatusResponse>> {
    Ok(Json(task_logs::save_tasklogs(&state.db, request).await?))
}

pub async fn get_user_tasklogs(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
) -> ApiResult<Json<UserTaskLogs>> {
    Ok(Json(task_logs::get_user_tasklogs(&state.db, query.subject_id()?).await?))
}
