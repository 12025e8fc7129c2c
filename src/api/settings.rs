use axum::{extract::State, Json};

use super::error::ApiResult;
use crate::{
    services::ServiceError,
    settings::{AppConfig, TasksFile},
    AppState,
};

pub async fn get_config(State(state): State<AppState>) -> ApiResult<Json<AppConfig>> {
    state
        .settings
        .stored_config()
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound("No configuration".into()))
}

pub async fn get_tasks(State(state): State<AppState>) -> ApiResult<Json<TasksFile>> {
    state
        .settings
        .tasks()
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound("No tasks configured".into()))
}
