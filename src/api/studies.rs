use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::error::ApiResult;
use crate::{
    db::{Study, StudyInput, StudyUpdate},
    services::studies,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct StudyFilter {
    pub name: Option<String>,
}

pub async fn list_studies(
    State(state): State<AppState>,
    Query(filter): Query<StudyFilter>,
) -> ApiResult<Json<Vec<Study>>> {
    let found = match filter.name {
        Some(name) => studies::find_studies_by_name(&state.db, name).await?,
        None => studies::list_studies(&state.db).await?,
    };
    Ok(Json(found))
}

pub async fn active_study(State(state): State<AppState>) -> ApiResult<Json<Study>> {
    Ok(Json(
        studies::current_study(&state.db, state.active_study_id).await?,
    ))
}

pub async fn create_study(
    State(state): State<AppState>,
    Json(input): Json<StudyInput>,
) -> ApiResult<(StatusCode, Json<Study>)> {
    let study = studies::create_study(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(study)))
}

pub async fn get_study(
    State(state): State<AppState>,
    Path(study_id): Path<i64>,
) -> ApiResult<Json<Study>> {
    Ok(Json(studies::get_study(&state.db, study_id).await?))
}

pub async fn update_study(
    State(state): State<AppState>,
    Path(study_id): Path<i64>,
    Json(update): Json<StudyUpdate>,
) -> ApiResult<Json<Study>> {
    Ok(Json(studies::update_study(&state.db, study_id, update).await?))
}

pub async fn delete_study(
    State(state): State<AppState>,
    Path(study_id): Path<i64>,
) -> ApiResult<StatusCode> {
    studies::delete_study(&state.db, study_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
