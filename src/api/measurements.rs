use axum::{
    extract::{Query, State},
    Json,
};

use super::{error::ApiResult, SubjectQuery};
use crate::{
    services::{
        measurements::{self, SavePointsRequest, SubjectResults, UserPoints},
        StatusResponse,
    },
    AppState,
};

pub async fn save_points(
    State(state): State<AppState>,
    Json(request): Json<SavePointsRequest>,
) -> ApiResult<Json<StatusResponse>> {
    Ok(Json(measurements::save_points(&state.db, request).await?))
}

pub async fn get_user_points(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
) -> ApiResult<Json<UserPoints>> {
    Ok(Json(measurements::get_user_points(&state.db, query.subject_id()?).await?))
}

pub async fn get_subject_results(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
) -> ApiResult<Json<SubjectResults>> {
    Ok(Json(
        measurements::get_subject_results(&state.db, query.subject_id()?).await?,
    ))
}
