use axum::{
    body::Body,
    extract::{Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue,
    },
    response::Response,
};

use super::{error::ApiResult, SubjectQuery};
use crate::{services::export, AppState};

fn csv_attachment(body: Vec<u8>, file_name: &str) -> Response {
    let mut response = Response::new(Body::from(body));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
    {
        response
            .headers_mut()
            .insert(CONTENT_DISPOSITION, disposition);
    }
    response
}

pub async fn download_points(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
) -> ApiResult<Response> {
    let subject_id = query.subject_id()?;
    let csv = export::export_points_csv(&state.db, subject_id).await?;
    Ok(csv_attachment(csv, &format!("points_subject_{subject_id}.csv")))
}

pub async fn download_tasklogs(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
) -> ApiResult<Response> {
    let subject_id = query.subject_id()?;
    let csv = export::export_tasklogs_csv(&state.db, subject_id).await?;
    Ok(csv_attachment(csv, &format!("tasklogs_subject_{subject_id}.csv")))
}

pub async fn download_all(State(state): State<AppState>) -> ApiResult<Response> {
    let csv = export::export_all_points_csv(&state.db).await?;
    Ok(csv_attachment(csv, "points_all.csv"))
}
