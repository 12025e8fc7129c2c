use axum::{
    extract::State,
    http::StatusCode,
    response::Redirect,
    Form, Json,
};
use serde::Deserialize;

use super::error::ApiResult;
use crate::{
    db::{NewSubject, Subject},
    services::{subjects, ServiceError},
    AppState,
};

/// Registration form posted by the landing page. The Spanish field names are
/// what older copies of the page still send.
#[derive(Debug, Deserialize)]
pub struct RegistrationForm {
    #[serde(alias = "nombre")]
    pub name: String,
    #[serde(alias = "apellido")]
    pub surname: String,
    #[serde(alias = "edad")]
    pub age: String,
}

pub async fn register_from_form(
    State(state): State<AppState>,
    Form(form): Form<RegistrationForm>,
) -> ApiResult<Redirect> {
    let age = form
        .age
        .trim()
        .parse::<i64>()
        .map_err(|_| ServiceError::Validation(format!("age '{}' is not a number", form.age)))?;

    let subject = subjects::register_subject(
        &state.db,
        NewSubject {
            name: form.name,
            surname: form.surname,
            age,
            study_id: state.active_study_id,
        },
    )
    .await?;

    Ok(Redirect::to(&format!("/gaze-tracking?id={}", subject.id)))
}

pub async fn create_subject(
    State(state): State<AppState>,
    Json(mut input): Json<NewSubject>,
) -> ApiResult<(StatusCode, Json<Subject>)> {
    if input.study_id.is_none() {
        input.study_id = state.active_study_id;
    }
    let subject = subjects::register_subject(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

pub async fn list_subjects(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<subjects::SubjectInfo>>> {
    Ok(Json(subjects::get_all_subjects(&state.db).await?))
}
