//! HTTP surface consumed by the tracking page and the results dashboard.

mod error;
mod exports;
mod measurements;
mod settings;
mod studies;
mod subjects;
mod task_logs;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use crate::{
    services::{ServiceError, ServiceResult},
    utils::logging::log_requests,
    AppState,
};

/// `?id=<subject id>`. A missing or non-numeric id cannot name a subject, so
/// it reads as not found.
#[derive(Debug, Deserialize)]
pub struct SubjectQuery {
    #[serde(default)]
    pub id: Option<String>,
}

impl SubjectQuery {
    pub fn subject_id(&self) -> ServiceResult<i64> {
        self.id
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .ok_or_else(ServiceError::subject_not_found)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(subjects::register_from_form))
        .route("/health", get(health))
        .route("/api/subjects", post(subjects::create_subject))
        .route("/api/get-subjects", get(subjects::list_subjects))
        .route("/api/save-points", post(measurements::save_points))
        .route("/api/get-user-points", get(measurements::get_user_points))
        .route(
            "/api/get-subject-results",
            get(measurements::get_subject_results),
        )
        .route("/api/save-tasklogs", post(task_logs::save_tasklogs))
        .route("/api/get-user-tasklogs", get(task_logs::get_user_tasklogs))
        .route("/api/download-points", get(exports::download_points))
        .route("/api/download-tasklogs", get(exports::download_tasklogs))
        .route("/api/download-all", get(exports::download_all))
        .route("/api/config", get(settings::get_config))
        .route("/api/tasks", get(settings::get_tasks))
        .route(
            "/api/studies",
            get(studies::list_studies).post(studies::create_study),
        )
        .route("/api/studies/active", get(studies::active_study))
        .route(
            "/api/studies/:id",
            get(studies::get_study)
                .patch(studies::update_study)
                .delete(studies::delete_study),
        )
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{
            header::{CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION},
            Request, StatusCode,
        },
        response::Response,
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        db::{Database, StudyInput},
        settings::{AppConfig, SettingsStore, TaskType, TasksFile},
    };

    async fn test_app(active_study: bool) -> (Router, AppState, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let settings = SettingsStore::new(dir.path().to_path_buf()).unwrap();

        let active_study_id = if active_study {
            let study = db
                .create_study(StudyInput {
                    name: "Pilot".into(),
                    ..StudyInput::default()
                })
                .await
                .unwrap();
            Some(study.id)
        } else {
            None
        };

        let state = AppState {
            db,
            settings: Arc::new(settings),
            active_study_id,
        };
        (router(state.clone()), state, dir)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    async fn create_subject(app: &Router) -> i64 {
        let response = send(
            app,
            json_request(
                "POST",
                "/api/subjects",
                json!({"name": "Ada", "surname": "Lovelace", "age": 36}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn health_responds_ok() {
        let (app, _state, _dir) = test_app(false).await;
        let response = send(&app, get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn form_registration_redirects_to_tracking_page() {
        let (app, state, _dir) = test_app(true).await;

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("nombre=Grace&apellido=Hopper&edad=85"))
            .unwrap();
        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "/gaze-tracking?id=1"
        );

        let subject = state.db.get_subject_by_id(1).await.unwrap().unwrap();
        assert_eq!(subject.name, "Grace");
        assert_eq!(subject.study_id, state.active_study_id);

        let active = body_json(send(&app, get("/api/studies/active")).await).await;
        assert_eq!(active["name"], json!("Pilot"));
    }

    #[tokio::test]
    async fn form_registration_rejects_non_numeric_age() {
        let (app, _state, _dir) = test_app(false).await;

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Grace&surname=Hopper&age=old"))
            .unwrap();
        let response = send(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn saved_points_are_listed_and_exported() {
        let (app, _state, _dir) = test_app(false).await;
        let id = create_subject(&app).await;

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/save-points",
                json!({
                    "id": id,
                    "points": [
                        {"date": "01/15/2024, 03:30:00 PM",
                         "gaze": {"x": 10.5, "y": 20.0},
                         "mouse": {"x": 100.0, "y": 200.0}},
                        {"date": "01/15/2024, 03:30:01 PM",
                         "mouse": {"x": 101.0, "y": 201.0}}
                    ]
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "success"}));

        let points = body_json(send(&app, get(&format!("/api/get-user-points?id={id}"))).await).await;
        assert_eq!(points["subject_id"], json!(id));
        assert_eq!(points["points"][0]["date"], json!("2024-01-15 15:30:00"));
        assert_eq!(points["points"][1]["x_gaze"], Value::Null);

        let results =
            body_json(send(&app, get(&format!("/api/get-subject-results?id={id}"))).await).await;
        assert_eq!(results["subject"]["name"], json!("Ada"));
        assert_eq!(results["points"].as_array().unwrap().len(), 3);

        let response = send(&app, get(&format!("/api/download-points?id={id}"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_DISPOSITION).unwrap(),
            &format!("attachment; filename=\"points_subject_{id}.csv\"")
        );
        let csv = body_text(response).await;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,x_mouse,y_mouse,x_gaze,y_gaze");
        assert_eq!(lines[1], "2024-01-15 15:30:00,100.0,200.0,10.5,20.0");
        assert_eq!(lines[2], "2024-01-15 15:30:01,101.0,201.0,,");

        let response = send(&app, get("/api/download-all")).await;
        assert_eq!(
            response.headers().get(CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"points_all.csv\""
        );
        assert_eq!(body_text(response).await.lines().count(), 4);
    }

    #[tokio::test]
    async fn unknown_subject_is_a_404_with_plain_message() {
        let (app, _state, _dir) = test_app(false).await;

        for uri in [
            "/api/get-user-points?id=42",
            "/api/get-user-tasklogs?id=42",
            "/api/get-subject-results?id=42",
            "/api/download-points?id=42",
            "/api/download-tasklogs?id=42",
        ] {
            let response = send(&app, get(uri)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body_text(response).await, "Subject not found");
        }
    }

    #[tokio::test]
    async fn missing_or_malformed_subject_id_is_not_found() {
        let (app, _state, _dir) = test_app(false).await;

        for uri in [
            "/api/get-user-points",
            "/api/get-user-points?id=abc",
            "/api/get-user-tasklogs?id=",
            "/api/get-subject-results",
            "/api/download-points?id=",
            "/api/download-tasklogs?id=1.5",
        ] {
            let response = send(&app, get(uri)).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body_text(response).await, "Subject not found");
        }
    }

    #[tokio::test]
    async fn config_is_not_found_until_written() {
        let (app, _state, _dir) = test_app(false).await;
        let response = send(&app, get("/api/config")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "No configuration");
    }

    #[tokio::test]
    async fn download_all_without_subjects_is_not_found() {
        let (app, _state, _dir) = test_app(false).await;
        let response = send(&app, get("/api/download-all")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "No registered subjects");
    }

    #[tokio::test]
    async fn tasklog_batch_with_bad_date_stores_nothing() {
        let (app, _state, _dir) = test_app(false).await;
        let id = create_subject(&app).await;

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/save-tasklogs",
                json!({
                    "subject_id": id,
                    "taskLogs": [
                        {"startTime": "01/15/2024, 03:30:00 PM",
                         "endTime": "01/15/2024, 03:31:00 PM",
                         "response": "yes"},
                        {"startTime": "not a date"}
                    ]
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let logs = body_json(send(&app, get(&format!("/api/get-user-tasklogs?id={id}"))).await).await;
        assert_eq!(logs["task_logs"], json!([]));

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/save-tasklogs",
                json!({
                    "subject_id": id,
                    "taskLogs": [{"startTime": "01/15/2024, 03:30:00 PM", "endTime": ""}]
                }),
            ),
        )
        .await;
        assert_eq!(
            body_json(response).await,
            json!({"status": "success", "message": "TaskLogs saved successfully."})
        );

        let logs = body_json(send(&app, get(&format!("/api/get-user-tasklogs?id={id}"))).await).await;
        assert_eq!(logs["task_logs"][0]["end_time"], Value::Null);
    }

    #[tokio::test]
    async fn studies_crud_round_trip() {
        let (app, _state, _dir) = test_app(false).await;

        let response = send(
            &app,
            json_request(
                "POST",
                "/api/studies",
                json!({"name": "Checkout", "prototype_url": "https://example.com"}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["id"].as_i64().unwrap();

        let response = send(
            &app,
            json_request(
                "PATCH",
                &format!("/api/studies/{id}"),
                json!({"description": "Second round"}),
            ),
        )
        .await;
        let study = body_json(response).await;
        assert_eq!(study["description"], json!("Second round"));
        assert_eq!(study["name"], json!("Checkout"));

        let listed = body_json(send(&app, get("/api/studies")).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        let by_name = body_json(send(&app, get("/api/studies?name=Checkout")).await).await;
        assert_eq!(by_name[0]["id"], json!(id));
        let unknown = body_json(send(&app, get("/api/studies?name=Nope")).await).await;
        assert_eq!(unknown, json!([]));

        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/api/studies/{id}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, delete).await.status(), StatusCode::NO_CONTENT);

        let response = send(&app, get(&format!("/api/studies/{id}"))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn config_and_tasks_are_served_from_settings() {
        let (app, state, _dir) = test_app(false).await;

        let response = send(&app, get("/api/tasks")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        state
            .settings
            .update_config(AppConfig {
                url_path: None,
                img_path: Some("static/prototype.png".into()),
                port: Some(5002),
            })
            .unwrap();
        let mut tasks = TasksFile::default();
        tasks
            .add_task("Find the checkout button".into(), TaskType::Bool)
            .unwrap();
        state.settings.update_tasks(tasks).unwrap();

        let config = body_json(send(&app, get("/api/config")).await).await;
        assert_eq!(
            config,
            json!({"url_path": null, "img_path": "static/prototype.png", "port": 5002})
        );

        let tasks = body_json(send(&app, get("/api/tasks")).await).await;
        assert_eq!(tasks["tasks"][0]["type"], json!("bool"));
    }
}
