use chrono::Utc;

use super::{ServiceError, ServiceResult};
use crate::{
    db::{Database, Study, StudyInput, StudyUpdate},
    log_info, log_warn,
    settings::AppConfig,
};

const ENABLE_LOGS: bool = true;

pub const STUDY_NOT_FOUND: &str = "Study not found";

fn study_not_found() -> ServiceError {
    ServiceError::NotFound(STUDY_NOT_FOUND.to_string())
}

fn clean_name(name: &str) -> ServiceResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation("study name is required".into()));
    }
    Ok(trimmed.to_string())
}

fn check_single_prototype(url: Option<&String>, image: Option<&String>) -> ServiceResult<()> {
    if url.is_some() && image.is_some() {
        return Err(ServiceError::Validation(
            "a study references either a prototype URL or an image, not both".into(),
        ));
    }
    Ok(())
}

pub async fn create_study(db: &Database, input: StudyInput) -> ServiceResult<Study> {
    let name = clean_name(&input.name)?;
    check_single_prototype(input.prototype_url.as_ref(), input.prototype_image_path.as_ref())?;

    let study = db.create_study(StudyInput { name, ..input }).await?;
    log_info!("Created study {} ({})", study.id, study.name);
    Ok(study)
}

pub async fn list_studies(db: &Database) -> ServiceResult<Vec<Study>> {
    Ok(db.get_all_studies().await?)
}

/// Exact name match; names are not unique, so the oldest wins.
pub async fn find_studies_by_name(db: &Database, name: String) -> ServiceResult<Vec<Study>> {
    Ok(db.get_study_by_name(name).await?.into_iter().collect())
}

pub async fn get_study(db: &Database, study_id: i64) -> ServiceResult<Study> {
    db.get_study_by_id(study_id).await?.ok_or_else(study_not_found)
}

/// The study this run attaches subjects to, falling back to the newest one
/// when it was deleted while the server was running.
pub async fn current_study(db: &Database, active_study_id: Option<i64>) -> ServiceResult<Study> {
    if let Some(study_id) = active_study_id {
        if let Some(study) = db.get_study_by_id(study_id).await? {
            return Ok(study);
        }
    }
    db.get_active_study().await?.ok_or_else(study_not_found)
}

pub async fn update_study(
    db: &Database,
    study_id: i64,
    mut update: StudyUpdate,
) -> ServiceResult<Study> {
    let current = get_study(db, study_id).await?;

    if let Some(name) = update.name.as_deref() {
        update.name = Some(clean_name(name)?);
    }
    check_single_prototype(
        update.prototype_url.as_ref().or(current.prototype_url.as_ref()),
        update
            .prototype_image_path
            .as_ref()
            .or(current.prototype_image_path.as_ref()),
    )?;

    if update.is_empty() {
        return Ok(current);
    }

    db.update_study(study_id, update)
        .await?
        .ok_or_else(study_not_found)
}

pub async fn delete_study(db: &Database, study_id: i64) -> ServiceResult<()> {
    if db.delete_study(study_id).await? {
        log_info!("Deleted study {study_id}");
        Ok(())
    } else {
        Err(study_not_found())
    }
}

/// Pick the study new subjects are attached to for this run.
///
/// Reuses the study recorded against the configured prototype. Otherwise a
/// new one is created under `name`, or a timestamped default.
pub async fn resolve_active_study(
    db: &Database,
    config: &AppConfig,
    name: Option<String>,
) -> ServiceResult<Study> {
    if let Some(existing) = db
        .find_study_by_prototype(config.url_path.clone(), config.img_path.clone())
        .await?
    {
        log_info!("Using study {} ({})", existing.id, existing.name);
        return Ok(existing);
    }

    let name = name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("Study {}", Utc::now().format("%Y-%m-%d %H:%M:%S")));
    if config.url_path.is_none() && config.img_path.is_none() {
        log_warn!("No prototype configured; study '{name}' will not reference one");
    }

    create_study(
        db,
        StudyInput {
            name,
            description: None,
            prototype_url: config.url_path.clone(),
            prototype_image_path: config.img_path.clone(),
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_config(url: &str) -> AppConfig {
        AppConfig {
            url_path: Some(url.into()),
            img_path: None,
            port: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_blank_name_and_two_prototypes() {
        let db = Database::open_in_memory().unwrap();

        let blank = create_study(
            &db,
            StudyInput {
                name: "   ".into(),
                ..StudyInput::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(blank, ServiceError::Validation(_)));

        let both = create_study(
            &db,
            StudyInput {
                name: "Checkout".into(),
                prototype_url: Some("https://example.com".into()),
                prototype_image_path: Some("/tmp/a.png".into()),
                ..StudyInput::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(both, ServiceError::Validation(_)));
        assert!(list_studies(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_cannot_add_a_second_prototype() {
        let db = Database::open_in_memory().unwrap();
        let study = create_study(
            &db,
            StudyInput {
                name: "Landing".into(),
                prototype_url: Some("https://example.com".into()),
                ..StudyInput::default()
            },
        )
        .await
        .unwrap();

        let err = update_study(
            &db,
            study.id,
            StudyUpdate {
                prototype_image_path: Some("/tmp/a.png".into()),
                ..StudyUpdate::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let renamed = update_study(
            &db,
            study.id,
            StudyUpdate {
                name: Some(" Landing v2 ".into()),
                ..StudyUpdate::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(renamed.name, "Landing v2");
        assert_eq!(renamed.prototype_url.as_deref(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn unknown_study_is_not_found() {
        let db = Database::open_in_memory().unwrap();

        assert!(matches!(
            get_study(&db, 9).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            update_study(&db, 9, StudyUpdate::default()).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            delete_study(&db, 9).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn current_study_falls_back_to_newest() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            current_study(&db, None).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));

        let first = resolve_active_study(&db, &url_config("https://example.com/a"), None)
            .await
            .unwrap();
        let second = resolve_active_study(&db, &url_config("https://example.com/b"), None)
            .await
            .unwrap();

        assert_eq!(current_study(&db, Some(first.id)).await.unwrap().id, first.id);
        delete_study(&db, first.id).await.unwrap();
        assert_eq!(current_study(&db, Some(first.id)).await.unwrap().id, second.id);
    }

    #[tokio::test]
    async fn active_study_is_reused_for_the_same_prototype() {
        let db = Database::open_in_memory().unwrap();
        let config = url_config("https://example.com/proto");

        let first = resolve_active_study(&db, &config, Some("Pilot".into()))
            .await
            .unwrap();
        assert_eq!(first.name, "Pilot");
        assert_eq!(first.prototype_url.as_deref(), Some("https://example.com/proto"));

        let again = resolve_active_study(&db, &config, Some("Ignored".into()))
            .await
            .unwrap();
        assert_eq!(again.id, first.id);

        let other = resolve_active_study(&db, &url_config("https://example.com/v2"), None)
            .await
            .unwrap();
        assert_ne!(other.id, first.id);
        assert!(other.name.starts_with("Study "));
        assert_eq!(list_studies(&db).await.unwrap().len(), 2);
    }
}
