use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::{
    connection::Database,
    helpers::parse_datetime,
    models::{Study, StudyInput, StudyUpdate},
};

const STUDY_COLUMNS: &str =
    "id, name, description, prototype_url, prototype_image_path, created_at";

fn row_to_study(row: &Row) -> Result<Study> {
    let created_at: String = row.get("created_at")?;

    Ok(Study {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        prototype_url: row.get("prototype_url")?,
        prototype_image_path: row.get("prototype_image_path")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn query_studies(
    conn: &Connection,
    sql: &str,
    args: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Study>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(args)?;
    let mut studies = Vec::new();
    while let Some(row) = rows.next()? {
        studies.push(row_to_study(row)?);
    }
    Ok(studies)
}

fn find_study(conn: &Connection, study_id: i64) -> Result<Option<Study>> {
    let mut stmt = conn.prepare(&format!("SELECT {STUDY_COLUMNS} FROM study WHERE id = ?1"))?;
    let mut rows = stmt.query(params![study_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_study(row)?)),
        None => Ok(None),
    }
}

impl Database {
    pub async fn create_study(&self, input: StudyInput) -> Result<Study> {
        self.execute(move |conn| {
            let now = Utc::now();

            conn.execute(
                "INSERT INTO study (name, description, prototype_url, prototype_image_path, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    input.name,
                    input.description,
                    input.prototype_url,
                    input.prototype_image_path,
                    now.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )
            .with_context(|| "failed to insert study")?;

            let study_id = conn.last_insert_rowid();
            find_study(conn, study_id)?.ok_or_else(|| anyhow!("Study not found after insert"))
        })
        .await
    }

    /// All studies, newest first
    pub async fn get_all_studies(&self) -> Result<Vec<Study>> {
        self.execute(|conn| {
            query_studies(
                conn,
                &format!("SELECT {STUDY_COLUMNS} FROM study ORDER BY created_at DESC, id DESC"),
                &[],
            )
        })
        .await
    }

    pub async fn get_study_by_id(&self, study_id: i64) -> Result<Option<Study>> {
        self.execute(move |conn| find_study(conn, study_id)).await
    }

    pub async fn get_study_by_name(&self, name: String) -> Result<Option<Study>> {
        self.execute(move |conn| {
            let studies = query_studies(
                conn,
                &format!("SELECT {STUDY_COLUMNS} FROM study WHERE name = ?1 ORDER BY id ASC LIMIT 1"),
                &[&name as &dyn rusqlite::ToSql],
            )?;
            Ok(studies.into_iter().next())
        })
        .await
    }

    /// The most recently created study, if any.
    pub async fn get_active_study(&self) -> Result<Option<Study>> {
        self.execute(|conn| {
            let studies = query_studies(
                conn,
                &format!(
                    "SELECT {STUDY_COLUMNS} FROM study ORDER BY created_at DESC, id DESC LIMIT 1"
                ),
                &[],
            )?;
            Ok(studies.into_iter().next())
        })
        .await
    }

    /// Study whose prototype reference matches exactly; NULL matches NULL.
    pub async fn find_study_by_prototype(
        &self,
        prototype_url: Option<String>,
        prototype_image_path: Option<String>,
    ) -> Result<Option<Study>> {
        self.execute(move |conn| {
            let studies = query_studies(
                conn,
                &format!(
                    "SELECT {STUDY_COLUMNS} FROM study
                     WHERE prototype_url IS ?1 AND prototype_image_path IS ?2
                     ORDER BY created_at DESC, id DESC
                     LIMIT 1"
                ),
                &[
                    &prototype_url as &dyn rusqlite::ToSql,
                    &prototype_image_path,
                ],
            )?;
            Ok(studies.into_iter().next())
        })
        .await
    }

    /// Apply a partial update. Returns `None` when the study does not exist.
    pub async fn update_study(&self, study_id: i64, update: StudyUpdate) -> Result<Option<Study>> {
        self.execute(move |conn| {
            // Build update query dynamically based on what's being updated
            let mut updates = Vec::new();
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(name) = update.name {
                updates.push("name = ?");
                params_vec.push(Box::new(name));
            }
            if let Some(description) = update.description {
                updates.push("description = ?");
                params_vec.push(Box::new(description));
            }
            if let Some(url) = update.prototype_url {
                updates.push("prototype_url = ?");
                params_vec.push(Box::new(url));
            }
            if let Some(path) = update.prototype_image_path {
                updates.push("prototype_image_path = ?");
                params_vec.push(Box::new(path));
            }

            if !updates.is_empty() {
                let query = format!("UPDATE study SET {} WHERE id = ?", updates.join(", "));
                params_vec.push(Box::new(study_id));

                let params_refs: Vec<&dyn rusqlite::ToSql> =
                    params_vec.iter().map(|b| b.as_ref()).collect();
                conn.execute(&query, params_refs.as_slice())
                    .with_context(|| "failed to update study")?;
            }

            find_study(conn, study_id)
        })
        .await
    }

    /// Returns whether a row was removed. Subjects of the study keep their
    /// data and lose the link.
    pub async fn delete_study(&self, study_id: i64) -> Result<bool> {
        self.execute(move |conn| {
            let rows_affected = conn
                .execute("DELETE FROM study WHERE id = ?1", params![study_id])
                .with_context(|| "failed to delete study")?;
            Ok(rows_affected > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{
        models::{NewSubject, StudyInput, StudyUpdate},
        Database,
    };

    fn input(name: &str, url: Option<&str>) -> StudyInput {
        StudyInput {
            name: name.into(),
            description: None,
            prototype_url: url.map(str::to_owned),
            prototype_image_path: None,
        }
    }

    #[tokio::test]
    async fn studies_list_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let older = db.create_study(input("pilot", None)).await.unwrap();
        let newer = db.create_study(input("main", None)).await.unwrap();

        let all = db.get_all_studies().await.unwrap();
        assert_eq!(all.iter().map(|s| s.id).collect::<Vec<_>>(), vec![newer.id, older.id]);
        assert_eq!(db.get_active_study().await.unwrap().unwrap().id, newer.id);
        assert_eq!(
            db.get_study_by_name("pilot".into()).await.unwrap().unwrap().id,
            older.id
        );
    }

    #[tokio::test]
    async fn partial_update_only_touches_given_fields() {
        let db = Database::open_in_memory().unwrap();
        let study = db
            .create_study(StudyInput {
                description: Some("first pass".into()),
                ..input("pilot", Some("https://figma.com/proto/1"))
            })
            .await
            .unwrap();

        let updated = db
            .update_study(
                study.id,
                StudyUpdate {
                    name: Some("pilot v2".into()),
                    ..StudyUpdate::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.name, "pilot v2");
        assert_eq!(updated.description.as_deref(), Some("first pass"));
        assert_eq!(updated.prototype_url, study.prototype_url);
        assert_eq!(updated.created_at, study.created_at);

        assert!(db
            .update_study(999, StudyUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn prototype_lookup_treats_null_as_a_value() {
        let db = Database::open_in_memory().unwrap();
        let by_url = db
            .create_study(input("url study", Some("https://example.com")))
            .await
            .unwrap();

        let found = db
            .find_study_by_prototype(Some("https://example.com".into()), None)
            .await
            .unwrap();
        assert_eq!(found.map(|s| s.id), Some(by_url.id));

        let missing = db
            .find_study_by_prototype(None, Some("/tmp/proto.png".into()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn deleting_study_unlinks_subjects() {
        let db = Database::open_in_memory().unwrap();
        let study = db.create_study(input("pilot", None)).await.unwrap();
        let subject = db
            .create_subject(NewSubject {
                name: "Ada".into(),
                surname: "Lovelace".into(),
                age: 36,
                study_id: Some(study.id),
            })
            .await
            .unwrap();

        assert!(db.delete_study(study.id).await.unwrap());
        assert!(!db.delete_study(study.id).await.unwrap());

        let subject = db.get_subject_by_id(subject.id).await.unwrap().unwrap();
        assert_eq!(subject.study_id, None);
    }
}
