use anyhow::{anyhow, Context, Result};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    models::{NewSubject, Subject},
};

fn row_to_subject(row: &Row) -> Result<Subject, rusqlite::Error> {
    Ok(Subject {
        id: row.get("id")?,
        name: row.get("name")?,
        surname: row.get("surname")?,
        age: row.get("age")?,
        study_id: row.get("study_id")?,
    })
}

impl Database {
    /// Insert a subject and return it with its assigned id.
    /// Duplicate name/surname pairs are allowed.
    pub async fn create_subject(&self, subject: NewSubject) -> Result<Subject> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO subject (name, surname, age, study_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![subject.name, subject.surname, subject.age, subject.study_id],
            )
            .with_context(|| "failed to insert subject")?;

            let subject_id = conn.last_insert_rowid();

            conn.query_row(
                "SELECT id, name, surname, age, study_id FROM subject WHERE id = ?1",
                params![subject_id],
                row_to_subject,
            )
            .optional()?
            .ok_or_else(|| anyhow!("Subject not found after insert"))
        })
        .await
    }

    pub async fn get_all_subjects(&self) -> Result<Vec<Subject>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, surname, age, study_id
                 FROM subject
                 ORDER BY id ASC",
            )?;

            let subjects = stmt
                .query_map([], row_to_subject)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(subjects)
        })
        .await
    }

    pub async fn get_subject_by_id(&self, subject_id: i64) -> Result<Option<Subject>> {
        self.execute(move |conn| {
            let subject = conn
                .query_row(
                    "SELECT id, name, surname, age, study_id FROM subject WHERE id = ?1",
                    params![subject_id],
                    row_to_subject,
                )
                .optional()?;
            Ok(subject)
        })
        .await
    }

    pub async fn count_subjects(&self) -> Result<i64> {
        self.execute(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM subject", [], |row| row.get(0))?;
            Ok(count)
        })
        .await
    }
}
