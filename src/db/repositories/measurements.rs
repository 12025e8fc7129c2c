use anyhow::{Context, Result};
use log::error;
use rusqlite::{params, Row, Transaction};

use super::points::insert_point;
use crate::db::{
    connection::Database,
    helpers::{format_timestamp, parse_timestamp},
    models::{Measurement, NewMeasurement, Point},
};

fn row_to_measurement(row: &Row) -> Result<Measurement> {
    let date: String = row.get("date")?;

    let mouse_point = match row.get::<_, Option<i64>>("mouse_id")? {
        Some(id) => Some(Point {
            id,
            x: row.get("mouse_x")?,
            y: row.get("mouse_y")?,
        }),
        None => None,
    };
    let gaze_point = match row.get::<_, Option<i64>>("gaze_id")? {
        Some(id) => Some(Point {
            id,
            x: row.get("gaze_x")?,
            y: row.get("gaze_y")?,
        }),
        None => None,
    };

    Ok(Measurement {
        id: row.get("id")?,
        subject_id: row.get("subject_id")?,
        date: parse_timestamp(&date, "date")?,
        mouse_point,
        gaze_point,
    })
}

fn insert_all(tx: &Transaction<'_>, subject_id: i64, samples: &[NewMeasurement]) -> Result<()> {
    for sample in samples {
        let gaze_point_id = sample
            .gaze
            .as_ref()
            .map(|point| insert_point(tx, point))
            .transpose()?;
        let mouse_point_id = sample
            .mouse
            .as_ref()
            .map(|point| insert_point(tx, point))
            .transpose()?;

        tx.execute(
            "INSERT INTO measurement (date, subject_id, mouse_point_id, gaze_point_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                format_timestamp(&sample.date),
                subject_id,
                mouse_point_id,
                gaze_point_id,
            ],
        )
        .with_context(|| "failed to insert measurement")?;
    }
    Ok(())
}

impl Database {
    /// Store a batch of samples for one subject.
    ///
    /// The whole batch is one transaction: either every measurement and point
    /// is written or none are.
    pub async fn insert_measurements(
        &self,
        subject_id: i64,
        samples: Vec<NewMeasurement>,
    ) -> Result<usize> {
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open measurement transaction")?;

            match insert_all(&tx, subject_id, &samples) {
                Ok(()) => {
                    tx.commit().context("failed to commit measurements")?;
                    Ok(samples.len())
                }
                Err(err) => {
                    if let Err(rollback_err) = tx.rollback() {
                        error!("Failed to roll back measurement batch: {rollback_err}");
                    }
                    Err(err)
                }
            }
        })
        .await
    }

    /// Measurements for a subject in insertion order, with both points joined.
    pub async fn get_measurements_by_subject(&self, subject_id: i64) -> Result<Vec<Measurement>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id AS id, m.subject_id AS subject_id, m.date AS date,
                        mp.id AS mouse_id, mp.x AS mouse_x, mp.y AS mouse_y,
                        gp.id AS gaze_id, gp.x AS gaze_x, gp.y AS gaze_y
                 FROM measurement m
                 LEFT JOIN point mp ON mp.id = m.mouse_point_id
                 LEFT JOIN point gp ON gp.id = m.gaze_point_id
                 WHERE m.subject_id = ?1
                 ORDER BY m.id ASC",
            )?;

            let mut rows = stmt.query(params![subject_id])?;
            let mut measurements = Vec::new();
            while let Some(row) = rows.next()? {
                measurements.push(row_to_measurement(row)?);
            }

            Ok(measurements)
        })
        .await
    }

    pub async fn count_measurements_by_subject(&self, subject_id: i64) -> Result<i64> {
        self.execute(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM measurement WHERE subject_id = ?1",
                params![subject_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }
}
