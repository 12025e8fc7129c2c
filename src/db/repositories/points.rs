use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::db::{
    connection::Database,
    models::{Coordinates, SubjectPoint},
};

/// Insert a point on an open connection or transaction and return its id.
pub(super) fn insert_point(conn: &Connection, point: &Coordinates) -> Result<i64> {
    conn.execute(
        "INSERT INTO point (x, y) VALUES (?1, ?2)",
        params![point.x, point.y],
    )
    .with_context(|| "failed to insert point")?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Every point referenced by a measurement, keyed by the owning subject.
    ///
    /// Gaze and mouse points come back as separate rows; nothing here ties a
    /// row back to the measurement it came from.
    pub async fn get_points_for_all_subjects(&self) -> Result<Vec<SubjectPoint>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.subject_id, p.id, p.x, p.y
                 FROM measurement m
                 JOIN point p ON p.id = m.mouse_point_id OR p.id = m.gaze_point_id
                 ORDER BY m.subject_id ASC, p.id ASC",
            )?;

            let points = stmt
                .query_map([], |row| {
                    Ok(SubjectPoint {
                        subject_id: row.get(0)?,
                        point_id: row.get(1)?,
                        x: row.get(2)?,
                        y: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(points)
        })
        .await
    }

    pub async fn count_points(&self) -> Result<i64> {
        self.execute(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM point", [], |row| row.get(0))?;
            Ok(count)
        })
        .await
    }
}
