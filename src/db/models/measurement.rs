//! Measurement and point data models.
//!
//! A measurement pairs one gaze sample and one mouse sample taken at the same
//! instant. Either side may be missing, in which case the link column is NULL.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub id: i64,
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            x: self.x,
            y: self.y,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub id: i64,
    pub subject_id: i64,
    pub date: NaiveDateTime,
    pub mouse_point: Option<Point>,
    pub gaze_point: Option<Point>,
}

/// One sample to be written by a batch insert
#[derive(Debug, Clone)]
pub struct NewMeasurement {
    pub date: NaiveDateTime,
    pub gaze: Option<Coordinates>,
    pub mouse: Option<Coordinates>,
}

/// A raw point keyed by the subject whose measurement references it.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct SubjectPoint {
    pub subject_id: i64,
    pub point_id: i64,
    pub x: f64,
    pub y: f64,
}
