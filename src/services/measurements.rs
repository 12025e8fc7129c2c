use serde::{Deserialize, Serialize};

use super::{
    parse_client_date, subjects::require_subject, subjects::SubjectInfo, ServiceError,
    ServiceResult, StatusResponse,
};
use crate::{
    db::{helpers::format_timestamp, Coordinates, Database, Measurement, NewMeasurement},
    log_info,
};

const ENABLE_LOGS: bool = true;

/// Body of `POST /api/save-points`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePointsRequest {
    /// Subject id
    pub id: i64,
    pub points: Vec<PointSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSample {
    pub date: String,
    #[serde(default)]
    pub gaze: Option<Coordinates>,
    #[serde(default)]
    pub mouse: Option<Coordinates>,
}

/// One measurement flattened for the JSON and CSV views.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PointRecord {
    pub date: String,
    pub x_mouse: Option<f64>,
    pub y_mouse: Option<f64>,
    pub x_gaze: Option<f64>,
    pub y_gaze: Option<f64>,
}

impl From<&Measurement> for PointRecord {
    fn from(measurement: &Measurement) -> Self {
        Self {
            date: format_timestamp(&measurement.date),
            x_mouse: measurement.mouse_point.map(|p| p.x),
            y_mouse: measurement.mouse_point.map(|p| p.y),
            x_gaze: measurement.gaze_point.map(|p| p.x),
            y_gaze: measurement.gaze_point.map(|p| p.y),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPoints {
    pub subject_id: i64,
    pub points: Vec<PointRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubjectResults {
    pub subject: SubjectInfo,
    pub points: Vec<Coordinates>,
}

fn to_new_measurements(samples: Vec<PointSample>) -> ServiceResult<Vec<NewMeasurement>> {
    samples
        .into_iter()
        .enumerate()
        .map(|(index, sample)| {
            if sample.gaze.is_none() && sample.mouse.is_none() {
                return Err(ServiceError::Validation(format!(
                    "point {index} has neither gaze nor mouse coordinates"
                )));
            }
            Ok(NewMeasurement {
                date: parse_client_date(&sample.date, "date")?,
                gaze: sample.gaze,
                mouse: sample.mouse,
            })
        })
        .collect()
}

/// Store every sample of the request, or none of them.
///
/// Dates are parsed before anything is written, so a malformed entry anywhere
/// in the batch leaves the store untouched. The subject id is not checked up
/// front; an unknown id fails on the foreign key and rolls back.
pub async fn save_points(
    db: &Database,
    request: SavePointsRequest,
) -> ServiceResult<StatusResponse> {
    let subject_id = request.id;
    let samples = to_new_measurements(request.points)?;

    let saved = db.insert_measurements(subject_id, samples).await?;
    log_info!("Saved {saved} measurements for subject {subject_id}");

    Ok(StatusResponse::success())
}

pub async fn get_user_points(db: &Database, subject_id: i64) -> ServiceResult<UserPoints> {
    let subject = require_subject(db, subject_id).await?;
    let measurements = db.get_measurements_by_subject(subject.id).await?;

    Ok(UserPoints {
        subject_id,
        points: measurements.iter().map(PointRecord::from).collect(),
    })
}

/// Every recorded point of a subject as a flat list, mouse before gaze
/// within each measurement.
pub async fn get_subject_results(
    db: &Database,
    subject_id: i64,
) -> ServiceResult<SubjectResults> {
    let subject = require_subject(db, subject_id).await?;
    let measurements = db.get_measurements_by_subject(subject.id).await?;

    let points = measurements
        .iter()
        .flat_map(|m| [m.mouse_point, m.gaze_point])
        .flatten()
        .map(|point| point.coordinates())
        .collect();

    Ok(SubjectResults {
        subject: subject.into(),
        points,
    })
}
