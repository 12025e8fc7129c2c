pub mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::{
    Coordinates, Measurement, NewMeasurement, NewSubject, NewTaskLog, Point, Study, StudyInput,
    StudyUpdate, Subject, SubjectPoint, TaskLog,
};
