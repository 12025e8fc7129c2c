pub mod measurement;
pub mod study;
pub mod subject;
pub mod task_log;

pub use measurement::{Coordinates, Measurement, NewMeasurement, Point, SubjectPoint};
pub use study::{Study, StudyInput, StudyUpdate};
pub use subject::{NewSubject, Subject};
pub use task_log::{NewTaskLog, TaskLog};
