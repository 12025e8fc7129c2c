mod measurements;
mod points;
mod studies;
mod subjects;
mod task_logs;
