pub mod analytics;
pub mod backup_exchange;
pub mod core;
pub mod grading;
pub mod records;
pub mod reports;
pub mod setup;
pub mod students;
