pub mod apis;
pub mod dashboard;
pub mod models;
pub mod predictions;
