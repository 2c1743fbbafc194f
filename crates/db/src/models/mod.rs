pub mod engagement;
pub mod generated_report;
pub mod status;
pub mod user;
