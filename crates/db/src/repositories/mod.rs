//! Repository layer: one zero-sized struct per table with async associated
//! functions taking a `&PgPool`.

pub mod engagement_repo;
pub mod generated_report_repo;
pub mod user_repo;

pub use engagement_repo::EngagementRepo;
pub use generated_report_repo::GeneratedReportRepo;
pub use user_repo::UserRepo;
