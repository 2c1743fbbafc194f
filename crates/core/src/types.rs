/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Pipeline jobs are process-local and identified by UUID.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
