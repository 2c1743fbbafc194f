//! Purge of generated reports past their retention window.

use vantage_core::types::Timestamp;

use crate::collaborators::FileStorage;
use crate::error::StoreError;
use crate::store::ReportStore;

/// Delete expired report rows, then their files. Returns the number of
/// rows removed. File removal failures are logged; the rows stay deleted.
pub async fn purge_expired_reports(
    store: &dyn ReportStore,
    storage: &dyn FileStorage,
    now: Timestamp,
) -> Result<usize, StoreError> {
    let expired = store.delete_expired_reports(now).await?;
    for report in &expired {
        if let Err(e) = storage.delete_file(std::path::Path::new(&report.file_path)).await {
            tracing::warn!(
                engagement_id = report.engagement_id,
                version = report.version,
                path = %report.file_path,
                error = %e,
                "Failed to delete expired report file",
            );
        }
    }
    Ok(expired.len())
}
