//! Startup reconciliation of interrupted runs.
//!
//! Job state lives only in this process, so any engagement still PROCESSING
//! when the process starts was orphaned by a previous one. Moving it to
//! ERROR makes it retryable.

use crate::error::StoreError;
use crate::store::ReportStore;

pub const INTERRUPTED_MESSAGE: &str =
    "Report generation was interrupted by a server restart. Please retry.";

/// Must run before the server accepts launches.
pub async fn reconcile_interrupted(store: &dyn ReportStore) -> Result<u64, StoreError> {
    let reset = store.reset_stuck_processing(INTERRUPTED_MESSAGE).await?;
    if reset > 0 {
        tracing::warn!(count = reset, "Reset engagements left PROCESSING by a previous run");
    } else {
        tracing::debug!("No interrupted engagements found");
    }
    Ok(reset)
}
