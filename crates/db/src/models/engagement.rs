//! Engagement entity models and DTOs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vantage_core::types::{DbId, Timestamp};

use super::status::{EngagementStatus, StatusId};

/// A row from the `engagements` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Engagement {
    pub id: DbId,
    pub owner_id: DbId,
    pub report_type: String,
    pub company_name: String,
    pub valuation_date: NaiveDate,
    pub model_file_path: Option<String>,
    pub selected_approaches: Vec<String>,
    pub qualitative_context: Option<String>,
    pub status_id: StatusId,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Engagement {
    /// Decoded status; `None` only if the row carries an unknown id.
    pub fn status(&self) -> Option<EngagementStatus> {
        EngagementStatus::from_id(self.status_id)
    }

    /// The parsed-model path, if one is set and non-blank.
    pub fn model_path(&self) -> Option<&str> {
        self.model_file_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// DTO for inserting a new engagement. New engagements always start as DRAFT.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEngagement {
    pub owner_id: DbId,
    pub report_type: String,
    pub company_name: String,
    pub valuation_date: NaiveDate,
    pub model_file_path: Option<String>,
    pub selected_approaches: Vec<String>,
    pub qualitative_context: Option<String>,
}
