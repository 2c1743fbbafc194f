//! Reads a pre-extracted financial model export.
//!
//! The spreadsheet extractor runs upstream and writes its result as JSON
//! (`{"errors": [], "warnings": [], "structuredData": {...}}`) next to the
//! upload. `modelFilePath` points at that export.

use std::path::Path;

use async_trait::async_trait;

use super::{ModelParser, ParsedModel};
use crate::error::CollaboratorError;

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonModelParser;

#[async_trait]
impl ModelParser for JsonModelParser {
    async fn parse_model(&self, path: &Path) -> Result<ParsedModel, CollaboratorError> {
        let bytes = tokio::fs::read(path).await?;
        serde_json::from_slice(&bytes).map_err(|e| CollaboratorError::Malformed(e.to_string()))
    }
}
